use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::repo::UserStore;
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Usernames and emails are stored trimmed and lower-cased.
pub(crate) fn normalize_identity(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trimmed, lower-cased identifier, or `None` when blank.
pub(crate) fn normalized_opt(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_identity).filter(|v| !v.is_empty())
}

/// Fails with `Conflict` when `username` or `email` already belongs to a
/// user other than `except`. Each identifier is looked up on its own so a
/// match on the caller's own username cannot hide someone else's email.
pub(crate) async fn ensure_identity_free(
    users: &dyn UserStore,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<Uuid>,
) -> Result<(), ApiError> {
    let lookups = [(username, None), (None, email)];
    for (username, email) in lookups {
        if username.is_none() && email.is_none() {
            continue;
        }
        if let Some(existing) = users.find_by_username_or_email(username, email).await? {
            if Some(existing.id) != except {
                return Err(ApiError::Conflict(
                    "User with email or username already exists".into(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{InMemoryUserStore, NewUser};

    #[test]
    fn email_shape() {
        assert!(is_valid_email("jane@x.com"));
        assert!(!is_valid_email("jane@x"));
        assert!(!is_valid_email("jane x@x.com"));
        assert!(!is_valid_email(""));
    }

    async fn store_with(names: &[(&str, &str)]) -> (InMemoryUserStore, Vec<Uuid>) {
        let store = InMemoryUserStore::new();
        let mut ids = Vec::new();
        for (username, email) in names {
            let user = store
                .create(NewUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    fullname: "Someone".into(),
                    avatar: "https://media.local/avatars/a.png".into(),
                    cover_image: None,
                    password_hash: "hash".into(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn own_username_does_not_hide_taken_email() {
        let (store, ids) = store_with(&[("janed", "jane@x.com"), ("bob", "bob@x.com")]).await;
        let err = ensure_identity_free(&store, Some("janed"), Some("bob@x.com"), Some(ids[0]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn own_email_does_not_hide_taken_username() {
        let (store, ids) = store_with(&[("janed", "jane@x.com"), ("bob", "bob@x.com")]).await;
        let err = ensure_identity_free(&store, Some("bob"), Some("jane@x.com"), Some(ids[0]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn own_identity_is_free() {
        let (store, ids) = store_with(&[("janed", "jane@x.com")]).await;
        ensure_identity_free(&store, Some("janed"), Some("jane@x.com"), Some(ids[0]))
            .await
            .unwrap();
        ensure_identity_free(&store, Some("new"), Some("new@x.com"), None)
            .await
            .unwrap();
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_identity("  JaneD "), "janed");
        assert_eq!(normalized_opt(Some("   ")), None);
        assert_eq!(normalized_opt(Some("Jane@X.com")), Some("jane@x.com".into()));
        assert_eq!(normalized_opt(None), None);
    }
}
