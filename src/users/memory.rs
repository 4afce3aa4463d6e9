use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo::UserStore;
use super::repo_types::{NewUser, User, UserChanges};

/// In-memory implementation of [`UserStore`] for development and testing.
///
/// Mirrors the unique constraints of the `users` table. Data is lost when
/// the process exits.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn clashes(users: &HashMap<Uuid, User>, id: Uuid, username: Option<&str>, email: Option<&str>) -> bool {
    users.values().any(|u| {
        u.id != id
            && (username.is_some_and(|n| u.username == n) || email.is_some_and(|e| u.email == e))
    })
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        let id = Uuid::new_v4();
        if clashes(&users, id, Some(&new_user.username), Some(&new_user.email)) {
            warn!(username = %new_user.username, "duplicate user rejected");
            anyhow::bail!("duplicate key value violates unique constraint on users");
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            fullname: new_user.fullname,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            password_hash: new_user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        debug!(user_id = %id, "user stored in memory");
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        let mut matches: Vec<&User> = users
            .values()
            .filter(|u| {
                username.is_some_and(|n| u.username == n) || email.is_some_and(|e| u.email == e)
            })
            .collect();
        matches.sort_by_key(|u| u.created_at);
        Ok(matches.first().map(|u| (*u).clone()))
    }

    async fn update_fields(&self, id: Uuid, changes: &UserChanges) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        if clashes(&users, id, changes.username.as_deref(), changes.email.as_deref()) {
            anyhow::bail!("duplicate key value violates unique constraint on users");
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = &changes.fullname {
            user.fullname = v.clone();
        }
        if let Some(v) = &changes.email {
            user.email = v.clone();
        }
        if let Some(v) = &changes.username {
            user.username = v.clone();
        }
        if let Some(v) = &changes.avatar {
            user.avatar = v.clone();
        }
        if let Some(v) = &changes.cover_image {
            user.cover_image = Some(v.clone());
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            fullname: "Test User".into(),
            avatar: "https://media.local/avatars/x.png".into(),
            cover_image: None,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_username_or_email() {
        let store = InMemoryUserStore::new();
        store.create(new_user("janed", "jane@x.com")).await.unwrap();
        assert!(store.create(new_user("janed", "other@x.com")).await.is_err());
        assert!(store.create(new_user("other", "jane@x.com")).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn find_by_either_identifier() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("janed", "jane@x.com")).await.unwrap();

        let by_name = store.find_by_username_or_email(Some("janed"), None).await.unwrap();
        let by_mail = store.find_by_username_or_email(None, Some("jane@x.com")).await.unwrap();
        let neither = store.find_by_username_or_email(None, None).await.unwrap();

        assert_eq!(by_name.map(|u| u.id), Some(user.id));
        assert_eq!(by_mail.map(|u| u.id), Some(user.id));
        assert!(neither.is_none());
    }

    #[tokio::test]
    async fn update_fields_only_touches_given_columns() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("janed", "jane@x.com")).await.unwrap();

        let changes = UserChanges {
            cover_image: Some("https://media.local/cover-images/c.png".into()),
            ..Default::default()
        };
        let updated = store.update_fields(user.id, &changes).await.unwrap().unwrap();

        assert_eq!(updated.avatar, user.avatar);
        assert_eq!(updated.cover_image.as_deref(), Some("https://media.local/cover-images/c.png"));
        assert_eq!(updated.username, "janed");
    }

    #[tokio::test]
    async fn refresh_token_set_and_cleared() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("janed", "jane@x.com")).await.unwrap();

        store.set_refresh_token(user.id, Some("rt-1")).await.unwrap();
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("rt-1"));

        store.set_refresh_token(user.id, None).await.unwrap();
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("janed", "jane@x.com")).await.unwrap();
        assert!(store.delete(user.id).await.unwrap());
        assert!(!store.delete(user.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
