use std::time::Duration;

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{
    config::{JwtConfig, MAX_TTL_MINUTES},
    users::User,
};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }
}

/// Signing and verification keys; access and refresh tokens use separate secrets.
#[derive(Clone)]
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: KeyPair::new(&cfg.access_secret, cfg.access_ttl_minutes),
            refresh: KeyPair::new(&cfg.refresh_secret, cfg.refresh_ttl_minutes),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    fn pair(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.pair(kind).ttl
    }

    fn sign_with_kind(&self, user: &User, kind: TokenKind) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl(kind).as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.pair(kind).encoding)
            .map_err(TokenError::Sign)?;
        debug!(user_id = %user.id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user: &User) -> Result<String, TokenError> {
        self.sign_with_kind(user, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user: &User) -> Result<String, TokenError> {
        self.sign_with_kind(user, TokenKind::Refresh)
    }

    /// Checks signature, expiry, issuer, audience and token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.pair(expected).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            },
        )?;
        if data.claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn config(issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&config("test-issuer", "test-aud"))
    }

    fn user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "janed".into(),
            email: "jane@x.com".into(),
            fullname: "Jane Doe".into(),
            avatar: "https://media.local/avatars/a.png".into(),
            cover_image: None,
            password_hash: "hash".into(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user = user();
        let token = keys.sign_access(&user).expect("sign access");
        let claims = keys.verify(&token, TokenKind::Access).expect("verify token");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "janed");
        assert_eq!(claims.email, "jane@x.com");
        assert_eq!(claims.fullname, "Jane Doe");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn refresh_token_uses_its_own_secret() {
        let keys = make_keys();
        let user = user();
        let refresh = keys.sign_refresh(&user).expect("sign refresh");
        let claims = keys.verify(&refresh, TokenKind::Refresh).expect("verify refresh");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.exp - claims.iat, 60 * 60);

        // signed with the refresh secret, so the access key cannot verify it
        let err = keys.verify(&refresh, TokenKind::Access).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn wrong_kind_is_rejected_even_with_shared_secret() {
        let mut cfg = config("iss", "aud");
        cfg.refresh_secret = cfg.access_secret.clone();
        let keys = JwtKeys::from_config(&cfg);
        let access = keys.sign_access(&user()).unwrap();
        let err = keys.verify(&access, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, TokenError::WrongKind { expected: TokenKind::Refresh }));
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let mut cfg = config("iss", "aud");
        cfg.refresh_ttl_minutes = i64::MAX;
        let keys = JwtKeys::from_config(&cfg);
        assert_eq!(
            keys.ttl(TokenKind::Refresh),
            Duration::from_secs(MAX_TTL_MINUTES as u64 * 60)
        );
        let token = keys.sign_refresh(&user()).unwrap();
        let claims = keys.verify(&token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TTL_MINUTES as usize * 60);
    }

    #[test]
    fn consecutive_tokens_differ() {
        let keys = make_keys();
        let user = user();
        let a = keys.sign_refresh(&user).unwrap();
        let b = keys.sign_refresh(&user).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "jane@x.com".into(),
            username: "janed".into(),
            fullname: "Jane Doe".into(),
            iat: now - 7200,
            exp: now - 3600,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Refresh,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"refresh-secret"),
        )
        .unwrap();
        let err = keys.verify(&token, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys();
        let bad_keys = JwtKeys::from_config(&config("bad-iss", "bad-aud"));
        let token = good_keys.sign_access(&user()).expect("sign access");
        let err = bad_keys.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn garbage_is_invalid() {
        let err = make_keys().verify("not.a.jwt", TokenKind::Access).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }
}
