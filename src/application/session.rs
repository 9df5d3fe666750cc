use crate::domain::UserId;
use crate::domain::ports::ProfileStoreRef;
use crate::domain::profile::{DEMO_USER_ID, Profile};
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Signed bearer token: `<user uuid>.<expiry unix secs>.<hex hmac-sha256>`.
pub struct SessionToken;

impl SessionToken {
    pub fn issue(secret: &[u8], user_id: UserId, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
        if ttl <= Duration::zero() {
            return Err(AppError::validation("token lifetime must be positive"));
        }
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::validation("token lifetime out of range"))?
            .timestamp();
        let payload = format!("{user_id}.{expires}");
        let signature = hex::encode(sign(secret, &payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(secret: &[u8], token: &str, now: DateTime<Utc>) -> Result<UserId> {
        let invalid = || AppError::Unauthorized("invalid session token".to_string());

        let (payload, signature) = token.rsplit_once('.').ok_or_else(invalid)?;
        let (user, expires) = payload.split_once('.').ok_or_else(invalid)?;
        let user_id = Uuid::parse_str(user).map_err(|_| invalid())?;
        let expires: i64 = expires.parse().map_err(|_| invalid())?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;

        sign(secret, payload)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;

        if expires <= now.timestamp() {
            return Err(AppError::Unauthorized("session expired".to_string()));
        }
        Ok(user_id)
    }
}

fn sign(secret: &[u8], payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::InternalError(Box::new(std::io::Error::other(e.to_string()))))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Real,
    Demo,
    Anonymous,
}

/// The identity a request acts as, with its role flags.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub kind: IdentityKind,
    pub is_moderator: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            kind: IdentityKind::Anonymous,
            is_moderator: false,
            is_admin: false,
            is_supplier: false,
        }
    }

    pub fn from_profile(profile: &Profile, kind: IdentityKind) -> Self {
        Self {
            user_id: Some(profile.id),
            kind,
            is_moderator: profile.can_moderate(),
            is_admin: profile.is_admin,
            is_supplier: profile.is_supplier,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.kind == IdentityKind::Demo
    }

    pub fn require_user(&self) -> Result<UserId> {
        self.user_id
            .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))
    }

    pub fn require_moderator(&self) -> Result<UserId> {
        let user_id = self.require_user()?;
        if self.is_moderator {
            Ok(user_id)
        } else {
            Err(AppError::forbidden("moderator role required"))
        }
    }

    pub fn require_admin(&self) -> Result<UserId> {
        let user_id = self.require_user()?;
        if self.is_admin {
            Ok(user_id)
        } else {
            Err(AppError::forbidden("admin role required"))
        }
    }
}

/// Determines the acting user for a request and looks up its role flags.
#[derive(Clone)]
pub struct SessionResolver {
    profiles: ProfileStoreRef,
    secret: Vec<u8>,
    demo_mode: bool,
}

impl SessionResolver {
    pub fn new(profiles: ProfileStoreRef, secret: impl Into<Vec<u8>>, demo_mode: bool) -> Self {
        Self {
            profiles,
            secret: secret.into(),
            demo_mode,
        }
    }

    pub fn issue_token(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        SessionToken::issue(&self.secret, user_id, ttl, Utc::now())
    }

    pub async fn resolve(&self, bearer: Option<&str>, demo_requested: bool) -> Result<Actor> {
        if let Some(token) = bearer {
            let user_id = SessionToken::verify(&self.secret, token, Utc::now())?;
            let profile = self.load_or_create(user_id, || Profile::new(user_id)).await?;
            return Ok(Actor::from_profile(&profile, IdentityKind::Real));
        }

        if demo_requested {
            if !self.demo_mode {
                return Err(AppError::Unauthorized("demo mode is disabled".to_string()));
            }
            let profile = self.load_or_create(DEMO_USER_ID, Profile::demo).await?;
            return Ok(Actor::from_profile(&profile, IdentityKind::Demo));
        }

        Ok(Actor::anonymous())
    }

    async fn load_or_create<F>(&self, user_id: UserId, create: F) -> Result<Profile>
    where
        F: FnOnce() -> Profile,
    {
        if let Some(profile) = self.profiles.get(user_id).await? {
            return Ok(profile);
        }
        let profile = create();
        info!(user_id = %user_id, username = %profile.username, "creating profile on first sign-in");
        self.profiles.store(profile.clone()).await?;
        Ok(profile)
    }
}
