use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed identity used by demo sessions.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x4242_0000_0000_4000_8000_0000_0000_0042);

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub is_moderator: bool,
    pub is_admin: bool,
    pub is_supplier: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Profile created the first time a signed-in user is seen.
    pub fn new(id: UserId) -> Self {
        let simple = id.simple().to_string();
        let username = format!("user-{}", &simple[..8]);
        Self {
            id,
            display_name: username.clone(),
            username,
            is_moderator: false,
            is_admin: false,
            is_supplier: false,
            created_at: Utc::now(),
        }
    }

    pub fn demo() -> Self {
        Self {
            id: DEMO_USER_ID,
            username: "demo".to_string(),
            display_name: "Demo Explorer".to_string(),
            is_moderator: false,
            is_admin: false,
            is_supplier: false,
            created_at: Utc::now(),
        }
    }

    /// Admins carry every moderator permission.
    pub fn can_moderate(&self) -> bool {
        self.is_moderator || self.is_admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_username_from_id() {
        let id = Uuid::parse_str("0a1b2c3d-0000-4000-8000-000000000000").unwrap();
        let profile = Profile::new(id);
        assert_eq!(profile.username, "user-0a1b2c3d");
        assert!(!profile.can_moderate());
    }

    #[test]
    fn test_admin_can_moderate() {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.is_admin = true;
        assert!(profile.can_moderate());
    }
}
