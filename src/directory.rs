//! Lookup of display profiles for user ids.
//!
//! Accounts live outside this service; the gateway only needs enough to label
//! players in join notifications and room listings.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::{Profile, UserId};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// A profile for every id. Unknown ids still get one.
    async fn resolve_profiles(&self, user_ids: &[UserId]) -> HashMap<UserId, Profile>;
}

/// In-process directory. Unregistered users show their id as display name.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    profiles: RwLock<HashMap<UserId, Profile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, user_id: impl Into<UserId>, profile: Profile) {
        self.profiles.write().await.insert(user_id.into(), profile);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn resolve_profiles(&self, user_ids: &[UserId]) -> HashMap<UserId, Profile> {
        let profiles = self.profiles.read().await;
        user_ids
            .iter()
            .map(|id| {
                let profile = profiles.get(id).cloned().unwrap_or_else(|| Profile {
                    display_name: id.clone(),
                    avatar_url: None,
                });
                (id.clone(), profile)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_falls_back_to_id() {
        let dir = MemoryDirectory::new();
        dir.upsert(
            "u1",
            Profile {
                display_name: "Alice".to_string(),
                avatar_url: Some("https://example.invalid/a.png".to_string()),
            },
        )
        .await;

        let profiles = dir
            .resolve_profiles(&["u1".to_string(), "u2".to_string()])
            .await;
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles["u1"].display_name, "Alice");
        assert_eq!(profiles["u2"].display_name, "u2");
        assert!(profiles["u2"].avatar_url.is_none());
    }
}
