use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::warn;

use cirrus_types::models::{Profile, User};

const USER_SLOT: &str = "auth_user.json";
const PROFILE_SLOT: &str = "auth_profile.json";

/// Durable copy of the session identity, bridging the gap on restarts
/// before the live session probe resolves.
///
/// Two string-keyed slots (serialized user, serialized profile). The one
/// rule that keeps this from drifting against the live session: every code
/// path that clears the in-memory user clears both slots in the same
/// operation. A crash between the two removals is tolerated; independent
/// drift is not.
#[derive(Clone)]
pub struct DurableCache {
    dir: Arc<PathBuf>,
}

/// Snapshot of the cached identity, read once at boot and handed to guards.
#[derive(Debug, Clone, Default)]
pub struct CachedIdentity {
    pub user: Option<User>,
    pub profile: Option<Profile>,
}

impl DurableCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Arc::new(dir) }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }

    pub async fn load(&self) -> CachedIdentity {
        CachedIdentity {
            user: self.read_slot::<User>(USER_SLOT).await,
            profile: self.read_slot::<Profile>(PROFILE_SLOT).await,
        }
    }

    async fn read_slot<T: serde::de::DeserializeOwned>(&self, slot: &str) -> Option<T> {
        let raw = fs::read_to_string(self.slot_path(slot)).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding corrupt cache slot {}: {}", slot, e);
                None
            }
        }
    }

    async fn write_slot<T: serde::Serialize>(&self, slot: &str, value: &T) {
        let path = self.slot_path(slot);
        if let Err(e) = fs::create_dir_all(&*self.dir).await {
            warn!("Cache dir create failed: {}", e);
            return;
        }
        match serde_json::to_string(value) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json).await {
                    warn!("Cache write failed for {}: {}", slot, e);
                }
            }
            Err(e) => warn!("Cache serialize failed for {}: {}", slot, e),
        }
    }

    async fn remove_slot(&self, slot: &str) {
        match fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cache remove failed for {}: {}", slot, e),
        }
    }

    pub async fn store_user(&self, user: &User) {
        self.write_slot(USER_SLOT, user).await;
    }

    pub async fn store_profile(&self, profile: &Profile) {
        self.write_slot(PROFILE_SLOT, profile).await;
    }

    pub async fn clear_profile(&self) {
        self.remove_slot(PROFILE_SLOT).await;
    }

    /// Clear both slots as one logical step.
    pub async fn clear(&self) {
        self.remove_slot(USER_SLOT).await;
        self.remove_slot(PROFILE_SLOT).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_cache() -> DurableCache {
        let dir = std::env::temp_dir().join(format!("cirrus-cache-{}", Uuid::new_v4()));
        DurableCache::new(dir)
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn roundtrips_user_and_profile() {
        let cache = temp_cache();
        let user = sample_user();
        let profile = Profile {
            id: user.id,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: user.email.clone(),
        };

        cache.store_user(&user).await;
        cache.store_profile(&profile).await;

        let identity = cache.load().await;
        assert_eq!(identity.user.as_ref(), Some(&user));
        assert_eq!(identity.profile.as_ref(), Some(&profile));
    }

    #[tokio::test]
    async fn clear_empties_both_slots() {
        let cache = temp_cache();
        let user = sample_user();
        cache.store_user(&user).await;
        cache
            .store_profile(&Profile {
                id: user.id,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: user.email.clone(),
            })
            .await;

        cache.clear().await;
        let identity = cache.load().await;
        assert!(identity.user.is_none());
        assert!(identity.profile.is_none());
    }

    #[tokio::test]
    async fn empty_cache_loads_as_absent() {
        let cache = temp_cache();
        let identity = cache.load().await;
        assert!(identity.user.is_none());
        assert!(identity.profile.is_none());
    }
}
