// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! User store abstraction with in-memory and flat-file implementations.
//!
//! Writes are conditional on [`User::version`]: a `put` only lands if the
//! stored version equals the submitted one (an absent record counts as
//! version 0), and the stored record gets `version + 1`. A concurrent
//! read-modify-write on the same key therefore fails with
//! [`StoreError::Conflict`] instead of silently losing an update.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use permgate_common::{User, UserField, UserFilter, Version};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs as tokio_fs, sync::Mutex};

/// Errors raised by user stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Version conflict on {key}: expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: Version,
        found: Version,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Trait for user storage backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user record
    async fn get(&self, key: &str) -> Result<User, StoreError>;

    /// Conditionally write a user record, returning the new version
    async fn put(&self, key: &str, user: User) -> Result<Version, StoreError>;

    /// Delete a user record
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    /// Release backend resources
    async fn close(&self) {}

    /// Projection queries, for backends that support them
    fn as_projection(&self) -> Option<&dyn ProjectionQuerier> {
        None
    }
}

/// Optional capability: project one string field across all (or filtered) users
#[async_trait]
pub trait ProjectionQuerier: Send + Sync {
    async fn get_all(&self, field: UserField) -> Result<Vec<String>, StoreError>;

    async fn get_all_filtered(
        &self,
        field: UserField,
        filter: UserFilter,
    ) -> Result<Vec<String>, StoreError>;
}

fn check_version(key: &str, expected: Version, found: Version) -> Result<(), StoreError> {
    if expected == found {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            key: key.to_string(),
            expected,
            found,
        })
    }
}

fn project<'a>(
    users: impl Iterator<Item = &'a User>,
    field: UserField,
    filter: Option<UserFilter>,
) -> Vec<String> {
    let mut values: Vec<String> = users
        .filter(|u| filter.map_or(true, |f| u.matches(f)))
        .map(|u| u.field(field).to_string())
        .collect();
    values.sort();
    values
}

/// In-memory user store
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<User> {
        self.users.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<User, StoreError> {
        self.users
            .get(key)
            .map(|u| u.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, mut user: User) -> Result<Version, StoreError> {
        match self.users.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                check_version(key, user.version, entry.get().version)?;
                user.version += 1;
                let version = user.version;
                entry.insert(user);
                Ok(version)
            },
            Entry::Vacant(entry) => {
                check_version(key, user.version, 0)?;
                user.version = 1;
                entry.insert(user);
                Ok(1)
            },
        }
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.users
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn as_projection(&self) -> Option<&dyn ProjectionQuerier> {
        Some(self)
    }
}

#[async_trait]
impl ProjectionQuerier for MemoryStore {
    async fn get_all(&self, field: UserField) -> Result<Vec<String>, StoreError> {
        Ok(project(self.snapshot().iter(), field, None))
    }

    async fn get_all_filtered(
        &self,
        field: UserField,
        filter: UserFilter,
    ) -> Result<Vec<String>, StoreError> {
        Ok(project(self.snapshot().iter(), field, Some(filter)))
    }
}

/// Flat-file user store: one JSON document per user under `<root>/users/`
#[derive(Debug)]
pub struct FlatFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().join("users");
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Keys are hex encoded so any username or e-mail is a valid file name
    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", hex::encode(key)))
    }

    async fn read(&self, key: &str) -> Result<Option<User>, StoreError> {
        match tokio_fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all(&self) -> Result<Vec<User>, StoreError> {
        let mut users = Vec::new();
        let mut entries = tokio_fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = tokio_fs::read_to_string(&path).await?;
                users.push(serde_json::from_str(&content)?);
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl UserStore for FlatFileStore {
    async fn get(&self, key: &str) -> Result<User, StoreError> {
        self.read(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, mut user: User) -> Result<Version, StoreError> {
        let _guard = self.write_lock.lock().await;

        let found = self.read(key).await?.map_or(0, |u| u.version);
        check_version(key, user.version, found)?;
        user.version += 1;

        // write then rename so readers never see a partial document
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio_fs::write(&tmp, serde_json::to_string_pretty(&user)?).await?;
        tokio_fs::rename(&tmp, &path).await?;

        Ok(user.version)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio_fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn as_projection(&self) -> Option<&dyn ProjectionQuerier> {
        Some(self)
    }
}

#[async_trait]
impl ProjectionQuerier for FlatFileStore {
    async fn get_all(&self, field: UserField) -> Result<Vec<String>, StoreError> {
        Ok(project(self.read_all().await?.iter(), field, None))
    }

    async fn get_all_filtered(
        &self,
        field: UserField,
        filter: UserFilter,
    ) -> Result<Vec<String>, StoreError> {
        Ok(project(self.read_all().await?.iter(), field, Some(filter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user(name: &str, confirmed: bool) -> User {
        User {
            username: name.to_string(),
            email: format!("{name}@mail.com"),
            password: "hash".to_string(),
            confirmed,
            ..User::default()
        }
    }

    async fn exercise(store: &dyn UserStore) {
        assert!(matches!(store.get("bob").await, Err(StoreError::NotFound(_))));

        assert_eq!(store.put("bob", user("bob", false)).await.unwrap(), 1);
        assert_eq!(store.put("carlo", user("carlo", true)).await.unwrap(), 1);

        let mut bob = store.get("bob").await.unwrap();
        assert_eq!(bob.version, 1);

        // a second writer holding the same stale copy loses
        let stale = bob.clone();
        bob.admin = true;
        assert_eq!(store.put("bob", bob).await.unwrap(), 2);
        assert!(matches!(
            store.put("bob", stale).await,
            Err(StoreError::Conflict { expected: 1, found: 2, .. })
        ));
        assert!(store.get("bob").await.unwrap().admin);

        // creating over an existing key with version 0 is a conflict too
        assert!(matches!(
            store.put("bob", user("bob", false)).await,
            Err(StoreError::Conflict { expected: 0, found: 2, .. })
        ));

        let projection = store.as_projection().unwrap();
        assert_eq!(
            projection.get_all(UserField::Username).await.unwrap(),
            vec!["bob".to_string(), "carlo".to_string()]
        );
        assert_eq!(
            projection
                .get_all_filtered(UserField::Email, UserFilter::Confirmed(false))
                .await
                .unwrap(),
            vec!["bob@mail.com".to_string()]
        );

        store.del("bob").await.unwrap();
        assert!(matches!(store.del("bob").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.get("bob").await, Err(StoreError::NotFound(_))));
        store.close().await;
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_flat_file_store() {
        let dir = tempdir().unwrap();
        exercise(&FlatFileStore::new(dir.path()).unwrap()).await;
    }

    #[tokio::test]
    async fn test_flat_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FlatFileStore::new(dir.path()).unwrap();
            store.put("carlo@mail.com", user("carlo", false)).await.unwrap();
        }
        let store = FlatFileStore::new(dir.path()).unwrap();
        assert_eq!(store.get("carlo@mail.com").await.unwrap().username, "carlo");
    }
}
