//! On-disk token cache
//!
//! One JSON file per namespace (`{dir}/{namespace}.cartodb-token.json`)
//! holding the single current token pair. Writes go through a temp file and a
//! rename so a crash mid-write never leaves a truncated cache behind. Reads
//! are forgiving: anything that is not a well-formed entry for the requested
//! namespace counts as "no cached token" and triggers a fresh exchange.
//!
//! There is no cross-process locking. Two processes sharing a namespace may
//! overwrite each other's token; the loser sees a 401 and re-authenticates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::account::Namespace;
use crate::constants::TOKEN_CACHE_SUFFIX;
use crate::error::{AuthError, Result};
use crate::token::AccessToken;

/// Serialized cache entry. The namespace is stored alongside the token so a
/// misplaced or renamed file is detected instead of trusted.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    namespace: Namespace,
    #[serde(flatten)]
    token: AccessToken,
}

/// File-backed token cache keyed by namespace.
#[derive(Debug, Clone)]
pub struct TokenCache {
    dir: PathBuf,
}

impl TokenCache {
    /// Cache rooted at `dir`. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache in the process temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache artifact for `namespace`.
    pub fn path_for(&self, namespace: &Namespace) -> PathBuf {
        self.dir
            .join(format!("{}{}", namespace.as_str(), TOKEN_CACHE_SUFFIX))
    }

    /// Load the cached token for `namespace`, if a valid one exists.
    ///
    /// Never fails: unreadable or corrupt files are reported at warn level and
    /// treated as absent.
    pub async fn load(&self, namespace: &Namespace) -> Option<AccessToken> {
        let path = self.path_for(namespace);
        let contents = match tokio::fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(namespace = %namespace, "no cached token");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read token cache, ignoring");
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&contents) {
            Ok(entry) if entry.namespace == *namespace => {
                debug!(namespace = %namespace, "loaded cached token");
                Some(entry.token)
            }
            Ok(entry) => {
                warn!(
                    path = %path.display(),
                    expected = %namespace,
                    found = %entry.namespace,
                    "token cache belongs to another namespace, ignoring"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt token cache, ignoring");
                None
            }
        }
    }

    /// Replace the cached token for `namespace`.
    ///
    /// A failure here is fatal to the caller: a token that cannot be
    /// persisted must not be used.
    pub async fn save(&self, namespace: &Namespace, token: &AccessToken) -> Result<()> {
        let entry = CacheEntry {
            namespace: namespace.clone(),
            token: token.clone(),
        };
        write_atomic(&self.path_for(namespace), &entry).await
    }

    /// Delete the cached token for `namespace`. A missing file is not an error.
    pub async fn remove(&self, namespace: &Namespace) -> Result<()> {
        let path = self.path_for(namespace);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(namespace = %namespace, "removed cached token");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(format!(
                "removing {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Write a cache entry to a file atomically.
///
/// Writes to a uniquely named temporary file in the same directory, then
/// renames it over the target. Permissions are 0600 (owner read/write only)
/// since the file holds a token secret. The temp file is removed if any step
/// after its creation fails.
async fn write_atomic(path: &Path, entry: &CacheEntry) -> Result<()> {
    let json = serde_json::to_vec_pretty(entry)
        .map_err(|e| AuthError::Store(format!("serializing token: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| AuthError::Store("token cache path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // Unique per write: concurrent saves in one process must not share it
    let tmp_path = dir.join(format!(
        ".{file_name}.tmp.{}",
        uuid::Uuid::new_v4().as_simple()
    ));

    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| AuthError::Store(format!("writing {}: {e}", tmp_path.display())))?;

    if let Err(e) = finish_write(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    debug!(path = %path.display(), "persisted token");
    Ok(())
}

async fn finish_write(tmp_path: &Path, path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(tmp_path, perms)
            .await
            .map_err(|e| AuthError::Store(format!("setting token cache permissions: {e}")))?;
    }

    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| AuthError::Store(format!("replacing {}: {e}", path.display())))
}
