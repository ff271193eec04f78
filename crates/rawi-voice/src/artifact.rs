//! Storage for the single current audio artifact.
//!
//! Files are keyed by a per-request id rather than a fixed name. The
//! "current" pointer only moves under the write lock, and readers load the
//! whole file while holding the read lock, so a reader never observes a file
//! that is still being written or is about to be deleted.

use crate::error::VoiceError;
use chrono::Utc;
use rawi_types::AudioArtifact;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// Name of the scratch subdirectory inside the artifact directory.
const SCRATCH_DIR_NAME: &str = "scratch";

/// Determines file extension from a MIME type.
fn ext_from_mime(mime: &str) -> &str {
    match mime {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

/// Guard serializing one `reset → … → publish` sequence.
pub type RunGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    scratch: PathBuf,
    current: RwLock<Option<AudioArtifact>>,
    run_lock: Arc<Mutex<()>>,
}

impl ArtifactStore {
    /// Opens (creating if needed) the store at `root` and clears anything a
    /// previous process left behind.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, VoiceError> {
        let root = root.as_ref().to_path_buf();
        let scratch = root.join(SCRATCH_DIR_NAME);
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|e| VoiceError::Storage(format!("failed to create artifact dir: {}", e)))?;

        let store = Self {
            root,
            scratch,
            current: RwLock::new(None),
            run_lock: Arc::new(Mutex::new(())),
        };
        store.reset().await?;
        store.remove_stale_artifacts(None, Duration::ZERO).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for intermediate conversion files.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Waits until no other pipeline run holds the store, then claims it.
    pub async fn begin_run(&self) -> RunGuard {
        self.run_lock.clone().lock_owned().await
    }

    /// Deletes the current artifact and every scratch file.
    pub async fn reset(&self) -> Result<(), VoiceError> {
        let mut current = self.current.write().await;
        if let Some(previous) = current.take() {
            remove_if_exists(&previous.path).await?;
        }
        clear_dir(&self.scratch).await?;
        Ok(())
    }

    /// Stores `audio` as the new current artifact, replacing the previous one.
    pub async fn publish(&self, audio: &[u8], mime_type: &str) -> Result<AudioArtifact, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::Storage("refusing to publish empty audio".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let path = self.root.join(format!("{}.{}", id, ext_from_mime(mime_type)));
        let partial = self.scratch.join(format!("{}.part", id));

        tokio::fs::create_dir_all(&self.scratch)
            .await
            .map_err(|e| VoiceError::Storage(format!("failed to create scratch dir: {}", e)))?;
        if let Err(e) = tokio::fs::write(&partial, audio).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(VoiceError::Storage(format!("failed to write artifact: {}", e)));
        }
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(VoiceError::Storage(format!("failed to move artifact: {}", e)));
        }

        let artifact = AudioArtifact {
            id,
            path,
            mime_type: mime_type.to_string(),
            created_at: Utc::now(),
        };

        let previous = {
            let mut current = self.current.write().await;
            let previous = current.replace(artifact.clone());
            if let Some(old) = &previous {
                // Left for the orphan sweep if this fails.
                if let Err(e) = remove_if_exists(&old.path).await {
                    tracing::warn!(artifact_id = %old.id, "failed to remove replaced artifact: {}", e);
                }
            }
            previous
        };

        tracing::info!(
            artifact_id = %artifact.id,
            bytes = audio.len(),
            replaced = previous.is_some(),
            "published audio artifact"
        );
        Ok(artifact)
    }

    /// Returns the current artifact, if one is published.
    pub async fn current(&self) -> Option<AudioArtifact> {
        self.current.read().await.clone()
    }

    /// Reads the current artifact and its bytes.
    ///
    /// # Errors
    ///
    /// `VoiceError::ArtifactNotFound` when nothing is published.
    pub async fn read_current(&self) -> Result<(AudioArtifact, Vec<u8>), VoiceError> {
        let current = self.current.read().await;
        let artifact = current.as_ref().ok_or(VoiceError::ArtifactNotFound)?;
        match tokio::fs::read(&artifact.path).await {
            Ok(bytes) => Ok((artifact.clone(), bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VoiceError::ArtifactNotFound),
            Err(e) => Err(VoiceError::Storage(format!("failed to read artifact: {}", e))),
        }
    }

    /// Removes non-current artifact files and scratch files older than `max_age`.
    ///
    /// Returns the number of files removed. The pass is skipped while a
    /// pipeline run holds the store, since its scratch files are in use.
    pub async fn sweep_orphans(&self, max_age: Duration) -> Result<usize, VoiceError> {
        let Ok(_run) = self.run_lock.clone().try_lock_owned() else {
            tracing::debug!("pipeline run in progress, skipping sweep");
            return Ok(0);
        };
        let current = self.current.read().await;
        let keep = current.as_ref().map(|a| a.path.clone());
        let mut removed = self.remove_stale_artifacts(keep.as_deref(), max_age).await?;
        removed += remove_older_than(&self.scratch, None, max_age).await?;
        Ok(removed)
    }

    async fn remove_stale_artifacts(
        &self,
        keep: Option<&Path>,
        max_age: Duration,
    ) -> Result<usize, VoiceError> {
        remove_older_than(&self.root, keep, max_age).await
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), VoiceError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VoiceError::Storage(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn clear_dir(dir: &Path) -> Result<(), VoiceError> {
    remove_older_than(dir, None, Duration::ZERO).await.map(|_| ())
}

/// Removes regular files directly inside `dir` whose modification time is at
/// least `max_age` ago, skipping `keep`.
async fn remove_older_than(
    dir: &Path,
    keep: Option<&Path>,
    max_age: Duration,
) -> Result<usize, VoiceError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(VoiceError::Storage(format!(
                "failed to list {}: {}",
                dir.display(),
                e
            )))
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| VoiceError::Storage(format!("failed to list {}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if keep == Some(path.as_path()) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }
        if !max_age.is_zero() {
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }
        }
        remove_if_exists(&path).await?;
        removed += 1;
    }

    Ok(removed)
}
