use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};
use vitrine_model::{BrandingInput, BrandingState, PersistedBranding};

/// Durable branding store.
///
/// Persists to a single JSON file and mirrors the persisted state in memory.
/// Every failure path falls back to defaults or keeps the in-memory state;
/// branding operations never surface an error to callers.
pub struct BrandingStore {
    path: PathBuf,
    state: RwLock<BrandingState>,
}

impl BrandingStore {
    /// Loads persisted branding, falling back to defaults when the file is
    /// missing, unreadable, or corrupt.
    #[must_use]
    pub fn load_initial(path: PathBuf) -> Self {
        let state = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<PersistedBranding>(&bytes) {
                Ok(persisted) => BrandingState::from_persisted(&persisted),
                Err(e) => {
                    warn!(path = %path.display(), "branding file corrupt, using defaults: {e}");
                    BrandingState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BrandingState::default(),
            Err(e) => {
                warn!(path = %path.display(), "branding file unreadable, using defaults: {e}");
                BrandingState::default()
            }
        };
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    pub async fn current(&self) -> BrandingState {
        self.state.read().await.clone()
    }

    /// Derives contrast, persists, and swaps the in-memory state in one
    /// assignment. The write guard is held across persist and swap so
    /// concurrent appliers serialize and disk never diverges from memory.
    /// A persistence failure is logged and the in-memory update still
    /// happens.
    pub async fn apply(&self, input: &BrandingInput) -> BrandingState {
        let next = BrandingState::apply(input);
        let mut state = self.state.write().await;
        if let Err(e) = write_atomically(&self.path, &next.to_persisted()) {
            warn!(path = %self.path.display(), "branding persist failed: {e}");
        }
        *state = next.clone();
        drop(state);
        info!(primary = %next.primary_color, contrast = %next.contrast_color, "branding applied");
        next
    }
}

fn write_atomically(path: &Path, persisted: &PersistedBranding) -> Result<(), String> {
    let bytes = serde_json::to_vec_pretty(persisted).map_err(|e| e.to_string())?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &bytes).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp, path).map_err(|e| e.to_string())?;
    Ok(())
}
