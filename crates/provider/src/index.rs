//! The seam to the device media index

use crate::{ProviderResult, RawTrack};
use audioshelf_core::TrackId;
use std::path::PathBuf;

/// Read-only access to the external media index
///
/// Implementations are blocking; the `CatalogReader` moves calls off the
/// orchestration task. Timestamps cross this boundary in the index's own
/// time unit: whole seconds.
pub trait MediaIndex: Send + Sync {
    /// Every (id, file path) pair the index currently knows about
    fn known_files(&self) -> ProviderResult<Vec<(TrackId, PathBuf)>>;

    /// Rows changed at or after `since_seconds`; `None` fetches everything
    fn tracks_changed_since(&self, since_seconds: Option<i64>) -> ProviderResult<Vec<RawTrack>>;

    /// Secondary per-id lookup for the category/genre string.
    /// Expensive relative to the primary query; callers cache it.
    fn genre_of(&self, id: TrackId) -> ProviderResult<Option<String>>;

    /// Asks the index to pick up files on disk it does not know yet.
    /// Blocks until acknowledged; callers bound the wait.
    fn request_scan(&self, paths: &[PathBuf]) -> ProviderResult<()>;
}
