//! AudioShelf sync engine
//!
//! Reconciles the local catalog (tracks, books, authors and their
//! junction) against the device media index: deletion detection, bounded
//! deep-scan enrichment, user-edit-preserving merge, multi-value author
//! splitting with stable surrogate ids, and transactional batched
//! persistence.

pub mod augment;
pub mod engine;
pub mod error;
pub mod merge;
pub mod splitter;
pub mod types;

pub use augment::{Augmenter, DEEP_SCAN_POOL_WIDTH};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use merge::merge_track;
pub use splitter::{process, split_author_names, AuthorSplitter, SplitOutcome};
pub use types::{NoopProgress, ProgressSink, SyncMode, SyncPhase, SyncReport};
