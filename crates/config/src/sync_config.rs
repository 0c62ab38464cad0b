//! Synchronization preference section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Preferences consumed by the sync engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Ordered delimiter strings used to split combined author fields.
    /// An empty list means no splitting.
    pub author_delimiters: Vec<String>,

    /// Group tracks into books by the book-level author override when one
    /// is present, instead of always using the primary track author
    pub group_by_book_author: bool,

    /// Force the next pass to fetch everything regardless of mode.
    /// Set when delimiter configuration changes; cleared on pass success.
    pub force_full_rescan: bool,

    /// Millisecond timestamp of the last successful pass (0 = never)
    pub last_sync_ms: i64,

    /// Run the post-sync annotation (lyrics) scan
    pub scan_annotations: bool,

    /// Deep-scan every fetched track instead of only unreliable formats
    pub deep_scan_all: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            author_delimiters: Vec::new(),
            group_by_book_author: true,
            force_full_rescan: false,
            last_sync_ms: 0,
            scan_annotations: false,
            deep_scan_all: false,
        }
    }
}

impl SyncConfig {
    /// Replaces the delimiter set and flags the next pass for a full
    /// rescan, since prior splits may no longer reflect the new rules
    pub fn set_delimiters(&mut self, delimiters: Vec<String>) {
        if self.author_delimiters != delimiters {
            self.author_delimiters = delimiters;
            self.force_full_rescan = true;
        }
    }

    /// Returns true if a sync has ever completed
    pub fn has_synced(&self) -> bool {
        self.last_sync_ms > 0
    }
}

impl ConfigSection for SyncConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::not_negative(
            self.last_sync_ms,
            "sync.last_sync_ms",
        )];

        for (i, delim) in self.author_delimiters.iter().enumerate() {
            results.push(Validator::not_empty(
                delim,
                &format!("sync.author_delimiters[{}]", i),
            ));
        }

        Validator::collect_errors(results)
    }

    fn section_name(&self) -> &'static str {
        "sync"
    }
}
