//! Directory allow/block rule resolver
//!
//! Pure and reentrant. "Nearest ancestor wins, allow beats block at equal
//! depth": among the configured allow roots, the longest one that is an
//! ancestor-or-equal of the path is found; likewise for block roots. The
//! path is blocked iff the matching block root is deeper than the matching
//! allow root. With zero allow roots everything is blocked.

use std::path::{Path, PathBuf};

/// Compiled allow/block directory rules
#[derive(Debug, Clone, Default)]
pub struct DirectoryRules {
    allowed: Vec<PathBuf>,
    blocked: Vec<PathBuf>,
}

impl DirectoryRules {
    /// Builds rules from allow and block root lists
    ///
    /// Roots are compared component-wise, so trailing separators and
    /// redundant `.` components carry no weight.
    pub fn new(allowed: Vec<PathBuf>, blocked: Vec<PathBuf>) -> Self {
        Self { allowed, blocked }
    }

    /// Returns true when `path` falls outside every allow root, or under a
    /// block root deeper than its nearest allow root
    pub fn is_blocked(&self, path: &Path) -> bool {
        let allow_depth = match deepest_ancestor(&self.allowed, path) {
            Some(depth) => depth,
            // Deny by default
            None => return true,
        };

        match deepest_ancestor(&self.blocked, path) {
            // A deeper, more specific block rule overrides a shallower
            // allow rule; at equal depth the allow rule wins
            Some(block_depth) => block_depth > allow_depth,
            None => false,
        }
    }

    /// Returns true when no allow roots are configured at all
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Depth (component count) of the deepest root that is an
/// ancestor-or-equal of `path`, if any
fn deepest_ancestor(roots: &[PathBuf], path: &Path) -> Option<usize> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .map(|root| root.components().count())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(allowed: &[&str], blocked: &[&str]) -> DirectoryRules {
        DirectoryRules::new(
            allowed.iter().map(PathBuf::from).collect(),
            blocked.iter().map(PathBuf::from).collect(),
        )
    }

    #[test]
    fn test_no_allow_roots_blocks_everything() {
        let r = rules(&[], &[]);
        assert!(r.is_blocked(Path::new("/music/track.mp3")));
        assert!(r.is_empty());
    }

    #[test]
    fn test_allowed_path() {
        let r = rules(&["/a"], &[]);
        assert!(!r.is_blocked(Path::new("/a/c")));
        assert!(!r.is_blocked(Path::new("/a")));
    }

    #[test]
    fn test_outside_allow_root_is_blocked() {
        let r = rules(&["/a"], &[]);
        assert!(r.is_blocked(Path::new("/b/c")));
    }

    #[test]
    fn test_deeper_block_overrides_allow() {
        let r = rules(&["/a"], &["/a/b"]);
        assert!(r.is_blocked(Path::new("/a/b/c")));
        assert!(!r.is_blocked(Path::new("/a/c")));
    }

    #[test]
    fn test_deeper_allow_overrides_block() {
        let r = rules(&["/a/b"], &["/a"]);
        assert!(!r.is_blocked(Path::new("/a/b/c")));
    }

    #[test]
    fn test_equal_depth_allow_wins() {
        let r = rules(&["/a/b"], &["/a/b"]);
        assert!(!r.is_blocked(Path::new("/a/b/c")));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let r = rules(&["/a/"], &["/a/b/"]);
        assert!(r.is_blocked(Path::new("/a/b/c")));
        assert!(!r.is_blocked(Path::new("/a/c")));
    }

    #[test]
    fn test_component_boundaries_respected() {
        // "/audio" must not match "/audiobooks"
        let r = rules(&["/audio"], &[]);
        assert!(r.is_blocked(Path::new("/audiobooks/track.mp3")));
    }

    #[test]
    fn test_nearest_of_several_blocks() {
        let r = rules(&["/a", "/a/b/c"], &["/a/b"]);
        // /a/b/c/d: allow "/a/b/c" (depth 4) beats block "/a/b" (depth 3)
        assert!(!r.is_blocked(Path::new("/a/b/c/d")));
        // /a/b/x: block "/a/b" (depth 3) beats allow "/a" (depth 2)
        assert!(r.is_blocked(Path::new("/a/b/x")));
    }
}
