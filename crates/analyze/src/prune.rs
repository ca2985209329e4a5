//! Enforces `max_paths`.

use crate::report::TestPath;

/// Keep the `max_paths` shortest paths; among equal lengths the earlier
/// generated one wins. Returns the kept paths in that order and whether
/// anything was dropped.
pub fn prune_paths(paths: Vec<TestPath>, max_paths: usize) -> (Vec<TestPath>, bool) {
    let mut indexed: Vec<(usize, TestPath)> = paths.into_iter().enumerate().collect();
    indexed.sort_by_key(|(i, p)| (p.len(), *i));
    let truncated = indexed.len() > max_paths;
    indexed.truncate(max_paths);
    (indexed.into_iter().map(|(_, p)| p).collect(), truncated)
}
