//! Bounded search for Wine/Proton prefixes.
//!
//! Walks at most `depth` directory levels below a root, in sorted order, and
//! never follows symlinked directories. A directory containing `drive_c`
//! (or `pfx/drive_c`, as Proton lays it out) is a prefix; prefixes are not
//! descended into.

use std::fs;
use std::path::{Path, PathBuf};

use crate::layouts::{GameInstall, prefix_candidates};

/// Limits for a single probe.
#[derive(Debug, Clone, Copy)]
pub struct ProbeLimits {
    /// Directory levels below the root to visit.
    pub depth: usize,
    /// Subdirectories kept per directory, first in name order.
    pub max_entries: usize,
}

/// Returns the first readable log under `root` for any of `games`.
pub fn probe_root(
    root: &Path,
    games: &[GameInstall],
    limits: ProbeLimits,
    is_hit: &dyn Fn(&Path) -> bool,
) -> Option<PathBuf> {
    let mut level = vec![root.to_path_buf()];

    for depth in 0..=limits.depth {
        let mut next = Vec::new();

        for dir in &level {
            if let Some(prefix) = prefix_of(dir) {
                let hit = games
                    .iter()
                    .flat_map(|g| prefix_candidates(&prefix, g))
                    .find(|p| is_hit(p));
                if hit.is_some() {
                    return hit;
                }
                continue;
            }
            if depth < limits.depth {
                next.extend(subdirs(dir, limits.max_entries));
            }
        }

        if next.is_empty() {
            break;
        }
        level = next;
    }

    None
}

/// Returns the prefix rooted at `dir`, if `dir` is one.
fn prefix_of(dir: &Path) -> Option<PathBuf> {
    if dir.join("drive_c").is_dir() {
        return Some(dir.to_path_buf());
    }
    let pfx = dir.join("pfx");
    pfx.join("drive_c").is_dir().then_some(pfx)
}

/// Lists real (non-symlink) subdirectories of `dir`, sorted by name and
/// capped at `max_entries`.
fn subdirs(dir: &Path, max_entries: usize) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();

    // Sort first; readdir order is arbitrary.
    dirs.sort_unstable();
    dirs.truncate(max_entries);
    dirs
}
