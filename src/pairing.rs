//! Pairing of watermarked and reference files by name.
//!
//! A pair is `<id>-wm.<ext>` plus `<id>-orig.<ext>`, matched on the file
//! stem only (directory and extension are ignored, suffix is case-sensitive).
//! Entries without a counterpart are skipped silently.

use std::collections::HashMap;
use std::path::Path;

/// Stem suffix marking the watermarked image.
pub const WATERMARKED_SUFFIX: &str = "-wm";
/// Stem suffix marking the clean reference image.
pub const REFERENCE_SUFFIX: &str = "-orig";

/// One watermarked/reference pair found in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairTask {
    /// Shared identifier (`<id>`).
    pub id: String,
    /// Full entry path of the watermarked image.
    pub watermarked: String,
    /// Full entry path of the reference image.
    pub reference: String,
}

impl RepairTask {
    /// Base name of the watermarked entry, used for the output entry.
    #[must_use]
    pub fn output_name(&self) -> String {
        base_name(&self.watermarked)
    }
}

/// File name without directories or extension.
///
/// Returns `None` for directory entries (trailing `/`) and names with no
/// file component.
#[must_use]
pub fn stem(path: &str) -> Option<&str> {
    if path.ends_with('/') {
        return None;
    }
    Path::new(path).file_stem()?.to_str()
}

/// File name without directories.
#[must_use]
pub fn base_name(path: &str) -> String {
    Path::new(path).file_name().map_or_else(
        || path.to_string(),
        |f| f.to_string_lossy().into_owned(),
    )
}

/// Stem to path mapping that remembers first-insertion order.
///
/// Re-inserting a stem replaces its path but keeps its position.
#[derive(Debug, Default)]
struct StemIndex<'a> {
    order: Vec<&'a str>,
    paths: HashMap<&'a str, &'a str>,
}

impl<'a> StemIndex<'a> {
    fn insert(&mut self, stem: &'a str, path: &'a str) {
        if self.paths.insert(stem, path).is_none() {
            self.order.push(stem);
        }
    }

    fn get(&self, stem: &str) -> Option<&'a str> {
        self.paths.get(stem).copied()
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.order.iter().map(|s| (*s, self.paths[s]))
    }
}

/// Discover repair tasks in a list of entry paths.
///
/// First pass builds the stem index, second pass scans it in insertion
/// order for `<id>-wm` stems whose `<id>-orig` partner exists.
#[must_use]
pub fn discover_tasks<'a, I>(paths: I) -> Vec<RepairTask>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index = StemIndex::default();
    for path in paths {
        if let Some(s) = stem(path) {
            index.insert(s, path);
        }
    }

    let mut tasks = Vec::new();
    for (stem, path) in index.iter() {
        let Some(id) = stem.strip_suffix(WATERMARKED_SUFFIX) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        if let Some(reference) = index.get(&format!("{id}{REFERENCE_SUFFIX}")) {
            tasks.push(RepairTask {
                id: id.to_string(),
                watermarked: path.to_string(),
                reference: reference.to_string(),
            });
        }
    }
    tasks
}
