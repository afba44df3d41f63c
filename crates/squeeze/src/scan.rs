use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use log::{debug, info, warn};
use crate::artifact;

/// A file picked up by the scan, with its size at discovery time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Everything a single walk of the tree found
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Matching files in discovery order
    pub candidates: Vec<Candidate>,
    /// Temp artifacts left over from an interrupted run
    pub orphans: Vec<PathBuf>,
    /// Entries skipped because they could not be read
    pub unreadable: usize,
}

/// Check a file name against the target extension, ignoring case
fn matches_extension(path: &Path, extension: &str) -> bool {
    let suffix = format!(".{}", extension.trim_start_matches('.').to_lowercase());
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase().ends_with(&suffix))
        .unwrap_or(false)
}

/// Walk `root` and collect every regular file ending in `.extension`
///
/// Unreadable directories and entries are logged and skipped; one bad
/// subtree never stops the rest of the scan.
pub fn scan_tree(root: &Path, extension: &str) -> ScanReport {
    let mut report = ScanReport::default();
    let mut entry_count = 0usize;

    info!("Scanning directory: {}", root.display());

    for entry in WalkDir::new(root).follow_links(false) {
        entry_count += 1;
        if entry_count % 1000 == 0 {
            info!("Scanned {} entries so far in {}...", entry_count, root.display());
        }

        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                report.unreadable += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if artifact::is_temp_artifact(path) {
            debug!("Found leftover temp artifact: {}", path.display());
            report.orphans.push(path.to_path_buf());
            continue;
        }

        if !matches_extension(path, extension) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                report.unreadable += 1;
                continue;
            }
        };

        debug!("Found video: {} ({} bytes)", path.display(), size);
        report.candidates.push(Candidate {
            path: path.to_path_buf(),
            size,
        });
    }

    info!(
        "Finished scanning {}: {} entries, {} videos, {} leftover artifacts, {} unreadable",
        root.display(),
        entry_count,
        report.candidates.len(),
        report.orphans.len(),
        report.unreadable
    );
    report
}

/// Order candidates largest first and keep at most `limit`
///
/// The sort is stable, so equal sizes keep their discovery order.
pub fn select_largest(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.size.cmp(&a.size));
    candidates.truncate(limit);
    candidates
}

/// Scan `root` and return the `limit` largest matching files
pub fn scan_and_select(root: &Path, extension: &str, limit: usize) -> Vec<Candidate> {
    select_largest(scan_tree(root, extension).candidates, limit)
}
