use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{info, warn};

/// Suffix appended to the input's file name to form its temp artifact
pub const TEMP_SUFFIX: &str = ".squeeze-tmp.mp4";

/// Get the path of the temp artifact for a given input file
///
/// The artifact lives next to the input and keeps the full input file name,
/// so `clip.MP4` and `clip.mp4` in one directory never share an artifact.
pub fn temp_artifact_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    input.with_file_name(name)
}

/// Recover the input a temp artifact was made from
///
/// Only names of the form `<name>.mp4.squeeze-tmp.mp4` qualify, so a user's
/// own `holiday.squeeze-tmp.mp4` is not mistaken for one.
pub fn artifact_source(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let cut = name.len().checked_sub(TEMP_SUFFIX.len())?;
    if !name.as_bytes()[cut..].eq_ignore_ascii_case(TEMP_SUFFIX.as_bytes()) {
        return None;
    }
    // The suffix is ASCII, so `cut` is a char boundary
    let source = &name[..cut];
    if !source.to_lowercase().ends_with(".mp4") {
        return None;
    }
    Some(path.with_file_name(source))
}

/// Check if a path names a temp artifact
pub fn is_temp_artifact(path: &Path) -> bool {
    artifact_source(path).is_some()
}

/// Delete a temp artifact if it exists
pub fn discard(temp: &Path) -> Result<()> {
    match fs::remove_file(temp) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to delete temp artifact: {}", temp.display())),
    }
}

/// Replace the original with the temp artifact in a single rename
pub fn promote(temp: &Path, original: &Path) -> Result<()> {
    fs::rename(temp, original).with_context(|| {
        format!(
            "Failed to replace original with temp artifact: {} -> {}",
            temp.display(),
            original.display()
        )
    })
}

/// Delete temp artifacts left behind by an interrupted run
///
/// An artifact is only removed while its original still sits next to it.
/// Returns how many were removed. Failures are logged and skipped.
pub fn sweep_orphans(orphans: &[PathBuf]) -> usize {
    let mut removed = 0;
    for orphan in orphans {
        let source = match artifact_source(orphan) {
            Some(source) => source,
            None => {
                warn!("Refusing to delete non-artifact path: {}", orphan.display());
                continue;
            }
        };
        if !source.is_file() {
            warn!(
                "Keeping {}: no original at {}",
                orphan.display(),
                source.display()
            );
            continue;
        }
        match discard(orphan) {
            Ok(()) => {
                info!("Deleted orphaned temp artifact: {}", orphan.display());
                removed += 1;
            }
            Err(e) => warn!("{:#}", e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_artifact_path_same_directory() {
        let input = Path::new("/videos/trips/beach.mp4");
        let temp = temp_artifact_path(input);
        assert_eq!(temp, PathBuf::from("/videos/trips/beach.mp4.squeeze-tmp.mp4"));
        assert_eq!(temp.parent(), input.parent());
        assert_ne!(temp, input);
    }

    #[test]
    fn test_temp_artifact_path_keeps_case_distinct_inputs_apart() {
        let upper = temp_artifact_path(Path::new("/v/clip.MP4"));
        let lower = temp_artifact_path(Path::new("/v/clip.mp4"));
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_is_temp_artifact() {
        assert!(is_temp_artifact(Path::new("/v/a.mp4.squeeze-tmp.mp4")));
        assert!(is_temp_artifact(Path::new("A.MP4.SQUEEZE-TMP.MP4")));
        assert!(!is_temp_artifact(Path::new("/v/a.mp4")));
        assert!(!is_temp_artifact(Path::new("/v/squeeze-tmp")));
        assert!(!is_temp_artifact(Path::new("/v/holiday.squeeze-tmp.mp4")));
        assert!(!is_temp_artifact(Path::new("/v/clip.mkv.squeeze-tmp.mp4")));
        assert!(is_temp_artifact(&temp_artifact_path(Path::new("x.mp4"))));
    }

    #[test]
    fn test_discard_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discard(&dir.path().join("gone.mp4.squeeze-tmp.mp4")).is_ok());
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("a.mp4.squeeze-tmp.mp4");
        fs::write(&temp, b"partial").unwrap();
        discard(&temp).unwrap();
        assert!(!temp.exists());
    }

    #[test]
    fn test_promote_replaces_original_contents() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.mp4");
        let temp = temp_artifact_path(&original);
        fs::write(&original, b"original bytes").unwrap();
        fs::write(&temp, b"small").unwrap();

        promote(&temp, &original).unwrap();

        assert_eq!(fs::read(&original).unwrap(), b"small");
        assert!(!temp.exists());
    }

    #[test]
    fn test_artifact_source_round_trips_input() {
        let input = Path::new("/v/Clip.MP4");
        assert_eq!(artifact_source(&temp_artifact_path(input)), Some(input.to_path_buf()));
        assert_eq!(artifact_source(Path::new("/v/holiday.squeeze-tmp.mp4")), None);
        assert_eq!(artifact_source(Path::new("tmp.mp4")), None);
    }

    #[test]
    fn test_sweep_orphans_only_touches_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.mp4");
        let orphan = temp_artifact_path(&original);
        let video = dir.path().join("b.mp4");
        fs::write(&original, b"original").unwrap();
        fs::write(&orphan, b"left over").unwrap();
        fs::write(&video, b"keep me").unwrap();

        let removed = sweep_orphans(&[orphan.clone(), video.clone()]);

        assert_eq!(removed, 1);
        assert!(!orphan.exists());
        assert!(original.exists());
        assert!(video.exists());
    }

    #[test]
    fn test_sweep_orphans_keeps_user_file_with_similar_name() {
        let dir = tempfile::tempdir().unwrap();
        let user_file = dir.path().join("holiday.squeeze-tmp.mp4");
        fs::write(&user_file, b"precious footage").unwrap();

        let report = crate::scan::scan_tree(dir.path(), "mp4");
        let removed = sweep_orphans(&report.orphans);

        assert_eq!(removed, 0);
        assert!(report.orphans.is_empty());
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(fs::read(&user_file).unwrap(), b"precious footage");
    }

    #[test]
    fn test_sweep_orphans_keeps_artifact_without_original() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = temp_artifact_path(&dir.path().join("gone.mp4"));
        fs::write(&orphan, b"no original").unwrap();

        let removed = sweep_orphans(&[orphan.clone()]);

        assert_eq!(removed, 0);
        assert!(orphan.exists());
    }
}
