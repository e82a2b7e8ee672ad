// crates/sync-engine/src/detector.rs
//! Editor lock detection
//!
//! Office and LibreOffice leave companion files next to a document while it
//! is open. Their presence is the only signal available for "someone is
//! editing this file" without talking to the editor.
//!
//! The check is racy: an artifact can appear or vanish between the check and
//! the copy. That is a known source of false negatives, not something the
//! detector tries to hide.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use syncguard_core::EditingState;

/// Kind of lock artifact found next to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `~$name` owner file written by Microsoft Office
    OfficeOwner,
    /// `.~lock.name#` written by LibreOffice
    LibreOfficeLock,
    /// `stem.tmp`
    StemTemp,
    /// `~WRL*.tmp` Word recovery file
    WordRecovery,
    /// 8-hex-digit scratch file Excel writes while saving
    ExcelScratch,
}

/// A lock artifact on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Stateless detector for editor lock artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct LockDetector;

impl LockDetector {
    pub fn new() -> Self {
        Self
    }

    /// Checks both ends of the sync
    ///
    /// The destination only counts as edited while it exists. Never fails:
    /// any filesystem error reads as "not editing".
    pub fn detect(&self, source: &Path, destination: &Path) -> EditingState {
        EditingState {
            source_editing: self.is_editing(source),
            dest_editing: destination.exists() && self.is_editing(destination),
        }
    }

    /// Returns true if any lock artifact sits next to `path`
    pub fn is_editing(&self, path: &Path) -> bool {
        !self.artifacts(path).is_empty()
    }

    /// Lists the lock artifacts next to `path`
    pub fn artifacts(&self, path: &Path) -> Vec<LockArtifact> {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return Vec::new();
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Lock check skipped for {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                classify(&name, &file_name, &stem).map(|kind| LockArtifact {
                    path: entry.path(),
                    kind,
                })
            })
            .collect()
    }
}

/// Shortest stem whose owner file Office writes without its first two characters
const TRUNCATED_OWNER_MIN_STEM: usize = 8;

/// Matches one regular file's name against the artifact patterns for a file
fn classify(entry: &str, file_name: &str, stem: &str) -> Option<ArtifactKind> {
    if entry == file_name {
        return None;
    }

    if let Some(rest) = entry.strip_prefix("~$") {
        // Office drops the first two characters of stems this long.
        let truncated = stem
            .get(2..)
            .filter(|_| stem.chars().count() >= TRUNCATED_OWNER_MIN_STEM);
        if (!stem.is_empty() && rest.starts_with(stem))
            || truncated.is_some_and(|t| rest.starts_with(t))
        {
            return Some(ArtifactKind::OfficeOwner);
        }
    }

    if entry == format!(".~lock.{}#", file_name) {
        return Some(ArtifactKind::LibreOfficeLock);
    }

    if !stem.is_empty() && entry == format!("{}.tmp", stem) {
        return Some(ArtifactKind::StemTemp);
    }

    if entry.starts_with("~wrl") && entry.ends_with(".tmp") {
        return Some(ArtifactKind::WordRecovery);
    }

    let scratch = entry.strip_suffix(".tmp").unwrap_or(entry);
    if scratch.len() == 8 && scratch.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(ArtifactKind::ExcelScratch);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(names: &[&str]) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("catalogo.xlsx");
        fs::write(&file, b"data").unwrap();
        for name in names {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        (temp_dir, file)
    }

    #[test]
    fn test_clean_directory() {
        let (_dir, file) = setup(&["notes.txt", "catalogo.xlsx.backup_1"]);
        assert!(!LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_office_owner_file() {
        let (_dir, file) = setup(&["~$catalogo.xlsx"]);
        let artifacts = LockDetector::new().artifacts(&file);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind, ArtifactKind::OfficeOwner);
    }

    #[test]
    fn test_truncated_office_owner_file() {
        let (_dir, file) = setup(&["~$talogo.xlsx"]);
        assert!(LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_short_stem_is_not_matched_by_truncated_owner() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("abc.xlsx");
        fs::write(&file, b"data").unwrap();
        fs::write(temp_dir.path().join("~$catalogo.xlsx"), b"").unwrap();

        assert!(!LockDetector::new().is_editing(&file));

        fs::write(temp_dir.path().join("~$abc.xlsx"), b"").unwrap();
        assert!(LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_dated_subfolder_is_not_a_lock() {
        let (dir, file) = setup(&[]);
        fs::create_dir(dir.path().join("20240115")).unwrap();
        fs::create_dir(dir.path().join("catalogo.tmp")).unwrap();

        assert!(LockDetector::new().artifacts(&file).is_empty());
        let state = LockDetector::new().detect(&file, &file);
        assert!(!state.source_editing);
        assert!(!state.dest_editing);
    }

    #[test]
    fn test_libreoffice_lock() {
        let (_dir, file) = setup(&[".~lock.catalogo.xlsx#"]);
        assert_eq!(
            LockDetector::new().artifacts(&file)[0].kind,
            ArtifactKind::LibreOfficeLock
        );
    }

    #[test]
    fn test_stem_temp_and_word_recovery() {
        let (_dir, file) = setup(&["catalogo.tmp", "~WRL0005.tmp"]);
        let mut kinds: Vec<_> = LockDetector::new()
            .artifacts(&file)
            .into_iter()
            .map(|a| a.kind)
            .collect();
        kinds.sort_by_key(|k| *k as u8);
        assert_eq!(kinds, vec![ArtifactKind::StemTemp, ArtifactKind::WordRecovery]);
    }

    #[test]
    fn test_excel_scratch_files() {
        let (_dir, file) = setup(&["A1B2C3D4"]);
        assert!(LockDetector::new().is_editing(&file));
        let (_dir, file) = setup(&["0F0F0F0F.tmp"]);
        assert!(LockDetector::new().is_editing(&file));
        let (_dir, file) = setup(&["A1B2C3D4.xlsx", "GHIJKLMN"]);
        assert!(!LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_case_insensitive() {
        let (_dir, file) = setup(&["~$CATALOGO.XLSX"]);
        assert!(LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_other_documents_do_not_count() {
        let (_dir, file) = setup(&["~$precios.xlsx", ".~lock.precios.xlsx#"]);
        assert!(!LockDetector::new().is_editing(&file));
    }

    #[test]
    fn test_missing_directory_fails_open() {
        let path = Path::new("/definitely/not/here/catalogo.xlsx");
        assert!(!LockDetector::new().is_editing(path));
    }

    #[test]
    fn test_detect_both_sides() {
        let (src_dir, source) = setup(&["~$catalogo.xlsx"]);
        let (dst_dir, destination) = setup(&[".~lock.catalogo.xlsx#"]);

        let state = LockDetector::new().detect(&source, &destination);
        assert!(state.source_editing);
        assert!(state.dest_editing);

        drop(src_dir);
        drop(dst_dir);
    }

    #[test]
    fn test_missing_destination_is_not_editing() {
        let (dir, source) = setup(&[]);
        let destination = dir.path().join("share").join("catalogo.xlsx");
        let state = LockDetector::new().detect(&source, &destination);
        assert!(!state.dest_editing);
    }
}
