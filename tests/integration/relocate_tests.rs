use dupestage::actions::{RelocateConfig, RelocationMethod, RelocationState, Relocator};
use dupestage::duplicates::DuplicateFinder;
use dupestage::scanner::{ScanEvent, Walker, WalkerConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Every file under `root` (quarantine included), by content.
fn inventory(root: &Path) -> BTreeMap<Vec<u8>, usize> {
    let walker = Walker::new(root, WalkerConfig::default().with_include_empty(true));
    let mut contents = BTreeMap::new();
    for event in walker.walk() {
        if let Ok(ScanEvent::File(file)) = event {
            *contents.entry(fs::read(&file.path).unwrap()).or_insert(0) += 1;
        }
    }
    contents
}

fn populate(root: &Path) {
    write(&root.join("photos/2020/img.jpg"), b"jpeg bytes");
    write(&root.join("photos/backup/img.jpg"), b"jpeg bytes");
    write(&root.join("img.jpg"), b"jpeg bytes");
    write(&root.join("docs/report.txt"), b"quarterly report");
    write(&root.join("docs/old/report.txt"), b"quarterly report");
    write(&root.join("docs/notes.txt"), b"unrelated notes");
}

#[test]
fn test_relocation_mirrors_relative_paths() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    assert!(report.all_succeeded());
    for record in &report.records {
        let relative = record.source.strip_prefix(&root).unwrap();
        assert_eq!(
            record.destination.as_deref(),
            Some(root.join("to_delete").join(relative).as_path())
        );
        assert_eq!(record.method, Some(RelocationMethod::Rename));
    }
    assert!(root.join("img.jpg").is_file());
    assert!(root.join("docs/report.txt").is_file());
    assert!(root.join("to_delete/photos/2020/img.jpg").is_file());
    assert!(root.join("to_delete/docs/old/report.txt").is_file());
}

#[test]
fn test_relocation_conserves_content() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let before = inventory(dir.path());

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let report = Relocator::new(detection.root(), RelocateConfig::default())
        .relocate_groups(&detection.groups());

    assert_eq!(report.bytes_moved, detection.summary().reclaimable_space);
    assert_eq!(inventory(dir.path()), before);
}

#[test]
fn test_existing_quarantine_file_is_never_overwritten() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");
    write(&dir.path().join("to_delete/b.txt"), b"from an earlier run");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    assert_eq!(report.relocated_count(), 1);
    assert_eq!(
        report.records[0].destination,
        Some(root.join("to_delete/b~1.txt"))
    );
    assert_eq!(
        fs::read(root.join("to_delete/b.txt")).unwrap(),
        b"from an earlier run"
    );
    assert_eq!(fs::read(root.join("to_delete/b~1.txt")).unwrap(), b"duplicate");
}

#[test]
fn test_force_copy_verifies_and_removes_source() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let before = inventory(dir.path());

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let report = Relocator::new(
        detection.root(),
        RelocateConfig::default().with_force_copy(true),
    )
    .relocate_groups(&detection.groups());

    assert!(report.all_succeeded());
    assert_eq!(report.relocated_count(), 3);
    assert!(report
        .records
        .iter()
        .all(|r| r.method == Some(RelocationMethod::CopyVerified)
            && r.state == RelocationState::Relocated
            && !r.source.exists()));
    assert_eq!(inventory(dir.path()), before);
}

#[test]
fn test_dry_run_moves_nothing() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default().with_dry_run(true))
        .relocate_groups(&detection.groups());

    assert!(report.dry_run);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.relocated_count(), 0);
    assert_eq!(report.bytes_moved, 0);
    assert!(report
        .records
        .iter()
        .all(|r| r.state == RelocationState::Detected && r.destination.is_some()));
    assert!(!root.join("to_delete").exists());
}

#[test]
fn test_custom_quarantine_dir() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let relocator = Relocator::new(
        &root,
        RelocateConfig::default().with_quarantine_dir(PathBuf::from(".trash/dupes")),
    );
    assert_eq!(relocator.quarantine_root(), root.join(".trash/dupes"));

    let report = relocator.relocate_groups(&detection.groups());
    assert!(report.all_succeeded());
    assert!(root.join(".trash/dupes/b.txt").is_file());
}

#[test]
fn test_restore_round_trip() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let before = inventory(dir.path());

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let relocator = Relocator::new(&root, RelocateConfig::default());
    relocator.relocate_groups(&detection.groups());
    assert!(!root.join("photos/backup/img.jpg").exists());

    let restore = relocator.restore();

    assert_eq!(restore.restored.len(), 3);
    assert!(restore.conflicts.is_empty());
    assert!(restore.failures.is_empty());
    assert!(restore.pruned_dirs > 0);
    assert!(root.join("photos/backup/img.jpg").is_file());
    assert!(root.join("docs/old/report.txt").is_file());
    assert!(!root.join("to_delete").exists());
    assert_eq!(inventory(dir.path()), before);
}

#[test]
fn test_restore_reports_conflicts() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let relocator = Relocator::new(&root, RelocateConfig::default());
    relocator.relocate_groups(&detection.groups());

    // Something new appeared where the candidate used to be.
    write(&root.join("b.txt"), b"new file");

    let restore = relocator.restore();
    assert!(restore.restored.is_empty());
    assert_eq!(restore.conflicts, vec![root.join("to_delete/b.txt")]);
    assert_eq!(fs::read(root.join("b.txt")).unwrap(), b"new file");
    assert!(root.join("to_delete/b.txt").is_file());
}

#[test]
fn test_restore_dry_run() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    let restore = Relocator::new(&root, RelocateConfig::default().with_dry_run(true)).restore();
    assert!(restore.dry_run);
    assert_eq!(restore.restored.len(), 1);
    assert!(!root.join("b.txt").exists());
    assert!(root.join("to_delete/b.txt").is_file());
}

#[test]
fn test_restore_without_quarantine() {
    let dir = tempdir().unwrap();
    let restore = Relocator::new(dir.path(), RelocateConfig::default()).restore();

    assert!(restore.restored.is_empty());
    assert!(restore.conflicts.is_empty());
    assert_eq!(restore.pruned_dirs, 0);
}
