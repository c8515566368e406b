#![cfg(unix)]

use dupestage::actions::{RelocateConfig, Relocator};
use dupestage::duplicates::DuplicateFinder;
use std::fs;
use std::os::unix::fs::symlink;
use tempfile::tempdir;

#[test]
fn test_symlink_to_file_not_counted() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original.txt");
    fs::write(&original, b"linked content").unwrap();
    symlink(&original, dir.path().join("link.txt")).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(!detection.has_duplicates());
    assert_eq!(detection.summary().total_files, 1);
    assert_eq!(detection.summary().skipped_entries, 1);
}

#[test]
fn test_symlinked_directory_not_followed() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("file.txt"), b"only once").unwrap();
    symlink(&real, dir.path().join("alias")).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(!detection.has_duplicates());
    assert_eq!(detection.summary().total_files, 1);
}

#[test]
fn test_symlink_cycle_terminates() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    symlink(dir.path(), sub.join("loop")).unwrap();
    fs::write(sub.join("a.txt"), b"cycle").unwrap();
    fs::write(dir.path().join("b.txt"), b"cycle").unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(detection.groups().len(), 1);
    assert_eq!(detection.summary().total_files, 2);
}

#[test]
fn test_symlink_target_untouched_by_relocation() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"dup").unwrap();
    fs::write(dir.path().join("b.txt"), b"dup").unwrap();
    symlink(dir.path().join("b.txt"), dir.path().join("c.txt")).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    assert_eq!(report.relocated_count(), 1);
    // The link itself is left alone, now dangling.
    assert!(fs::symlink_metadata(root.join("c.txt")).unwrap().file_type().is_symlink());
    assert!(!root.join("to_delete/c.txt").exists());
}

#[test]
fn test_hardlinks_are_grouped_as_duplicates() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original.txt");
    fs::write(&original, b"same inode").unwrap();
    if let Err(e) = fs::hard_link(&original, dir.path().join("hardlink.txt")) {
        eprintln!("Skipping hardlink test: failed to create hardlink: {e}");
        return;
    }

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    // Hard links are separate directory entries with identical content.
    assert_eq!(detection.groups().len(), 1);
    assert_eq!(detection.summary().total_files, 2);
}

#[test]
fn test_symlinked_quarantine_dir_is_refused() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/1.txt"), b"X").unwrap();
    fs::write(dir.path().join("b/1.txt"), b"X").unwrap();
    symlink(outside.path(), dir.path().join("to_delete")).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    assert_eq!(report.relocated_count(), 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].to_string().contains("symlink"));
    assert!(root.join("b/1.txt").is_file());
    assert!(!outside.path().join("b").exists());
}

#[test]
fn test_symlinked_subdirectory_inside_quarantine_is_refused() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::create_dir_all(dir.path().join("to_delete")).unwrap();
    fs::write(dir.path().join("a/1.txt"), b"X").unwrap();
    fs::write(dir.path().join("b/1.txt"), b"X").unwrap();
    symlink(outside.path(), dir.path().join("to_delete/b")).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&detection.groups());

    assert_eq!(report.failures.len(), 1);
    assert!(root.join("b/1.txt").is_file());
    assert!(!outside.path().join("1.txt").exists());
}

#[test]
fn test_restore_refuses_symlinked_quarantine() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    fs::write(outside.path().join("stray.txt"), b"not ours").unwrap();
    symlink(outside.path(), dir.path().join("to_delete")).unwrap();

    let root = dir.path().canonicalize().unwrap();
    let report = Relocator::new(&root, RelocateConfig::default()).restore();

    assert!(report.restored.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(!root.join("stray.txt").exists());
    assert!(outside.path().join("stray.txt").is_file());
}
