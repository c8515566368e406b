use dupestage::actions::{RelocateConfig, RelocateError, RelocationState, Relocator};
use dupestage::duplicates::DuplicateFinder;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_scenario_a_two_identical_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a/1.txt"), b"X");
    write(&dir.path().join("b/1.txt"), b"X");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].keeper.path, root.join("a/1.txt"));
    assert_eq!(groups[0].candidates.len(), 1);
    assert_eq!(groups[0].candidates[0].path, root.join("b/1.txt"));

    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&groups);

    assert!(report.all_succeeded());
    assert_eq!(report.relocated_count(), 1);
    assert!(root.join("a/1.txt").exists());
    assert!(!root.join("b/1.txt").exists());
    assert_eq!(fs::read(root.join("to_delete/b/1.txt")).unwrap(), b"X");
}

#[test]
fn test_scenario_b_different_sizes_never_hashed() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("x.bin"), &[1u8; 10]);
    write(&dir.path().join("y.bin"), &[1u8; 20]);

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert!(groups.is_empty());
    assert_eq!(detection.summary().hashed_files, 0);

    let report = Relocator::new(detection.root(), RelocateConfig::default()).relocate_groups(&groups);
    assert!(report.records.is_empty());
    assert!(!detection.root().join("to_delete").exists());
}

#[test]
fn test_scenario_c_three_copies() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("one/data.csv"), b"a,b,c\n1,2,3\n");
    write(&dir.path().join("two/data.csv"), b"a,b,c\n1,2,3\n");
    write(&dir.path().join("three/data.csv"), b"a,b,c\n1,2,3\n");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    assert_eq!(groups[0].keeper.path, root.join("one/data.csv"));

    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&groups);

    assert_eq!(report.relocated_count(), 2);
    let destinations: Vec<_> = report
        .records
        .iter()
        .filter_map(|r| r.destination.clone())
        .collect();
    assert_eq!(destinations.len(), 2);
    assert_ne!(destinations[0], destinations[1]);
    assert!(root.join("to_delete/three/data.csv").is_file());
    assert!(root.join("to_delete/two/data.csv").is_file());
    assert!(root.join("one/data.csv").is_file());
}

#[test]
fn test_scenario_d_candidate_vanishes_before_relocation() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"shared");
    write(&dir.path().join("b.txt"), b"shared");
    write(&dir.path().join("c.txt"), b"shared");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let groups = detection.groups();
    assert_eq!(groups[0].candidates.len(), 2);

    fs::remove_file(root.join("b.txt")).unwrap();

    let report = Relocator::new(&root, RelocateConfig::default()).relocate_groups(&groups);

    assert_eq!(report.failure_count(), 1);
    match &report.failures[0] {
        RelocateError::RelocationFailed { path, .. } => assert_eq!(path, &root.join("b.txt")),
        other => panic!("Expected RelocationFailed, got {other:?}"),
    }
    assert_eq!(report.records[0].state, RelocationState::Failed);
    assert_eq!(report.records[1].state, RelocationState::Relocated);
    assert_eq!(report.relocated_count(), 1);
    assert!(root.join("to_delete/c.txt").is_file());
    assert!(root.join("a.txt").is_file());
}

#[test]
fn test_keeper_ignores_modification_times() {
    let dir = tempdir().unwrap();
    let shallow = dir.path().join("z_newest.txt");
    let deep = dir.path().join("a/oldest.txt");
    write(&shallow, b"timestamps do not matter");
    write(&deep, b"timestamps do not matter");
    set_file_mtime(&deep, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    set_file_mtime(&shallow, FileTime::from_unix_time(2_000_000_000, 0)).unwrap();

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert_eq!(groups[0].keeper.path, detection.root().join("z_newest.txt"));
}

#[test]
fn test_keeper_tie_broken_by_full_path_string() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a/1.txt"), b"same");
    write(&dir.path().join("a b/1.txt"), b"same");
    write(&dir.path().join("a-b/1.txt"), b"same");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = detection.root().to_path_buf();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].keeper.path, root.join("a b/1.txt"));
    let candidates: Vec<_> = groups[0].candidates.iter().map(|c| c.path.clone()).collect();
    assert_eq!(candidates, vec![root.join("a-b/1.txt"), root.join("a/1.txt")]);
}
