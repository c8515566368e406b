use dupestage::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupestage::scanner::WalkerConfig;
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(!detection.has_duplicates());
    assert!(detection.groups().is_empty());
    assert_eq!(detection.summary().total_files, 0);
    assert_eq!(detection.summary().duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content bb");
    write(&dir.path().join("c.txt"), b"content ccc");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let summary = detection.summary();

    assert!(detection.groups().is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.eliminated_by_size, 3);
    // Size-first pruning: nothing with a unique size is read.
    assert_eq!(summary.hashed_files, 0);
    assert_eq!(summary.bytes_hashed, 0);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");
    write(&dir.path().join("c.txt"), b"unique");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();
    let summary = detection.summary();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.hashed_files, 2);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 9);
}

#[test]
fn test_same_size_different_content_not_grouped() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.bin"), b"aaaa");
    write(&dir.path().join("b.bin"), b"bbbb");
    write(&dir.path().join("c.bin"), b"aaaa");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert_eq!(detection.summary().hashed_files, 3);
    assert_eq!(groups.len(), 1);
    let root = detection.root();
    assert_eq!(groups[0].keeper.path, root.join("a.bin"));
    assert_eq!(groups[0].candidates[0].path, root.join("c.bin"));
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"nested duplicate");
    write(&dir.path().join("sub/deeper/b.txt"), b"nested duplicate");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].keeper.path, detection.root().join("a.txt"));
}

#[test]
fn test_groups_ordered_by_size_then_digest() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("big1"), b"0123456789");
    write(&dir.path().join("big2"), b"0123456789");
    write(&dir.path().join("small1"), b"01");
    write(&dir.path().join("small2"), b"01");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let sizes: Vec<u64> = detection.groups().iter().map(|g| g.size()).collect();

    assert_eq!(sizes, vec![2, 10]);
}

#[test]
fn test_empty_files_skipped_by_default() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.empty"), b"");
    write(&dir.path().join("b.empty"), b"");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert!(!detection.has_duplicates());
    assert_eq!(detection.summary().skipped_entries, 2);

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::default().with_include_empty(true));
    let detection = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(detection.groups().len(), 1);
    assert_eq!(detection.summary().reclaimable_space, 0);
}

#[test]
fn test_min_size_filter() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("small1"), b"tiny");
    write(&dir.path().join("small2"), b"tiny");
    write(&dir.path().join("large1"), &[7u8; 2048]);
    write(&dir.path().join("large2"), &[7u8; 2048]);

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::default().with_min_size(Some(1024)));
    let detection = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size(), 2048);
    assert_eq!(detection.summary().total_files, 2);
}

#[test]
fn test_ignore_patterns() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("keep/a.txt"), b"same");
    write(&dir.path().join("keep/b.txt"), b"same");
    write(&dir.path().join("build/c.txt"), b"same");
    write(&dir.path().join("keep/d.log"), b"same");

    let config = FinderConfig::default().with_walker_config(
        WalkerConfig::default().with_patterns(vec!["build/".to_string(), "*.log".to_string()]),
    );
    let detection = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    let groups = detection.groups();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(groups[0]
        .members()
        .all(|m| m.path.starts_with(detection.root().join("keep"))));
}

#[test]
fn test_skip_hidden() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("visible.txt"), b"same");
    write(&dir.path().join(".hidden.txt"), b"same");
    write(&dir.path().join(".git/objects/x"), b"same");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(detection.groups()[0].len(), 3);

    let config =
        FinderConfig::default().with_walker_config(WalkerConfig::default().with_skip_hidden(true));
    let detection = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    assert!(!detection.has_duplicates());
    assert_eq!(detection.summary().total_files, 1);
}

#[test]
fn test_quarantine_directory_excluded() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("to_delete/a.txt"), b"same");

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert!(!detection.has_duplicates());
    assert_eq!(detection.summary().total_files, 1);

    // A custom quarantine name excludes that directory instead.
    let config = FinderConfig::default().with_quarantine_dir("staging");
    let detection = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(detection.groups().len(), 1);
}

#[test]
fn test_invalid_root_nonexistent() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&missing)
        .unwrap_err();
    match err {
        FinderError::InvalidRoot { path, .. } => assert_eq!(path, missing),
        other => panic!("Expected InvalidRoot, got {other:?}"),
    }
}

#[test]
fn test_invalid_root_is_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    write(&file, b"not a dir");

    let err = DuplicateFinder::with_defaults()
        .find_duplicates(&file)
        .unwrap_err();
    assert!(matches!(err, FinderError::InvalidRoot { .. }));
    assert!(err.to_string().contains("not a directory"));
}

#[test]
fn test_shutdown_before_scan() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("b.txt"), b"same");

    let config = FinderConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let err = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap_err();
    assert!(matches!(err, FinderError::Interrupted));
}

#[test]
fn test_detection_is_deterministic() {
    let dir = tempdir().unwrap();
    for (i, dirname) in ["z", "m", "a", "q/r"].iter().enumerate() {
        write(&dir.path().join(dirname).join("one.dat"), b"first class");
        write(&dir.path().join(dirname).join("two.dat"), b"second class!");
        write(
            &dir.path().join(dirname).join("unique.dat"),
            format!("unique {i}").as_bytes(),
        );
    }

    let run = |threads: usize| {
        let detection = DuplicateFinder::new(FinderConfig::default().with_io_threads(threads))
            .find_duplicates(dir.path())
            .unwrap();
        detection
            .groups()
            .iter()
            .map(|g| {
                (
                    g.fingerprint,
                    g.keeper.path.clone(),
                    g.candidates.iter().map(|c| c.path.clone()).collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>()
    };

    let first = run(1);
    assert_eq!(first.len(), 2);
    assert_eq!(first, run(4));
    assert_eq!(first, run(8));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same data");
    write(&dir.path().join("b.txt"), b"same data");
    let locked = dir.path().join("c.txt");
    write(&locked, b"same data");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read(&locked).is_ok() {
        // Running as root; permissions are not enforced.
        return;
    }

    let detection = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let summary = detection.summary();

    assert_eq!(summary.unhashable_files, 1);
    assert_eq!(summary.scan_errors.len(), 1);
    assert_eq!(summary.scan_errors[0].path(), detection.root().join("c.txt"));
    let groups = detection.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}
