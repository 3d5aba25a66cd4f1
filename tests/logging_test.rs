use regex::Regex;
use silent_upgrade::utils::logger::file_layer;
use silent_upgrade::utils::rotating_file::RotatingFile;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

fn with_file_log(log: RotatingFile, f: impl FnOnce()) {
    let subscriber = tracing_subscriber::registry().with(file_layer(log));
    tracing::subscriber::with_default(subscriber, f);
}

fn backups(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let name = path.file_name().unwrap().to_string_lossy();
            name.starts_with("run.log.") && name.ends_with(".bak")
        })
        .collect()
}

#[test]
fn test_line_format_and_levels() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.log");
    let log = RotatingFile::open(&path, 1024 * 1024).unwrap();

    with_file_log(log, || {
        tracing::info!("starting run");
        tracing::warn!("3 package(s) still pending");
        tracing::error!("FATAL: tool missing");
        tracing::debug!("not for the file");
        tracing::trace!("nor this");
    });

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3, "{}", contents);

    let pattern =
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} \[(INFO|WARN|ERROR)\] .+$").unwrap();
    for line in &lines {
        assert!(pattern.is_match(line), "bad line: {}", line);
    }
    assert!(lines[0].ends_with("[INFO] starting run"));
    assert!(lines[1].ends_with("[WARN] 3 package(s) still pending"));
    assert!(lines[2].ends_with("[ERROR] FATAL: tool missing"));
    assert!(!contents.contains("\u{1b}["));
}

#[test]
fn test_oversized_log_rotates_on_next_write() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.log");
    let old = "x".repeat(200);
    fs::write(&path, &old).unwrap();

    let log = RotatingFile::open(&path, 100).unwrap();
    assert!(backups(temp_dir.path()).is_empty());

    with_file_log(log, || tracing::info!("after rotation"));

    let rotated = backups(temp_dir.path());
    assert_eq!(rotated.len(), 1);
    assert_eq!(fs::read_to_string(&rotated[0]).unwrap(), old);

    let name = rotated[0].file_name().unwrap().to_string_lossy().to_string();
    let stamp = Regex::new(r"^run\.log\.\d{8}-\d{6}-\d{3}\.bak$").unwrap();
    assert!(stamp.is_match(&name), "unexpected backup name {}", name);

    let fresh = fs::read_to_string(&path).unwrap();
    assert_eq!(fresh.lines().count(), 1);
    assert!(fresh.contains("[INFO] after rotation"));
}

#[test]
fn test_small_log_is_not_rotated() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.log");
    let log = RotatingFile::open(&path, 1024 * 1024).unwrap();

    with_file_log(log, || {
        for i in 0..10 {
            tracing::info!("line {}", i);
        }
    });

    assert!(backups(temp_dir.path()).is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 10);
}
