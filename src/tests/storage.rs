use super::*;
use std::time::Duration;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hwt905-storage-test-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cfg(dir: &Path, rotation_interval: Duration, continue_on_startup: bool) -> StorageConfig {
    StorageConfig {
        output_dir: dir.to_path_buf(),
        rotation_interval,
        continue_on_startup,
        ..StorageConfig::default()
    }
}

#[test]
fn cleanup_removes_aged_out_sent_and_empty_files_only() {
    let dir = test_dir("cleanup");
    fs::write(dir.join("data_20260101-000000.csv.sent"), b"old").unwrap();
    fs::write(dir.join("data_20260101-010000.csv.empty"), b"old").unwrap();
    fs::write(dir.join("data_20260727-000000.csv.sent"), b"fresh").unwrap();
    fs::write(dir.join("data_20260727-010000.csv"), b"untouched").unwrap();

    let old_time = std::time::SystemTime::now() - Duration::from_secs(8 * 24 * 3600);
    for name in ["data_20260101-000000.csv.sent", "data_20260101-010000.csv.empty"] {
        let path = dir.join(name);
        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(old_time).unwrap();
    }

    let removed = cleanup_uploaded_files(&dir, Duration::from_secs(7 * 24 * 3600)).unwrap();
    assert_eq!(removed, 2);

    let remaining: std::collections::HashSet<_> = fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(remaining.contains("data_20260727-000000.csv.sent"));
    assert!(remaining.contains("data_20260727-010000.csv"));
    assert_eq!(remaining.len(), 2);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn header_written_once_and_rows_appended() {
    let dir = test_dir("header");
    let mut sink = RotatingCsvSink::new(
        cfg(&dir, Duration::from_secs(3600), false),
        vec!["angle_roll".into(), "angle_pitch".into(), "angle_yaw".into()],
    );
    sink.write_row(1.0, &[1.0, 2.0, 3.0]).unwrap();
    sink.write_row(2.0, &[4.0, 5.0, 6.0]).unwrap();
    let path = sink.current_path().unwrap().to_path_buf();
    sink.close();

    let contents = fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next().unwrap(), "timestamp,angle_roll,angle_pitch,angle_yaw");
    assert_eq!(lines.next().unwrap(), "1,1,2,3");
    assert_eq!(lines.next().unwrap(), "2,4,5,6");
    assert!(lines.next().is_none());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn rotation_creates_a_new_file_after_the_interval() {
    let dir = test_dir("rotate");
    let mut sink = RotatingCsvSink::new(
        cfg(&dir, Duration::from_millis(50), false),
        vec!["v".into()],
    );
    sink.write_row(0.0, &[1.0]).unwrap();
    let first_path = sink.current_path().unwrap().to_path_buf();

    std::thread::sleep(Duration::from_millis(80));
    sink.write_row(1.0, &[2.0]).unwrap();
    let second_path = sink.current_path().unwrap().to_path_buf();

    assert_ne!(first_path, second_path);
    let csv_files: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".csv"))
        .collect();
    assert_eq!(csv_files.len(), 2);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn continue_file_reopens_without_rewriting_header() {
    let dir = test_dir("continue");
    {
        let mut sink = RotatingCsvSink::new(
            cfg(&dir, Duration::from_secs(3600), false),
            vec!["v".into()],
        );
        sink.write_row(0.0, &[1.0]).unwrap();
        sink.close();
    }

    let mut sink = RotatingCsvSink::new(
        cfg(&dir, Duration::from_secs(3600), true),
        vec!["v".into()],
    );
    sink.write_row(1.0, &[2.0]).unwrap();
    let path = sink.current_path().unwrap().to_path_buf();
    sink.close();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines, vec!["timestamp,v", "0,1", "1,2"]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn continue_file_falls_back_to_fresh_after_window_elapses() {
    let dir = test_dir("continue-expired");
    {
        let mut sink = RotatingCsvSink::new(
            cfg(&dir, Duration::from_millis(20), false),
            vec!["v".into()],
        );
        sink.write_row(0.0, &[1.0]).unwrap();
        sink.close();
    }
    std::thread::sleep(Duration::from_millis(60));

    let mut sink = RotatingCsvSink::new(
        cfg(&dir, Duration::from_millis(20), true),
        vec!["v".into()],
    );
    sink.write_row(1.0, &[2.0]).unwrap();
    let csv_files: Vec<_> = fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".csv"))
        .collect();
    assert_eq!(csv_files.len(), 2);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn close_is_idempotent() {
    let dir = test_dir("close-idempotent");
    let mut sink = RotatingCsvSink::new(
        cfg(&dir, Duration::from_secs(3600), false),
        vec!["v".into()],
    );
    sink.write_row(0.0, &[1.0]).unwrap();
    sink.close();
    sink.close();
    fs::remove_dir_all(&dir).ok();
}
