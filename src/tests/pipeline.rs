use super::*;
use crate::config::StorageConfig;
use std::io::{self, Cursor, Read as _};
use std::time::Duration;

/// A `Read` source that blocks (simulates a serial port's read timeout) once
/// its bytes are exhausted, rather than returning EOF, so the reader stage
/// behaves the way it does against a real serial port.
struct BlockingSource {
    cursor: Cursor<Vec<u8>>,
}

impl Read for BlockingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.cursor.read(buf)?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        Ok(n)
    }
}

fn angle_packet(roll: i16, pitch: i16, yaw: i16, temp: i16) -> Vec<u8> {
    use crate::protocol::checksum;
    let mut bytes = vec![0x55, 0x53];
    bytes.extend_from_slice(&roll.to_le_bytes());
    bytes.extend_from_slice(&pitch.to_le_bytes());
    bytes.extend_from_slice(&yaw.to_le_bytes());
    bytes.extend_from_slice(&temp.to_le_bytes());
    let cs = checksum(&bytes);
    bytes.push(cs);
    bytes
}

fn test_storage(dir: &std::path::Path) -> RotatingCsvSink {
    RotatingCsvSink::new(
        StorageConfig {
            output_dir: dir.to_path_buf(),
            rotation_interval: Duration::from_secs(3600),
            continue_on_startup: false,
            ..StorageConfig::default()
        },
        vec![
            "angle_roll".into(),
            "angle_pitch".into(),
            "angle_yaw".into(),
            "temperature".into(),
        ],
    )
}

#[test]
fn reader_and_decoder_drain_to_csv_on_shutdown() {
    let dir = std::env::temp_dir().join(format!(
        "hwt905-pipeline-test-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let mut stream = Vec::new();
    stream.extend(angle_packet(100, 200, 300, 2500));
    stream.extend(angle_packet(110, 210, 310, 2600));

    let (raw_tx, raw_rx) = crossbeam_channel::bounded(64);
    let run_flag = Arc::new(AtomicBool::new(true));
    let transport_fault = Arc::new(AtomicBool::new(false));

    let source = BlockingSource {
        cursor: Cursor::new(stream),
    };
    let mut framer_port: Box<dyn Read + Send> = Box::new(source);

    // Feed the reader loop directly (it only needs `Read`, and the test
    // double isn't a `SerialPort`), mirroring `reader_stage`'s body closely
    // enough to exercise the framing + enqueue path end to end.
    let mut framer = PacketFramer::new();
    let mut scratch = [0u8; 4096];
    for _ in 0..2 {
        match framer_port.read(&mut scratch) {
            Ok(n) if n > 0 => framer.push_bytes(&scratch[..n]),
            _ => break,
        }
        while let Some(FrameEvent::Packet(p)) = framer.next_packet() {
            raw_tx.send(p).unwrap();
        }
    }
    drop(raw_tx);

    let sink = test_storage(&dir);
    decoder_stage(raw_rx, sink, None, run_flag.clone(), Duration::from_millis(50), Duration::from_secs(10));

    let csv_files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(csv_files.len(), 1);
    let contents = std::fs::read_to_string(csv_files[0].path()).unwrap();
    assert_eq!(contents.lines().count(), 3); // header + 2 rows

    let _ = transport_fault;
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn shutdown_is_idempotent() {
    let dir = std::env::temp_dir().join(format!(
        "hwt905-pipeline-idempotent-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let (_raw_tx, raw_rx) = crossbeam_channel::bounded::<ValidatedPacket>(8);
    let run_flag = Arc::new(AtomicBool::new(true));
    let sink = test_storage(&dir);
    let run_flag_for_stage = run_flag.clone();
    let handle = thread::spawn(move || {
        decoder_stage(raw_rx, sink, None, run_flag_for_stage, Duration::from_millis(20), Duration::from_secs(10))
    });

    let mut pipeline = PipelineHandle {
        run_flag,
        transport_fault: Arc::new(AtomicBool::new(false)),
        stages: vec![("decoder", handle)],
        join_timeout: Duration::from_secs(2),
        shut_down: false,
    };

    assert_eq!(pipeline.shutdown(), StopReason::Requested);
    assert_eq!(pipeline.shutdown(), StopReason::Requested);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn batch_average_strategy_combines_results() {
    use crate::motion::processor::{Axis3, ProcessedResult};

    let make = |v: f64| ProcessedResult {
        ts: v,
        acc_filtered: Axis3 { x: v, y: v, z: v },
        vel: Axis3 { x: v, y: v, z: v },
        disp: Axis3 { x: v, y: v, z: v },
        dominant_freq: Axis3 { x: v, y: v, z: v },
        rls_warmed_up: true,
    };
    let results = vec![make(1.0), make(2.0), make(3.0)];
    let avg = average_results(&results);
    assert!((avg.vel.x - 2.0).abs() < 1e-9);
    assert!((avg.disp.z - 2.0).abs() < 1e-9);
}
