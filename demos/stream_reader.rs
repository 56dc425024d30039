//! Standalone demo that wires up discovery, verification, and the ingest
//! pipeline against a live sensor, printing stage throughput and the CSV
//! path as it runs: discover → verify → pipeline → shutdown.
//!
//! Usage:
//!     cargo run --bin hwt905-stream -- <output-dir> [preferred-device-path]

use clap::Parser;
use hwt905::config::Config;
use hwt905::connection::ConnectionSupervisor;
use hwt905::pipeline::{self, MotionStages, StopReason};
use hwt905::storage::RotatingCsvSink;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Stream decoded HWT905 samples into rotating CSV files")]
struct Args {
    /// Directory rotated CSV files are written into.
    output_dir: std::path::PathBuf,
    /// Preferred serial device path, tried before the discovered candidates.
    preferred_device: Option<String>,
    /// Run the optional motion-analysis stage (acceleration -> velocity/displacement/FFT).
    #[arg(long)]
    with_motion: bool,
}

fn main() -> hwt905::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut cfg = Config::default();
    cfg.storage.output_dir = args.output_dir;
    cfg.serial.preferred_path = args.preferred_device;
    cfg.motion_enabled = args.with_motion;

    loop {
        let mut supervisor = ConnectionSupervisor::new(cfg.serial.clone());
        let port = supervisor.establish(true)?;
        info!(path = %port.path, "connected");

        let angle_sink = RotatingCsvSink::new(
            cfg.storage.clone(),
            vec![
                "angle_roll".into(),
                "angle_pitch".into(),
                "angle_yaw".into(),
                "temperature".into(),
            ],
        );

        let motion = cfg.motion_enabled.then(|| MotionStages {
            motion_config: cfg.motion,
            processed_sink: None,
            publisher: None,
        });

        let mut handle = pipeline::spawn(port, angle_sink, motion, cfg.pipeline);

        while handle.is_running() {
            std::thread::sleep(Duration::from_millis(200));
        }

        if handle.shutdown() == StopReason::TransportFault {
            error!("transport fault, reconnecting");
            continue;
        }
        break;
    }

    info!("shutdown complete");
    Ok(())
}
