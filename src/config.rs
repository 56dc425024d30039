//! Tunable parameters for every component, collected into one `Config` so a
//! caller can deserialize it from whatever config-file format it prefers.
//! Parsing the file itself is out of scope for this crate; only the shape
//! and the numeric defaults are owned here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial connection parameters, consumed by [`crate::connection::ConnectionSupervisor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Preferred device path, tried before the discovered candidate list.
    pub preferred_path: Option<String>,
    /// Glob pattern used to discover candidate serial devices.
    pub discovery_glob: String,
    pub baud_rate: u32,
    /// Timeout for a single blocking serial read.
    pub read_timeout: Duration,
    /// How long the "test port with data" probe waits for bytes to arrive.
    pub probe_timeout: Duration,
    /// Base reconnect backoff; grows additively by one second per attempt.
    pub reconnect_backoff_base: Duration,
    pub reconnect_backoff_cap: Duration,
    /// Consecutive read failures before the supervisor tears down and
    /// rediscovers the port, rather than retrying the same one.
    pub consecutive_failure_threshold: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            preferred_path: None,
            discovery_glob: "/dev/ttyUSB*".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(100),
            probe_timeout: Duration::from_millis(500),
            reconnect_backoff_base: Duration::from_secs(3),
            reconnect_backoff_cap: Duration::from_secs(10),
            consecutive_failure_threshold: 3,
        }
    }
}

/// Register-level configuration protocol timings: settle delays after
/// each write, read timeout, and write retry count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigProtocolConfig {
    pub read_timeout: Duration,
    pub write_retries: u32,
    pub unlock_settle: Duration,
    pub save_settle: Duration,
    pub restart_settle: Duration,
    pub factory_reset_settle: Duration,
}

impl Default for ConfigProtocolConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            write_retries: 3,
            unlock_settle: Duration::from_millis(100),
            save_settle: Duration::from_millis(200),
            restart_settle: Duration::from_secs(2),
            factory_reset_settle: Duration::from_secs(1),
        }
    }
}

/// Motion-processing parameters, shared by all three axes of
/// [`crate::motion::processor::MotionProcessor`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub sample_rate_hz: f64,
    pub sample_frame_size: usize,
    pub calc_frame_multiplier: usize,
    pub forgetting_factor: f64,
    pub warmup_frames: u32,
    pub fft_points: usize,
    pub min_freq_hz: f64,
    pub max_freq_hz: Option<f64>,
}

impl MotionConfig {
    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }

    pub fn calc_frame_size(&self) -> usize {
        self.sample_frame_size * self.calc_frame_multiplier
    }

    pub fn nyquist(&self) -> f64 {
        self.max_freq_hz.unwrap_or(1.0 / (2.0 * self.dt()))
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200.0,
            sample_frame_size: 20,
            calc_frame_multiplier: 100,
            forgetting_factor: 0.9825,
            warmup_frames: 5,
            fft_points: 512,
            min_freq_hz: 0.1,
            max_freq_hz: None,
        }
    }
}

/// CSV rotation parameters, consumed by [`crate::storage::RotatingCsvSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: std::path::PathBuf,
    pub rotation_interval: Duration,
    pub continue_on_startup: bool,
    /// Age beyond which `.sent`/`.empty` files are deleted by
    /// [`crate::storage::cleanup_uploaded_files`].
    pub cleanup_max_age: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: std::path::PathBuf::from("."),
            rotation_interval: Duration::from_secs(3600),
            continue_on_startup: false,
            cleanup_max_age: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Bounded-queue capacities and timeouts for the ingest pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_queue_capacity: usize,
    pub decoded_queue_capacity: usize,
    pub publish_queue_capacity: usize,
    pub queue_get_timeout: Duration,
    pub stage_join_timeout: Duration,
    pub throughput_report_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_queue_capacity: 8192,
            decoded_queue_capacity: 8192,
            publish_queue_capacity: 8192,
            queue_get_timeout: Duration::from_secs(1),
            stage_join_timeout: Duration::from_secs(5),
            throughput_report_interval: Duration::from_secs(10),
        }
    }
}

/// Root configuration, composed from the sections above.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub config_protocol: ConfigProtocolConfig,
    pub motion: MotionConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    /// Whether the processor stage (C5, motion analysis) runs at all.
    pub motion_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Config-file parsing is out of scope for this crate, but the shape
    /// it owns must still round-trip through whatever format a caller
    /// picks.
    #[test]
    fn default_config_round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.motion.sample_frame_size, cfg.motion.sample_frame_size);
        assert_eq!(back.storage.rotation_interval, cfg.storage.rotation_interval);
    }

    #[test]
    fn motion_config_derives_expected_constants() {
        let cfg = MotionConfig::default();
        assert_eq!(cfg.calc_frame_size(), 2000);
        assert!((cfg.dt() - 0.005).abs() < 1e-12);
    }
}
