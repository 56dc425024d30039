//! Port discovery, establish/reconnect, and baudrate verification.

use crate::config::SerialConfig;
use crate::configproto::ConfigProtocol;
use crate::error::{Error, Result};
use serialport::SerialPort;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A serial device candidate path, already known to exist on disk.
fn discover_ports(glob_pattern: &str) -> Vec<PathBuf> {
    let path = Path::new(glob_pattern);
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    let file_pattern = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let prefix = file_pattern.trim_end_matches('*');

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates
}

/// An open, verified serial connection, ready for the pipeline's reader
/// stage or a [`ConfigProtocol`] session.
pub struct OpenPort {
    pub path: String,
    pub port: Box<dyn SerialPort>,
}

pub struct ConnectionSupervisor {
    cfg: SerialConfig,
    consecutive_failures: u32,
}

impl ConnectionSupervisor {
    pub fn new(cfg: SerialConfig) -> Self {
        Self {
            cfg,
            consecutive_failures: 0,
        }
    }

    fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut discovered = discover_ports(&self.cfg.discovery_glob);
        if let Some(preferred) = &self.cfg.preferred_path {
            let preferred_path = PathBuf::from(preferred);
            if preferred_path.exists() {
                discovered.retain(|p| p != &preferred_path);
                discovered.insert(0, preferred_path);
            }
        }
        discovered
    }

    /// Probe an already-open port for live data: succeed early once more
    /// than 100 bytes have accumulated, or succeed late at any nonzero
    /// count once the probe timeout elapses.
    fn probe_has_data(&self, port: &mut dyn SerialPort) -> bool {
        let deadline = Instant::now() + self.cfg.probe_timeout;
        loop {
            match port.bytes_to_read() {
                Ok(n) if n > 100 => return true,
                Ok(n) if n > 0 && Instant::now() >= deadline => return true,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Open a candidate port, flush its buffers, and optionally verify it
    /// is producing data before accepting it.
    fn try_open(&self, path: &Path, verify: bool) -> Result<OpenPort> {
        let mut port = serialport::new(path.to_string_lossy(), self.cfg.baud_rate)
            .timeout(self.cfg.read_timeout)
            .open()?;
        port.clear(serialport::ClearBuffer::All).ok();

        if verify && !self.probe_has_data(port.as_mut()) {
            return Err(Error::NoPortAvailable(1));
        }

        Ok(OpenPort {
            path: path.to_string_lossy().into_owned(),
            port,
        })
    }

    /// Try each candidate in order, sleeping and retrying the whole pass on
    /// total failure. `verify` controls whether the "test port with data"
    /// probe gates acceptance.
    pub fn establish(&mut self, verify: bool) -> Result<OpenPort> {
        let mut backoff = self.cfg.reconnect_backoff_base;
        loop {
            let candidates = self.candidate_paths();
            for path in &candidates {
                match self.try_open(path, verify) {
                    Ok(open) => {
                        info!(port = %open.path, "serial connection established");
                        self.consecutive_failures = 0;
                        return Ok(open);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "candidate port failed");
                    }
                }
            }
            warn!(attempted = candidates.len(), backoff_s = backoff.as_secs(), "no usable serial port found, backing off");
            std::thread::sleep(backoff);
            backoff = (backoff + Duration::from_secs(1)).min(self.cfg.reconnect_backoff_cap);
        }
    }

    /// Called by the reader stage on a transport error: counts the failure
    /// and reports whether it crosses the threshold that should trigger a
    /// full reconnect rather than a simple retry.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures >= self.cfg.consecutive_failure_threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// Convenience wrapper used by startup and by `factory_reset`: open a
/// config session on an already-established port.
pub fn config_session(
    open: OpenPort,
    cfg: crate::config::ConfigProtocolConfig,
) -> ConfigProtocol<Box<dyn SerialPort>> {
    ConfigProtocol::new(open.port, cfg)
}
