//! # hwt905 — edge-side ingest and motion-analysis pipeline
//!
//! A Rust library for a resilient edge-side data pipeline sitting in front
//! of a WitMotion HWT905-class 6/9-axis inertial sensor: a framed serial
//! protocol, a register read/write configuration layer, connection
//! supervision with auto-reconnect, a multi-stage ingest pipeline, an
//! RLS/FFT motion-analysis core, and rotating CSV persistence.
//!
//! ## Layout
//!
//! - [`protocol`] / [`framer`] / [`packet`] / [`types`] — the wire format:
//!   checksums, command encoding, packet framing, and decoded sample types.
//! - [`configproto`] / [`command`] — the register read/write protocol and
//!   the composite configuration operations (unlock, save, factory reset).
//! - [`connection`] — serial port discovery, establish, and reconnect.
//! - [`pipeline`] — the reader/decoder/processor/publisher stage graph.
//! - [`motion`] — the RLS double integrator and FFT dominant-frequency
//!   extractor that back the optional processor stage.
//! - [`storage`] — time-rotated CSV persistence.
//!
//! ## Example usage
//!
//! ```rust,no_run
//! use hwt905::config::Config;
//! use hwt905::connection::ConnectionSupervisor;
//! use hwt905::pipeline;
//! use hwt905::storage::RotatingCsvSink;
//!
//! let cfg = Config::default();
//! let mut supervisor = ConnectionSupervisor::new(cfg.serial.clone());
//! let port = supervisor.establish(true)?;
//!
//! let sink = RotatingCsvSink::new(
//!     cfg.storage.clone(),
//!     vec![
//!         "angle_roll".into(),
//!         "angle_pitch".into(),
//!         "angle_yaw".into(),
//!         "temperature".into(),
//!     ],
//! );
//!
//! let mut handle = pipeline::spawn(port, sink, None, cfg.pipeline);
//! // ... run until a shutdown signal arrives ...
//! handle.shutdown();
//! # Ok::<(), hwt905::error::Error>(())
//! ```

pub mod command;
pub mod config;
pub mod configproto;
pub mod connection;
pub mod error;
pub mod framer;
pub mod motion;
pub mod packet;
pub mod pipeline;
pub mod protocol;
pub mod reader;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use pipeline::{PipelineHandle, StopReason};
pub use types::DecodedSample;
