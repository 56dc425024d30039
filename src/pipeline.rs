//! Three (optionally four) stage ingest pipeline: reader, decoder-storer,
//! optional motion processor, optional publisher, connected by bounded
//! `crossbeam-channel` queues and a single shared run-flag: one
//! `Arc<AtomicBool>` stop flag, one dedicated thread per stage, a bounded
//! channel instead of an unbounded one so a stalled consumer applies
//! backpressure upstream.

use crate::config::{MotionConfig, PipelineConfig};
use crate::connection::OpenPort;
use crate::error::Result;
use crate::framer::{FrameEvent, PacketFramer, ValidatedPacket};
use crate::motion::processor::{MotionProcessor, ProcessedResult};
use crate::storage::RotatingCsvSink;
use crate::types::DecodedSample;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use serialport::SerialPort;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// How a pipeline run ended, reported by [`PipelineHandle::shutdown`] so a
/// caller driving reconnection can tell a clean stop from one triggered by
/// a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    TransportFault,
}

/// A batching policy the publisher stage may apply before handing a result
/// to the external publish callable, decoupled from `MotionProcessor`
/// itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchStrategy {
    /// Publish every result as it arrives.
    Continuous,
    /// Publish once every `n` results have accumulated, as a `Vec`.
    Batch(usize),
    /// Publish the element-wise average of every `n` results.
    BatchAverage(usize),
}

/// Counts samples processed by a stage and periodically logs a throughput
/// figure.
struct RateCounter {
    stage: &'static str,
    count: u64,
    window_start: Instant,
    report_interval: Duration,
}

impl RateCounter {
    fn new(stage: &'static str, report_interval: Duration) -> Self {
        Self {
            stage,
            count: 0,
            window_start: Instant::now(),
            report_interval,
        }
    }

    fn tick(&mut self) {
        self.count += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.report_interval {
            let rate = self.count as f64 / elapsed.as_secs_f64();
            info!(stage = self.stage, rate_hz = rate, "stage throughput");
            self.count = 0;
            self.window_start = Instant::now();
        }
    }
}

/// Handle to a running pipeline: owns the shared run-flag and the join
/// handles of every spawned stage.
pub struct PipelineHandle {
    run_flag: Arc<AtomicBool>,
    transport_fault: Arc<AtomicBool>,
    stages: Vec<(&'static str, JoinHandle<()>)>,
    join_timeout: Duration,
    shut_down: bool,
}

impl PipelineHandle {
    /// Clears the run-flag so every stage wakes within its timeout and
    /// exits; joins each stage with a bounded timeout, logging (not
    /// panicking) on any stage that doesn't finish in time. Idempotent:
    /// calling this again on an already shut-down pipeline is a no-op.
    pub fn shutdown(&mut self) -> StopReason {
        if !self.shut_down {
            self.run_flag.store(false, Ordering::SeqCst);
            self.shut_down = true;
        }
        for (name, handle) in self.stages.drain(..) {
            join_with_timeout(name, handle, self.join_timeout);
        }
        if self.transport_fault.load(Ordering::SeqCst) {
            StopReason::TransportFault
        } else {
            StopReason::Requested
        }
    }

    /// True once a stage has observed a transport fault. The caller uses
    /// this to decide whether to reconnect and rebuild the pipeline.
    pub fn transport_faulted(&self) -> bool {
        self.transport_fault.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.run_flag.load(Ordering::SeqCst)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}

fn join_with_timeout(name: &'static str, handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(stage = name, "stage did not join within timeout, abandoning");
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if let Err(e) = handle.join() {
        warn!(stage = name, error = ?e, "stage thread panicked");
    }
}

/// Blocking send that still wakes to check the run-flag every second, so a
/// full downstream queue cannot stall shutdown forever.
fn send_with_backpressure<T>(tx: &Sender<T>, item: T, run_flag: &AtomicBool) -> bool {
    let mut item = item;
    loop {
        match tx.send_timeout(item, Duration::from_secs(1)) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(returned)) => {
                item = returned;
                if !run_flag.load(Ordering::SeqCst) {
                    return false;
                }
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// What the decoder-storer stage needs to turn an ANGLE sample into a CSV
/// row; kept separate from [`DecodedSample`] so the sink's column order is
/// explicit at the call site rather than implied by enum layout.
fn angle_row(sample: &DecodedSample) -> Option<(f64, [f64; 4])> {
    sample
        .as_angle()
        .map(|a| (sample.timestamp_unix_s, [a.roll_deg, a.pitch_deg, a.yaw_deg, a.temperature_c]))
}

/// Reader stage (R): reads bytes from the serial port, frames them, and
/// enqueues each raw validated packet. On a transport error it sets both
/// the run-flag and the transport-fault flag and exits.
fn reader_stage(
    mut port: Box<dyn SerialPort>,
    raw_tx: Sender<ValidatedPacket>,
    run_flag: Arc<AtomicBool>,
    transport_fault: Arc<AtomicBool>,
    report_interval: Duration,
) {
    let mut framer = PacketFramer::new();
    let mut scratch = [0u8; 4096];
    let mut rate = RateCounter::new("reader", report_interval);

    'outer: while run_flag.load(Ordering::SeqCst) {
        match port.read(&mut scratch) {
            Ok(0) => {}
            Ok(n) => framer.push_bytes(&scratch[..n]),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, "reader stage hit a transport fault");
                transport_fault.store(true, Ordering::SeqCst);
                run_flag.store(false, Ordering::SeqCst);
                break 'outer;
            }
        }

        while let Some(event) = framer.next_packet() {
            match event {
                FrameEvent::Packet(packet) => {
                    rate.tick();
                    if !send_with_backpressure(&raw_tx, packet, &run_flag) {
                        break 'outer;
                    }
                }
                FrameEvent::Drop(drop) => {
                    debug!(?drop, "framer resync observation");
                }
            }
        }
    }
    info!("reader stage exiting");
}

/// Dequeues one raw packet and decodes it, logging and discarding it on a
/// decode failure rather than propagating the error.
fn decode_one(packet: ValidatedPacket) -> Option<DecodedSample> {
    match PacketFramer::decode(packet) {
        Ok(raw) => Some(DecodedSample::from_raw(raw, unix_now())),
        Err(e) => {
            debug!(error = %e, "dropping undecodable packet");
            None
        }
    }
}

/// Decoder+sink stage (D): dequeues raw packets, decodes them, writes
/// ANGLE rows to the CSV sink, and (when motion processing is enabled)
/// forwards ACCELERATION samples downstream. Drains the queue once
/// shutdown is requested, then propagates the end-of-stream sentinel.
fn decoder_stage(
    raw_rx: Receiver<ValidatedPacket>,
    mut sink: RotatingCsvSink,
    accel_tx: Option<Sender<Option<(f64, f64, f64, f64)>>>,
    run_flag: Arc<AtomicBool>,
    queue_timeout: Duration,
    report_interval: Duration,
) {
    let mut rate = RateCounter::new("decoder", report_interval);

    loop {
        match raw_rx.recv_timeout(queue_timeout) {
            Ok(packet) => {
                rate.tick();
                let Some(sample) = decode_one(packet) else {
                    continue;
                };
                if let Some((ts, values)) = angle_row(&sample) {
                    if let Err(e) = sink.write_row(ts, &values) {
                        warn!(error = %e, "CSV row lost");
                    }
                }
                if let Some(tx) = &accel_tx {
                    if let Some(acc) = sample.as_acceleration() {
                        let item = Some((sample.timestamp_unix_s, acc.x_g, acc.y_g, acc.z_g));
                        if !send_with_backpressure(tx, item, &run_flag) {
                            break;
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !run_flag.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Drain whatever is left in the queue before declaring end-of-stream.
    while let Ok(packet) = raw_rx.try_recv() {
        let Some(sample) = decode_one(packet) else {
            continue;
        };
        if let Some((ts, values)) = angle_row(&sample) {
            let _ = sink.write_row(ts, &values);
        }
        if let Some(tx) = &accel_tx {
            if let Some(acc) = sample.as_acceleration() {
                let _ = tx.send(Some((sample.timestamp_unix_s, acc.x_g, acc.y_g, acc.z_g)));
            }
        }
    }

    if let Some(tx) = &accel_tx {
        let _ = tx.send(None);
    }
    sink.close();
    info!("decoder stage exiting");
}

/// Processor stage (P): feeds each accelerometer sample to
/// [`MotionProcessor`] and forwards warmed-up results downstream.
fn processor_stage(
    accel_rx: Receiver<Option<(f64, f64, f64, f64)>>,
    mut processor: MotionProcessor,
    mut processed_sink: Option<RotatingCsvSink>,
    publish_tx: Option<Sender<Option<ProcessedResult>>>,
    run_flag: Arc<AtomicBool>,
    queue_timeout: Duration,
    report_interval: Duration,
) {
    let mut rate = RateCounter::new("processor", report_interval);

    loop {
        match accel_rx.recv_timeout(queue_timeout) {
            Ok(Some((ts, ax, ay, az))) => {
                rate.tick();
                if let Some(result) = processor.process_sample(ts, ax, ay, az) {
                    if let Some(sink) = processed_sink.as_mut() {
                        let row = [
                            result.acc_filtered.x,
                            result.acc_filtered.y,
                            result.acc_filtered.z,
                            result.vel.x,
                            result.vel.y,
                            result.vel.z,
                            result.disp.x,
                            result.disp.y,
                            result.disp.z,
                            result.dominant_freq.x,
                            result.dominant_freq.y,
                            result.dominant_freq.z,
                        ];
                        if let Err(e) = sink.write_row(result.ts, &row) {
                            warn!(error = %e, "processed-result row lost");
                        }
                    }
                    if let Some(tx) = &publish_tx {
                        if !send_with_backpressure(tx, Some(result), &run_flag) {
                            break;
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(RecvTimeoutError::Timeout) => {
                if !run_flag.load(Ordering::SeqCst) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(tx) = &publish_tx {
        let _ = tx.send(None);
    }
    if let Some(sink) = processed_sink.as_mut() {
        sink.close();
    }
    info!("processor stage exiting");
}

/// Publisher stage (M): dequeues processed results, applies the configured
/// [`BatchStrategy`], and hands each resulting item to the external
/// publish callable (the MQTT transport, out of scope for this crate).
fn publisher_stage(
    rx: Receiver<Option<ProcessedResult>>,
    strategy: BatchStrategy,
    mut publish: Box<dyn FnMut(Vec<ProcessedResult>) + Send>,
    queue_timeout: Duration,
) {
    let mut pending: Vec<ProcessedResult> = Vec::new();

    loop {
        match rx.recv_timeout(queue_timeout) {
            Ok(Some(result)) => {
                match strategy {
                    BatchStrategy::Continuous => publish(vec![result]),
                    BatchStrategy::Batch(n) => {
                        pending.push(result);
                        if pending.len() >= n.max(1) {
                            publish(std::mem::take(&mut pending));
                        }
                    }
                    BatchStrategy::BatchAverage(n) => {
                        pending.push(result);
                        if pending.len() >= n.max(1) {
                            publish(vec![average_results(&pending)]);
                            pending.clear();
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if !pending.is_empty() {
        publish(pending);
    }
    info!("publisher stage exiting");
}

fn average_results(results: &[ProcessedResult]) -> ProcessedResult {
    let n = results.len() as f64;
    let sum = |f: fn(&ProcessedResult) -> f64| results.iter().map(f).sum::<f64>() / n;
    ProcessedResult {
        ts: results.last().map(|r| r.ts).unwrap_or(0.0),
        acc_filtered: crate::motion::processor::Axis3 {
            x: sum(|r| r.acc_filtered.x),
            y: sum(|r| r.acc_filtered.y),
            z: sum(|r| r.acc_filtered.z),
        },
        vel: crate::motion::processor::Axis3 {
            x: sum(|r| r.vel.x),
            y: sum(|r| r.vel.y),
            z: sum(|r| r.vel.z),
        },
        disp: crate::motion::processor::Axis3 {
            x: sum(|r| r.disp.x),
            y: sum(|r| r.disp.y),
            z: sum(|r| r.disp.z),
        },
        dominant_freq: crate::motion::processor::Axis3 {
            x: sum(|r| r.dominant_freq.x),
            y: sum(|r| r.dominant_freq.y),
            z: sum(|r| r.dominant_freq.z),
        },
        rls_warmed_up: true,
    }
}

/// Everything needed to spawn the optional motion-processing and publisher
/// stages (P and M). Leaving this `None` runs only R and D.
pub struct MotionStages {
    pub motion_config: MotionConfig,
    /// A second rotating sink for processed results, independent of the
    /// angle-row sink written by stage D.
    pub processed_sink: Option<RotatingCsvSink>,
    pub publisher: Option<(BatchStrategy, Box<dyn FnMut(Vec<ProcessedResult>) + Send>)>,
}

/// Spawn the full pipeline over an already-established, already-configured
/// serial connection. Returns a handle the caller uses to request
/// shutdown; each stage runs on its own OS thread.
pub fn spawn(
    port: OpenPort,
    angle_sink: RotatingCsvSink,
    motion: Option<MotionStages>,
    cfg: PipelineConfig,
) -> PipelineHandle {
    let run_flag = Arc::new(AtomicBool::new(true));
    let transport_fault = Arc::new(AtomicBool::new(false));
    let mut stages: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    let (raw_tx, raw_rx) = crossbeam_channel::bounded(cfg.raw_queue_capacity);

    let accel_channel = motion
        .is_some()
        .then(|| crossbeam_channel::bounded(cfg.decoded_queue_capacity));
    let accel_tx = accel_channel.as_ref().map(|(tx, _)| tx.clone());
    let accel_rx = accel_channel.map(|(_, rx)| rx);

    {
        let reader_port = port.port;
        let raw_tx = raw_tx.clone();
        let run_flag = run_flag.clone();
        let transport_fault = transport_fault.clone();
        let interval = cfg.throughput_report_interval;
        stages.push((
            "reader",
            thread::Builder::new()
                .name("hwt905-reader".into())
                .spawn(move || reader_stage(reader_port, raw_tx, run_flag, transport_fault, interval))
                .expect("spawn reader stage"),
        ));
    }
    drop(raw_tx);

    {
        let run_flag = run_flag.clone();
        let queue_timeout = cfg.queue_get_timeout;
        let interval = cfg.throughput_report_interval;
        stages.push((
            "decoder",
            thread::Builder::new()
                .name("hwt905-decoder".into())
                .spawn(move || {
                    decoder_stage(raw_rx, angle_sink, accel_tx, run_flag, queue_timeout, interval)
                })
                .expect("spawn decoder stage"),
        ));
    }

    if let (Some(motion), Some(accel_rx)) = (motion, accel_rx) {
        let processor = MotionProcessor::new(motion.motion_config);
        let (publish_strategy, publish_fn) = match motion.publisher {
            Some((strategy, f)) => (strategy, Some(f)),
            None => (BatchStrategy::Continuous, None),
        };

        let publish_channel = publish_fn
            .is_some()
            .then(|| crossbeam_channel::bounded(cfg.publish_queue_capacity));
        let publish_tx = publish_channel.as_ref().map(|(tx, _)| tx.clone());
        let publish_rx = publish_channel.map(|(_, rx)| rx);

        {
            let run_flag = run_flag.clone();
            let queue_timeout = cfg.queue_get_timeout;
            let interval = cfg.throughput_report_interval;
            stages.push((
                "processor",
                thread::Builder::new()
                    .name("hwt905-processor".into())
                    .spawn(move || {
                        processor_stage(
                            accel_rx,
                            processor,
                            motion.processed_sink,
                            publish_tx,
                            run_flag,
                            queue_timeout,
                            interval,
                        )
                    })
                    .expect("spawn processor stage"),
            ));
        }

        if let (Some(publish_fn), Some(publish_rx)) = (publish_fn, publish_rx) {
            let queue_timeout = cfg.queue_get_timeout;
            stages.push((
                "publisher",
                thread::Builder::new()
                    .name("hwt905-publisher".into())
                    .spawn(move || publisher_stage(publish_rx, publish_strategy, publish_fn, queue_timeout))
                    .expect("spawn publisher stage"),
            ));
        }
    }

    PipelineHandle {
        run_flag,
        transport_fault,
        stages,
        join_timeout: cfg.stage_join_timeout,
        shut_down: false,
    }
}

#[cfg(test)]
#[path = "tests/pipeline.rs"]
mod pipeline_tests;
