//! Three-axis motion processor: the computational heart of the pipeline's
//! optional analysis stage.

use super::fft::FftAnalyzer;
use super::filter::FrontEndFilter;
use super::rls::RlsIntegrator;
use crate::config::MotionConfig;
use tracing::warn;

/// Standard gravity, used to convert g-units to m/s^2.
pub const G: f64 = 9.80665;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axis3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedResult {
    pub ts: f64,
    pub acc_filtered: Axis3<f64>,
    pub vel: Axis3<f64>,
    pub disp: Axis3<f64>,
    pub dominant_freq: Axis3<f64>,
    pub rls_warmed_up: bool,
}

struct AxisState {
    filter: FrontEndFilter,
    rls: RlsIntegrator,
    fft: FftAnalyzer,
}

impl AxisState {
    fn new(cfg: &MotionConfig) -> Self {
        Self {
            filter: FrontEndFilter::None,
            rls: RlsIntegrator::new(cfg),
            fft: FftAnalyzer::new(cfg),
        }
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.rls.reset();
        self.fft.reset();
    }
}

pub struct MotionProcessor {
    cfg: MotionConfig,
    x: AxisState,
    y: AxisState,
    z: AxisState,
}

impl MotionProcessor {
    pub fn new(cfg: MotionConfig) -> Self {
        Self {
            x: AxisState::new(&cfg),
            y: AxisState::new(&cfg),
            z: AxisState::new(&cfg),
            cfg,
        }
    }

    /// Use a specific front-end filter (default is none) on all three axes.
    pub fn with_front_end_filter(mut self, make: impl Fn() -> FrontEndFilter) -> Self {
        self.x.filter = make();
        self.y.filter = make();
        self.z.filter = make();
        self
    }

    /// `process_sample(ax_g, ay_g, az_g) -> Option<ProcessedResult>`.
    pub fn process_sample(&mut self, ts: f64, ax_g: f64, ay_g: f64, az_g: f64) -> Option<ProcessedResult> {
        if !ax_g.is_finite() || !ay_g.is_finite() || !az_g.is_finite() {
            warn!("non-finite accelerometer sample dropped before processing");
            return None;
        }

        let ax = ax_g * G;
        let ay = ay_g * G;
        let az = (az_g - 1.0) * G;

        let fx = self.x.filter.apply(ax);
        let fy = self.y.filter.apply(ay);
        let fz = self.z.filter.apply(az);

        self.x.fft.push(fx);
        self.y.fft.push(fy);
        self.z.fft.push(fz);

        let rx = self.x.rls.push(fx);
        let ry = self.y.rls.push(fy);
        let rz = self.z.rls.push(fz);

        // The three axes receive exactly one push per call, so their frame
        // boundaries are always reached together.
        let (rx, ry, rz) = match (rx, ry, rz) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return None,
        };

        if !(rx.warmed_up && ry.warmed_up && rz.warmed_up) {
            return None;
        }

        Some(ProcessedResult {
            ts,
            acc_filtered: Axis3 { x: fx, y: fy, z: fz },
            vel: Axis3 {
                x: rx.velocity,
                y: ry.velocity,
                z: rz.velocity,
            },
            disp: Axis3 {
                x: rx.displacement,
                y: ry.displacement,
                z: rz.displacement,
            },
            dominant_freq: Axis3 {
                x: self.x.fft.dominant_frequency(),
                y: self.y.fft.dominant_frequency(),
                z: self.z.fft.dominant_frequency(),
            },
            rls_warmed_up: true,
        })
    }

    /// Clears every buffer, theta, P, frame_count, and filter state on all
    /// three axes.
    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }

    pub fn config(&self) -> &MotionConfig {
        &self.cfg
    }
}

#[cfg(test)]
#[path = "tests/processor.rs"]
mod processor_tests;
