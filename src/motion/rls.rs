//! Recursive-least-squares linear-trend-removing double integrator. One
//! instance per axis; `theta`/`p` persist across frames and across the two
//! detrend passes within a frame.

use crate::config::MotionConfig;
use tracing::warn;

/// Scalar output of one frame's integration, or zeros while still warming up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RlsFrame {
    pub velocity: f64,
    pub displacement: f64,
    pub warmed_up: bool,
}

#[derive(Debug, Clone)]
pub struct RlsIntegrator {
    dt: f64,
    q: f64,
    sample_frame_size: usize,
    warmup_frames: u32,
    acc_buffer: Vec<f64>,
    theta: [f64; 2],
    p: [[f64; 2]; 2],
    frame_count: u32,
    pending: Vec<f64>,
}

const INITIAL_P_DIAGONAL: f64 = 1000.0;

impl RlsIntegrator {
    pub fn new(cfg: &MotionConfig) -> Self {
        Self {
            dt: cfg.dt(),
            q: cfg.forgetting_factor,
            sample_frame_size: cfg.sample_frame_size,
            warmup_frames: cfg.warmup_frames,
            acc_buffer: vec![0.0; cfg.calc_frame_size()],
            theta: [0.0, 0.0],
            p: [[INITIAL_P_DIAGONAL, 0.0], [0.0, INITIAL_P_DIAGONAL]],
            frame_count: 0,
            pending: Vec::with_capacity(cfg.sample_frame_size),
        }
    }

    pub fn reset(&mut self) {
        let l = self.acc_buffer.len();
        self.acc_buffer = vec![0.0; l];
        self.theta = [0.0, 0.0];
        self.p = [[INITIAL_P_DIAGONAL, 0.0], [0.0, INITIAL_P_DIAGONAL]];
        self.frame_count = 0;
        self.pending.clear();
    }

    /// Append one preconditioned acceleration sample. Returns `Some` once
    /// every `sample_frame_size` samples have accumulated since the last
    /// return, `None` otherwise.
    pub fn push(&mut self, sample: f64) -> Option<RlsFrame> {
        let sample = if sample.is_finite() {
            sample
        } else {
            warn!("non-finite acceleration sample rejected at RLS entrance");
            0.0
        };

        self.pending.push(sample);
        if self.pending.len() < self.sample_frame_size {
            return None;
        }

        let n = self.pending.len();
        self.acc_buffer.drain(0..n);
        self.acc_buffer.extend(self.pending.drain(..));
        self.frame_count += 1;

        if self.frame_count <= self.warmup_frames {
            return Some(RlsFrame {
                velocity: 0.0,
                displacement: 0.0,
                warmed_up: false,
            });
        }

        let v_raw = integrate_trapezoidal(&self.acc_buffer, self.dt);
        let v_detrended = self.detrend(&v_raw);
        let d_raw = integrate_trapezoidal(&v_detrended, self.dt);
        let d_detrended = self.detrend(&d_raw);

        self.recover_from_non_finite_state();

        Some(RlsFrame {
            velocity: *v_detrended.last().unwrap_or(&0.0),
            displacement: *d_detrended.last().unwrap_or(&0.0),
            warmed_up: true,
        })
    }

    /// Update `theta`/`p` sample-by-sample against `data`, then subtract the
    /// best-fit line (computed from the *final* theta) from every sample.
    fn detrend(&mut self, data: &[f64]) -> Vec<f64> {
        for (i, &value) in data.iter().enumerate() {
            let t = i as f64 * self.dt;
            self.rls_update(t, value);
        }
        data.iter()
            .enumerate()
            .map(|(i, &value)| {
                let t = i as f64 * self.dt;
                value - (self.theta[0] * t + self.theta[1])
            })
            .collect()
    }

    fn rls_update(&mut self, t: f64, value: f64) {
        let phi = [t, 1.0];
        let e = value - (self.theta[0] * phi[0] + self.theta[1] * phi[1]);
        let p_phi = [
            self.p[0][0] * phi[0] + self.p[0][1] * phi[1],
            self.p[1][0] * phi[0] + self.p[1][1] * phi[1],
        ];
        let denom = self.q + phi[0] * p_phi[0] + phi[1] * p_phi[1];
        if denom == 0.0 {
            return;
        }
        let k = [p_phi[0] / denom, p_phi[1] / denom];
        self.theta[0] += k[0] * e;
        self.theta[1] += k[1] * e;

        let phi_p = [
            phi[0] * self.p[0][0] + phi[1] * self.p[1][0],
            phi[0] * self.p[0][1] + phi[1] * self.p[1][1],
        ];
        let mut new_p = [[0.0; 2]; 2];
        for i in 0..2 {
            for j in 0..2 {
                new_p[i][j] = (self.p[i][j] - k[i] * phi_p[j]) / self.q;
            }
        }
        self.p = new_p;
    }

    fn recover_from_non_finite_state(&mut self) {
        let corrupted = self.theta.iter().any(|v| !v.is_finite())
            || self.p.iter().flatten().any(|v| !v.is_finite());
        if corrupted {
            warn!("RLS covariance became non-finite, resetting P");
            self.theta = [0.0, 0.0];
            self.p = [[INITIAL_P_DIAGONAL, 0.0], [0.0, INITIAL_P_DIAGONAL]];
        }
    }
}

/// `v[i] = v[i-1] + (a[i-1]+a[i])*dt/2`, `v[0] = 0`.
fn integrate_trapezoidal(data: &[f64], dt: f64) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        out[i] = out[i - 1] + (data[i - 1] + data[i]) * dt / 2.0;
    }
    out
}

#[cfg(test)]
#[path = "tests/rls.rs"]
mod rls_tests;
