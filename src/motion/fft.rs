//! Windowed-FFT dominant-frequency extraction.

use crate::config::MotionConfig;
use num_complex::Complex;
use rustfft::FftPlanner;
use std::collections::VecDeque;
use std::f64::consts::PI;

#[derive(Debug, Clone)]
pub struct FftAnalyzer {
    n_fft: usize,
    dt: f64,
    min_freq_hz: f64,
    max_freq_hz: f64,
    buffer: VecDeque<f64>,
}

impl FftAnalyzer {
    pub fn new(cfg: &MotionConfig) -> Self {
        Self {
            n_fft: cfg.fft_points,
            dt: cfg.dt(),
            min_freq_hz: cfg.min_freq_hz,
            max_freq_hz: cfg.nyquist(),
            buffer: VecDeque::with_capacity(cfg.fft_points),
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.buffer.push_back(sample);
        if self.buffer.len() > self.n_fft {
            self.buffer.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns the frequency of the maximum-magnitude bin within
    /// `[min_freq_hz, max_freq_hz]`, or `0.0` if fewer than `n_fft`
    /// samples have been seen, or if no bin falls in the band.
    pub fn dominant_frequency(&self) -> f64 {
        if self.buffer.len() < self.n_fft {
            return 0.0;
        }

        let n = self.n_fft;
        let mut spectrum: Vec<Complex<f64>> = self
            .buffer
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let w = 0.5 - 0.5 * (2.0 * PI * i as f64 / (n as f64 - 1.0)).cos();
                Complex::new(x * w, 0.0)
            })
            .collect();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        fft.process(&mut spectrum);

        let half = n / 2 + 1;
        let mut best_freq = 0.0;
        let mut best_magnitude = -1.0f64;
        for (k, bin) in spectrum.iter().enumerate().take(half).skip(1) {
            let freq = k as f64 / (n as f64 * self.dt);
            if freq < self.min_freq_hz || freq > self.max_freq_hz {
                continue;
            }
            let magnitude = bin.norm();
            if magnitude > best_magnitude {
                best_magnitude = magnitude;
                best_freq = freq;
            }
        }
        best_freq
    }
}

#[cfg(test)]
#[path = "tests/fft.rs"]
mod fft_tests;
