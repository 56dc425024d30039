use super::*;
use crate::config::MotionConfig;

fn test_config() -> MotionConfig {
    MotionConfig {
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

#[test]
fn fewer_than_n_fft_samples_yields_zero() {
    let cfg = test_config();
    let mut analyzer = FftAnalyzer::new(&cfg);
    for i in 0..10 {
        analyzer.push(i as f64);
    }
    assert_eq!(analyzer.dominant_frequency(), 0.0);
}

#[test]
fn detects_a_known_sine_frequency() {
    let cfg = test_config();
    let mut analyzer = FftAnalyzer::new(&cfg);
    let dt = cfg.dt();
    let target_hz = 5.0;
    for i in 0..cfg.fft_points {
        let t = i as f64 * dt;
        analyzer.push((2.0 * std::f64::consts::PI * target_hz * t).sin());
    }
    let freq = analyzer.dominant_frequency();
    let bin_width = 1.0 / (cfg.fft_points as f64 * dt);
    assert!(
        (freq - target_hz).abs() <= bin_width,
        "expected ~{target_hz} Hz, got {freq} Hz (bin width {bin_width})"
    );
}
