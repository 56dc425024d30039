//! Optional per-axis front-end filter.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub enum FrontEndFilter {
    /// Pass the sample through unchanged.
    None,
    MovingAverage { window: VecDeque<f64>, size: usize },
    /// `y[n] = alpha*x[n] + (1-alpha)*y[n-1]`, `y[0] = x[0]`.
    LowPass { alpha: f64, last: Option<f64> },
}

impl FrontEndFilter {
    pub fn moving_average(size: usize) -> Self {
        FrontEndFilter::MovingAverage {
            window: VecDeque::with_capacity(size),
            size,
        }
    }

    pub fn low_pass(alpha: f64) -> Self {
        FrontEndFilter::LowPass { alpha, last: None }
    }

    pub fn apply(&mut self, x: f64) -> f64 {
        match self {
            FrontEndFilter::None => x,
            FrontEndFilter::MovingAverage { window, size } => {
                window.push_back(x);
                if window.len() > *size {
                    window.pop_front();
                }
                window.iter().sum::<f64>() / window.len() as f64
            }
            FrontEndFilter::LowPass { alpha, last } => {
                let y = match last {
                    Some(prev) => *alpha * x + (1.0 - *alpha) * *prev,
                    None => x,
                };
                *last = Some(y);
                y
            }
        }
    }

    pub fn reset(&mut self) {
        match self {
            FrontEndFilter::None => {}
            FrontEndFilter::MovingAverage { window, .. } => window.clear(),
            FrontEndFilter::LowPass { last, .. } => *last = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_pass_seeds_from_first_sample() {
        let mut f = FrontEndFilter::low_pass(0.5);
        assert_eq!(f.apply(4.0), 4.0);
        assert_eq!(f.apply(8.0), 6.0);
    }

    #[test]
    fn moving_average_over_window() {
        let mut f = FrontEndFilter::moving_average(3);
        f.apply(1.0);
        f.apply(2.0);
        assert_eq!(f.apply(3.0), 2.0);
        assert_eq!(f.apply(6.0), (2.0 + 3.0 + 6.0) / 3.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut f = FrontEndFilter::low_pass(0.5);
        f.apply(10.0);
        f.reset();
        assert_eq!(f.apply(4.0), 4.0);
    }
}
