//! The motion-analysis core: per-axis front-end filtering, RLS double
//! integration, and FFT dominant-frequency extraction, composed by
//! [`processor::MotionProcessor`].

pub mod fft;
pub mod filter;
pub mod processor;
pub mod rls;
