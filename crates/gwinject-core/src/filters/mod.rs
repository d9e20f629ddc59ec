//! Digital filters
//!
//! Only what waveform post-processing needs: Butterworth IIR designs and
//! zero-phase filtering of real-valued strain buffers.

pub mod iir;

pub use iir::{Biquad, IirFilter};
