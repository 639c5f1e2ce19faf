//! Phase-vocoder analysis
//!
//! Turns each forward-transformed frame into per-bin magnitude, phase and
//! instantaneous frequency. Instantaneous frequency comes from the unwrapped
//! phase difference against the previous frame:
//!
//! ```text
//! delta   = wrap(phase - prev_phase[k] - ω(k)·H)
//! inst[k] = ω(k) + delta / H
//! ```

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Wrap an angle into (-π, π]
#[inline]
pub fn wrap_phase(x: f64) -> f64 {
    PI - (PI - x).rem_euclid(TAU)
}

/// Per-frame analysis observation handed to a frame transform
///
/// All slices have `frame_size/2 + 1` entries.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisFrame<'a> {
    /// |X[k]|
    pub magnitudes: &'a [f64],
    /// arg X[k] of this frame
    pub phases: &'a [f64],
    /// Instantaneous angular frequency in rad/sample
    pub inst_freqs: &'a [f64],
    /// Bin center angular frequency ω(k) = 2πk/N
    pub omega: &'a [f64],
    /// Hop size in samples
    pub hop: f64,
}

impl AnalysisFrame<'_> {
    /// Number of bins (N/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.magnitudes.len()
    }
}

/// Phase-vocoder analysis state shared by every transform mode
pub struct PhaseVocoderAnalysis {
    omega: Vec<f64>,
    /// Phase of the most recent frame; read as "previous" by the next one
    prev_phase: Vec<f64>,
    magnitudes: Vec<f64>,
    inst_freqs: Vec<f64>,
}

impl PhaseVocoderAnalysis {
    /// Create analysis state for a given frame size
    pub fn new(frame_size: usize) -> Self {
        let bins = frame_size / 2 + 1;
        let omega = (0..bins)
            .map(|k| TAU * k as f64 / frame_size as f64)
            .collect();

        Self {
            omega,
            prev_phase: vec![0.0; bins],
            magnitudes: vec![0.0; bins],
            inst_freqs: vec![0.0; bins],
        }
    }

    /// Analyze the non-negative half of a forward-transformed frame
    ///
    /// # Arguments
    /// * `spectrum` - Bins 0..=N/2 of the windowed frame's transform
    /// * `hop` - Hop size in samples
    pub fn analyze(&mut self, spectrum: &[Complex64], hop: f64) -> AnalysisFrame<'_> {
        debug_assert_eq!(spectrum.len(), self.omega.len());

        for (k, bin) in spectrum.iter().enumerate() {
            let magnitude = bin.re.hypot(bin.im);
            let phase = bin.im.atan2(bin.re);

            let delta = wrap_phase(phase - self.prev_phase[k] - self.omega[k] * hop);

            self.magnitudes[k] = magnitude;
            self.inst_freqs[k] = self.omega[k] + delta / hop;
            self.prev_phase[k] = phase;
        }

        AnalysisFrame {
            magnitudes: &self.magnitudes,
            phases: &self.prev_phase,
            inst_freqs: &self.inst_freqs,
            omega: &self.omega,
            hop,
        }
    }

    /// Clear phase history without reallocating
    pub fn reset(&mut self) {
        self.prev_phase.fill(0.0);
        self.magnitudes.fill(0.0);
        self.inst_freqs.fill(0.0);
    }

    pub fn num_bins(&self) -> usize {
        self.omega.len()
    }

    pub fn omega(&self) -> &[f64] {
        &self.omega
    }

    pub fn prev_phase(&self) -> &[f64] {
        &self.prev_phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::fft::FftEngine;
    use crate::spectrum::windowing::{generate_window, WindowType};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_wrap_phase_range() {
        assert_abs_diff_eq!(wrap_phase(0.0), 0.0);
        assert_abs_diff_eq!(wrap_phase(PI), PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_phase(-PI), PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_phase(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_phase(-5.0 * TAU + 0.25), 0.25, epsilon = 1e-12);

        for i in -200..200 {
            let w = wrap_phase(i as f64 * 0.173);
            assert!(w > -PI && w <= PI);
        }
    }

    #[test]
    fn test_bin_count_and_omega() {
        let analysis = PhaseVocoderAnalysis::new(1024);
        assert_eq!(analysis.num_bins(), 513);
        assert_eq!(analysis.omega()[0], 0.0);
        assert_abs_diff_eq!(analysis.omega()[512], PI, epsilon = 1e-12);
    }

    #[test]
    fn test_instantaneous_frequency_tracks_off_bin_sine() {
        let n = 1024;
        let hop = 256;
        let mut fft = FftEngine::new(n).unwrap();
        let window = generate_window(WindowType::Hann, n, true);
        let mut analysis = PhaseVocoderAnalysis::new(n);

        // 10.3 bins: between bin centers, so only phase unwrapping recovers it
        let freq = TAU * 10.3 / n as f64;
        let signal: Vec<f64> = (0..n + 2 * hop).map(|i| (freq * i as f64).cos()).collect();

        let mut spectrum = vec![Complex64::new(0.0, 0.0); n];
        let mut estimate = 0.0;
        for frame in 0..3 {
            let pos = frame * hop;
            for (i, c) in spectrum.iter_mut().enumerate() {
                *c = Complex64::new(signal[pos + i] * window[i], 0.0);
            }
            fft.forward(&mut spectrum).unwrap();
            let observed = analysis.analyze(&spectrum[..=n / 2], hop as f64);
            estimate = observed.inst_freqs[10];
        }

        assert_abs_diff_eq!(estimate, freq, epsilon = 1e-6);
    }

    #[test]
    fn test_reset_clears_phase_history() {
        let mut analysis = PhaseVocoderAnalysis::new(64);
        let spectrum = vec![Complex64::new(0.0, 1.0); 33];
        let frame = analysis.analyze(&spectrum, 16.0);
        assert_abs_diff_eq!(frame.phases[3], PI / 2.0, epsilon = 1e-15);
        assert_eq!(frame.num_bins(), 33);

        analysis.reset();
        assert!(analysis.prev_phase().iter().all(|&p| p == 0.0));
    }
}
