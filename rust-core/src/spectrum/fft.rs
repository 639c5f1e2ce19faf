//! FFT engine using rustfft for fixed-size complex transforms
//!
//! Plans and scratch space are created once; forward and inverse calls never
//! allocate.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{Result, SpectralError};

/// Complex FFT engine for a fixed power-of-two size
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,

    /// Shared scratch for both directions
    scratch: Vec<Complex64>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size, must be a power of two >= 2
    pub fn new(fft_size: usize) -> Result<Self> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(SpectralError::UnsupportedTransformSize(fft_size));
        }

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Ok(Self {
            fft_size,
            forward,
            inverse,
            scratch: vec![Complex64::new(0.0, 0.0); scratch_len],
        })
    }

    /// Forward transform in place (unnormalized)
    pub fn forward(&mut self, buffer: &mut [Complex64]) -> Result<()> {
        self.check_len(buffer.len())?;
        self.forward.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }

    /// Inverse transform in place, scaled by 1/N so that
    /// `inverse(forward(x)) == x`
    pub fn inverse(&mut self, buffer: &mut [Complex64]) -> Result<()> {
        self.check_len(buffer.len())?;
        self.inverse.process_with_scratch(buffer, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
        Ok(())
    }

    /// Inverse transform of `src` written to `dst`, leaving `src` untouched
    pub fn inverse_into(&mut self, src: &[Complex64], dst: &mut [Complex64]) -> Result<()> {
        self.check_len(src.len())?;
        self.check_len(dst.len())?;
        dst.copy_from_slice(src);
        self.inverse(dst)
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.fft_size {
            return Err(SpectralError::TransformLength {
                expected: self.fft_size,
                actual,
            });
        }
        Ok(())
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of non-negative frequency bins (fft_size/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Bin center angular frequency ω(k) = 2πk/N in rad/sample
    pub fn bin_angular_frequency(&self, bin: usize) -> f64 {
        2.0 * PI * bin as f64 / self.fft_size as f64
    }

    /// Bin center frequency in Hz
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rejects_unsupported_size() {
        assert_eq!(
            FftEngine::new(1000).err(),
            Some(SpectralError::UnsupportedTransformSize(1000))
        );
        assert!(FftEngine::new(0).is_err());
        assert!(FftEngine::new(1).is_err());
        assert!(FftEngine::new(64).is_ok());
    }

    #[test]
    fn test_fft_dc_signal() {
        let mut fft = FftEngine::new(1024).unwrap();
        let mut buffer = vec![Complex64::new(0.0, 0.0); 1024];
        for c in buffer.iter_mut().take(100) {
            c.re = 1.0;
        }

        fft.forward(&mut buffer).unwrap();

        assert_abs_diff_eq!(buffer[0].re, 100.0, epsilon = 1e-9);
        assert!(buffer[512].norm() < 1.0);
    }

    #[test]
    fn test_fft_sine_peak_bin() {
        let n = 1024;
        let mut fft = FftEngine::new(n).unwrap();

        // Exactly on bin 51
        let mut buffer: Vec<Complex64> = (0..n)
            .map(|i| Complex64::new((fft.bin_angular_frequency(51) * i as f64).sin(), 0.0))
            .collect();
        fft.forward(&mut buffer).unwrap();

        let (peak_bin, _) = buffer[..fft.num_bins()]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().partial_cmp(&b.norm()).unwrap())
            .unwrap();
        assert_eq!(peak_bin, 51);
        assert_abs_diff_eq!(buffer[51].norm(), n as f64 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut fft = FftEngine::new(256).unwrap();
        let original: Vec<Complex64> = (0..256)
            .map(|i| Complex64::new((i as f64 * 0.37).sin(), 0.0))
            .collect();

        let mut spectrum = original.clone();
        fft.forward(&mut spectrum).unwrap();

        let mut restored = vec![Complex64::new(0.0, 0.0); 256];
        fft.inverse_into(&spectrum, &mut restored).unwrap();

        for (a, b) in original.iter().zip(restored.iter()) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(b.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_length_mismatch_is_reported() {
        let mut fft = FftEngine::new(128).unwrap();
        let mut short = vec![Complex64::new(0.0, 0.0); 64];
        assert_eq!(
            fft.forward(&mut short),
            Err(SpectralError::TransformLength { expected: 128, actual: 64 })
        );
        assert!(fft.inverse(&mut short).unwrap_err().is_transform_failure());
    }

    #[test]
    fn test_frequency_axis() {
        let fft = FftEngine::new(1024).unwrap();
        assert_eq!(fft.num_bins(), 513);
        assert_eq!(fft.bin_to_hz(0, 48000.0), 0.0);
        assert_abs_diff_eq!(fft.bin_to_hz(512, 48000.0), 24000.0);
        assert_abs_diff_eq!(fft.bin_angular_frequency(512), PI);
    }
}
