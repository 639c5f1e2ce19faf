//! STFT configuration shared by every spectral processor

use crate::error::{Result, SpectralError};
use crate::spectrum::windowing::WindowType;

/// Smallest accepted frame size
pub const MIN_FRAME_SIZE: usize = 64;

pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;
pub const DEFAULT_FRAME_SIZE: usize = 1024;
pub const DEFAULT_HOP_SIZE: usize = 256;

/// STFT configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StftConfig {
    /// Sample rate in Hz (metadata, must be positive and finite)
    pub sample_rate: f64,

    /// Frame size N (power of two, >= 64)
    pub frame_size: usize,

    /// Hop size H in samples, 1 <= H < N
    pub hop_size: usize,

    /// Analysis/synthesis window (generated periodic)
    pub window_type: WindowType,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            window_type: WindowType::Hann,
        }
    }
}

impl StftConfig {
    /// Default configuration at the given sample rate
    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        validate_frame_size(self.frame_size)?;
        validate_hop_size(self.hop_size, self.frame_size)
    }

    /// Number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// True when `other` needs different buffers or window coefficients
    pub(crate) fn changes_shape(&self, other: &StftConfig) -> bool {
        self.frame_size != other.frame_size || self.window_type != other.window_type
    }
}

pub fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(SpectralError::InvalidSampleRate(sample_rate));
    }
    Ok(())
}

pub fn validate_frame_size(frame_size: usize) -> Result<()> {
    if frame_size < MIN_FRAME_SIZE || !frame_size.is_power_of_two() {
        return Err(SpectralError::InvalidFrameSize {
            size: frame_size,
            min: MIN_FRAME_SIZE,
        });
    }
    Ok(())
}

pub fn validate_hop_size(hop_size: usize, frame_size: usize) -> Result<()> {
    if hop_size == 0 || hop_size >= frame_size {
        return Err(SpectralError::InvalidHopSize {
            hop: hop_size,
            frame_size,
        });
    }
    Ok(())
}
