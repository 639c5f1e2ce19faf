//! Window coefficients for STFT analysis and synthesis
//!
//! The same coefficients are applied before the forward transform and after
//! the inverse transform, so overlap-add reconstruction divides by the
//! accumulated squared window.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::SpectralError;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/D)
    #[default]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/D)
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/D) + 0.08*cos(4πn/D)
    Blackman,

    /// Rectangular window (no tapering)
    Rectangular,
}

impl WindowType {
    /// Lower-case name accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Rectangular => "rectangular",
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowType {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "rectangular" | "rect" | "boxcar" => Ok(WindowType::Rectangular),
            _ => Err(SpectralError::UnknownWindow(s.to_string())),
        }
    }
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
/// * `periodic` - Use denominator M (for STFT) instead of M-1 (symmetric)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize, periodic: bool) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    if length == 1 {
        return vec![1.0];
    }

    let denom = if periodic {
        length as f64
    } else {
        (length - 1) as f64
    };

    (0..length)
        .map(|n| {
            let angle = 2.0 * PI * n as f64 / denom;
            match window_type {
                WindowType::Hann => 0.5 - 0.5 * angle.cos(),
                WindowType::Hamming => 0.54 - 0.46 * angle.cos(),
                WindowType::Blackman => 0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos(),
                WindowType::Rectangular => 1.0,
            }
        })
        .collect()
}

/// Sum of squared coefficients
pub fn window_energy(coeffs: &[f64]) -> f64 {
    coeffs.iter().map(|&w| w * w).sum()
}
