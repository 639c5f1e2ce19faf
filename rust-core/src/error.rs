//! Error taxonomy for the spectral processors
//!
//! Configuration errors are raised synchronously by constructors and setters
//! and never leave partial state behind. Transform failures come from the
//! Fourier engine and only affect the call that hit them.

use std::fmt;
use thiserror::Error;

/// Direction of a failed Fourier transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStage {
    Forward,
    Inverse,
}

impl fmt::Display for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStage::Forward => write!(f, "forward"),
            TransformStage::Inverse => write!(f, "inverse"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    #[error("sample rate must be positive and finite: {0}")]
    InvalidSampleRate(f64),

    #[error("frame size must be a power of two and >= {min}: {size}")]
    InvalidFrameSize { size: usize, min: usize },

    #[error("hop size must be in [1, {frame_size}): {hop}")]
    InvalidHopSize { hop: usize, frame_size: usize },

    #[error("mix must be in [0, 1]: {0}")]
    InvalidMix(f64),

    #[error("pitch ratio must be in [{min}, {max}]: {ratio}")]
    InvalidPitchRatio { ratio: f64, min: f64, max: f64 },

    #[error("pitch shift in semitones must be finite: {0}")]
    InvalidSemitones(f64),

    #[error("unknown freeze phase mode: {0}")]
    InvalidPhaseMode(i32),

    #[error("unknown window type: {0:?}")]
    UnknownWindow(String),

    #[error("transform size must be a power of two >= 2: {0}")]
    UnsupportedTransformSize(usize),

    #[error("transform buffer length mismatch: expected {expected}, got {actual}")]
    TransformLength { expected: usize, actual: usize },

    #[error("{stage} transform failed: {source}")]
    Transform {
        stage: TransformStage,
        #[source]
        source: Box<SpectralError>,
    },
}

impl SpectralError {
    /// Wrap an engine error with the transform direction that produced it
    pub(crate) fn during(stage: TransformStage, source: SpectralError) -> Self {
        SpectralError::Transform {
            stage,
            source: Box::new(source),
        }
    }

    /// Caller supplied an invalid parameter; correct it and retry
    pub fn is_configuration(&self) -> bool {
        !self.is_transform_failure()
    }

    /// The Fourier engine rejected a size or a call failed
    pub fn is_transform_failure(&self) -> bool {
        matches!(
            self,
            SpectralError::UnsupportedTransformSize(_)
                | SpectralError::TransformLength { .. }
                | SpectralError::Transform { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SpectralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SpectralError::InvalidMix(2.0).is_configuration());
        assert!(SpectralError::UnknownWindow("kaiser".into()).is_configuration());
        assert!(SpectralError::UnsupportedTransformSize(1000).is_transform_failure());

        let wrapped = SpectralError::during(
            TransformStage::Inverse,
            SpectralError::TransformLength { expected: 64, actual: 32 },
        );
        assert!(wrapped.is_transform_failure());
        assert!(!wrapped.is_configuration());
    }

    #[test]
    fn test_error_messages() {
        let err = SpectralError::InvalidHopSize { hop: 0, frame_size: 1024 };
        assert_eq!(err.to_string(), "hop size must be in [1, 1024): 0");

        let wrapped = SpectralError::during(
            TransformStage::Forward,
            SpectralError::TransformLength { expected: 64, actual: 32 },
        );
        assert_eq!(
            wrapped.to_string(),
            "forward transform failed: transform buffer length mismatch: expected 64, got 32"
        );
    }
}
