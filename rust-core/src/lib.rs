//! Spectral FX - Real-Time STFT Effects Core
//!
//! Spectral freeze and spectral pitch shifting with identity phase locking,
//! both running on one shared analysis/overlap-add engine.

pub mod effects;
pub mod error;
pub mod spectrum;
pub mod stft;

pub use effects::{
    FreezeConfig, FreezePhaseMode, PitchShiftConfig, SpectralEffect, SpectralFreeze,
    SpectralPitchShifter,
};
pub use error::{Result, SpectralError};
pub use spectrum::WindowType;
pub use stft::StftConfig;
