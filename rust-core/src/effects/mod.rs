//! Spectral effects built on the shared STFT engine

pub mod freeze;
pub mod pitch_shift;

pub use freeze::{FreezeConfig, FreezePhaseMode, SpectralFreeze};
pub use pitch_shift::{PitchShiftConfig, SpectralPitchShifter};

use crate::error::Result;

/// Closed set of spectral effects behind one processing surface
pub enum SpectralEffect {
    Freeze(SpectralFreeze),
    PitchShift(SpectralPitchShifter),
}

impl From<SpectralFreeze> for SpectralEffect {
    fn from(freeze: SpectralFreeze) -> Self {
        SpectralEffect::Freeze(freeze)
    }
}

impl From<SpectralPitchShifter> for SpectralEffect {
    fn from(shifter: SpectralPitchShifter) -> Self {
        SpectralEffect::PitchShift(shifter)
    }
}

impl SpectralEffect {
    pub fn name(&self) -> &'static str {
        match self {
            SpectralEffect::Freeze(_) => "spectral_freeze",
            SpectralEffect::PitchShift(_) => "spectral_pitch_shift",
        }
    }

    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        match self {
            SpectralEffect::Freeze(fx) => fx.process(input),
            SpectralEffect::PitchShift(fx) => fx.process(input),
        }
    }

    pub fn try_process(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        match self {
            SpectralEffect::Freeze(fx) => fx.try_process(input),
            SpectralEffect::PitchShift(fx) => fx.try_process(input),
        }
    }

    pub fn process_in_place(&mut self, buf: &mut [f64]) {
        match self {
            SpectralEffect::Freeze(fx) => fx.process_in_place(buf),
            SpectralEffect::PitchShift(fx) => fx.process_in_place(buf),
        }
    }

    pub fn try_process_in_place(&mut self, buf: &mut [f64]) -> Result<()> {
        match self {
            SpectralEffect::Freeze(fx) => fx.try_process_in_place(buf),
            SpectralEffect::PitchShift(fx) => fx.try_process_in_place(buf),
        }
    }

    pub fn reset(&mut self) {
        match self {
            SpectralEffect::Freeze(fx) => fx.reset(),
            SpectralEffect::PitchShift(fx) => fx.reset(),
        }
    }

    pub fn prepare(&mut self, max_block_len: usize) {
        match self {
            SpectralEffect::Freeze(fx) => fx.prepare(max_block_len),
            SpectralEffect::PitchShift(fx) => fx.prepare(max_block_len),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        match self {
            SpectralEffect::Freeze(fx) => fx.sample_rate(),
            SpectralEffect::PitchShift(fx) => fx.sample_rate(),
        }
    }

    pub fn frame_size(&self) -> usize {
        match self {
            SpectralEffect::Freeze(fx) => fx.frame_size(),
            SpectralEffect::PitchShift(fx) => fx.frame_size(),
        }
    }

    pub fn hop_size(&self) -> usize {
        match self {
            SpectralEffect::Freeze(fx) => fx.hop_size(),
            SpectralEffect::PitchShift(fx) => fx.hop_size(),
        }
    }
}
