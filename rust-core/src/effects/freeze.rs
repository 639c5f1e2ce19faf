//! Spectral freeze
//!
//! Captures one STFT frame and sustains its magnitudes for as long as the
//! freeze is engaged. Frozen phases either stay put ([`FreezePhaseMode::Hold`])
//! or rotate at each bin's center frequency ([`FreezePhaseMode::Advance`]).

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::error::{Result, SpectralError};
use crate::spectrum::analysis::AnalysisFrame;
use crate::spectrum::windowing::WindowType;
use crate::stft::config::{validate_frame_size, validate_hop_size, validate_sample_rate, StftConfig};
use crate::stft::engine::{FrameTransform, StftEngine};

/// How frozen-bin phases evolve from frame to frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreezePhaseMode {
    /// Keep each bin at its captured phase
    Hold,
    /// Advance each bin by ω(k)·H per frame
    #[default]
    Advance,
}

impl TryFrom<i32> for FreezePhaseMode {
    type Error = SpectralError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(FreezePhaseMode::Hold),
            1 => Ok(FreezePhaseMode::Advance),
            other => Err(SpectralError::InvalidPhaseMode(other)),
        }
    }
}

/// Spectral freeze configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FreezeConfig {
    pub stft: StftConfig,
    pub phase_mode: FreezePhaseMode,
    /// Wet/dry mix in [0, 1]
    pub mix: f64,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            stft: StftConfig::default(),
            phase_mode: FreezePhaseMode::Advance,
            mix: 1.0,
        }
    }
}

impl FreezeConfig {
    pub fn validate(&self) -> Result<()> {
        self.stft.validate()?;
        validate_mix(self.mix)
    }
}

fn validate_mix(mix: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&mix) {
        return Err(SpectralError::InvalidMix(mix));
    }
    Ok(())
}

/// Capture-and-sustain frame transform
pub struct FreezeTransform {
    frozen: bool,
    phase_mode: FreezePhaseMode,

    held_magnitude: Vec<f64>,
    phase_acc: Vec<f64>,
    has_frozen_frame: bool,
}

impl FreezeTransform {
    pub fn new(num_bins: usize, phase_mode: FreezePhaseMode) -> Self {
        Self {
            frozen: false,
            phase_mode,
            held_magnitude: vec![0.0; num_bins],
            phase_acc: vec![0.0; num_bins],
            has_frozen_frame: false,
        }
    }

    /// Engage or release the freeze; any transition drops the snapshot
    pub fn set_frozen(&mut self, frozen: bool) {
        if frozen != self.frozen {
            self.has_frozen_frame = false;
        }
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn has_frozen_frame(&self) -> bool {
        self.has_frozen_frame
    }

    pub fn set_phase_mode(&mut self, mode: FreezePhaseMode) {
        self.phase_mode = mode;
    }

    pub fn held_magnitude(&self) -> &[f64] {
        &self.held_magnitude
    }

    fn capture(&mut self, frame: &AnalysisFrame<'_>) {
        self.held_magnitude.copy_from_slice(frame.magnitudes);
        self.phase_acc.copy_from_slice(frame.phases);
        self.has_frozen_frame = true;
    }
}

impl FrameTransform for FreezeTransform {
    fn transform_frame(&mut self, frame: &AnalysisFrame<'_>, synthesis: &mut [Complex64]) {
        if !self.frozen {
            for (k, bin) in synthesis.iter_mut().enumerate() {
                *bin = Complex64::from_polar(frame.magnitudes[k], frame.phases[k]);
            }
            return;
        }

        // The capture frame is emitted as captured, evolution starts after it
        let just_captured = !self.has_frozen_frame;
        if just_captured {
            self.capture(frame);
        }

        let advance = self.phase_mode == FreezePhaseMode::Advance && !just_captured;
        for (k, bin) in synthesis.iter_mut().enumerate() {
            if advance {
                self.phase_acc[k] += frame.omega[k] * frame.hop;
            }
            *bin = Complex64::from_polar(self.held_magnitude[k], self.phase_acc[k]);
        }
    }

    fn reset(&mut self) {
        self.has_frozen_frame = false;
        self.phase_acc.fill(0.0);
    }
}

/// Mono spectral freeze processor
///
/// Not thread-safe; use one instance per stream.
pub struct SpectralFreeze {
    engine: StftEngine,
    transform: FreezeTransform,
    mix: f64,
}

impl SpectralFreeze {
    /// Create a freeze processor with default settings
    pub fn new(sample_rate: f64) -> Result<Self> {
        Self::with_config(FreezeConfig {
            stft: StftConfig::with_sample_rate(sample_rate),
            ..FreezeConfig::default()
        })
    }

    pub fn with_config(config: FreezeConfig) -> Result<Self> {
        config.validate()?;
        let engine = StftEngine::new(config.stft)?;
        let transform = FreezeTransform::new(engine.num_bins(), config.phase_mode);

        Ok(Self {
            engine,
            transform,
            mix: config.mix,
        })
    }

    pub fn config(&self) -> FreezeConfig {
        FreezeConfig {
            stft: self.engine.config().clone(),
            phase_mode: self.transform.phase_mode,
            mix: self.mix,
        }
    }

    /// Replace the whole configuration; on error nothing changes
    pub fn set_config(&mut self, config: FreezeConfig) -> Result<()> {
        config.validate()?;
        self.apply_stft(config.stft)?;
        self.transform.set_phase_mode(config.phase_mode);
        self.mix = config.mix;
        Ok(())
    }

    fn apply_stft(&mut self, stft: StftConfig) -> Result<()> {
        let rebuild = self.engine.config().changes_shape(&stft);
        self.engine.rebuild(stft)?;
        if rebuild {
            let frozen = self.transform.frozen;
            self.transform = FreezeTransform::new(self.engine.num_bins(), self.transform.phase_mode);
            self.transform.frozen = frozen;
        }
        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.config().sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.engine.config().frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.engine.config().hop_size
    }

    pub fn window_type(&self) -> WindowType {
        self.engine.config().window_type
    }

    pub fn num_bins(&self) -> usize {
        self.engine.num_bins()
    }

    pub fn mix(&self) -> f64 {
        self.mix
    }

    pub fn phase_mode(&self) -> FreezePhaseMode {
        self.transform.phase_mode
    }

    pub fn is_frozen(&self) -> bool {
        self.transform.is_frozen()
    }

    /// True once a frozen frame has been captured
    pub fn has_captured_frame(&self) -> bool {
        self.transform.has_frozen_frame()
    }

    /// Update sample-rate metadata
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<()> {
        validate_sample_rate(sample_rate)?;
        let stft = StftConfig {
            sample_rate,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    /// Set frame size (power of two, >= 64) and rebuild all buffers
    ///
    /// A hop that would no longer fit becomes `frame_size / 4`.
    pub fn set_frame_size(&mut self, frame_size: usize) -> Result<()> {
        validate_frame_size(frame_size)?;
        let current = self.engine.config();
        let hop_size = if current.hop_size >= frame_size {
            (frame_size / 4).max(1)
        } else {
            current.hop_size
        };
        let stft = StftConfig {
            frame_size,
            hop_size,
            ..current.clone()
        };
        self.apply_stft(stft)
    }

    /// Set hop size in [1, frame_size)
    pub fn set_hop_size(&mut self, hop_size: usize) -> Result<()> {
        validate_hop_size(hop_size, self.frame_size())?;
        let stft = StftConfig {
            hop_size,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    /// Set the STFT window and rebuild all buffers
    pub fn set_window_type(&mut self, window_type: WindowType) -> Result<()> {
        let stft = StftConfig {
            window_type,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    /// Set wet/dry mix in [0, 1]
    pub fn set_mix(&mut self, mix: f64) -> Result<()> {
        validate_mix(mix)?;
        self.mix = mix;
        Ok(())
    }

    /// Set frozen phase evolution; a change mid-freeze applies from the next frame
    pub fn set_phase_mode(&mut self, mode: FreezePhaseMode) -> Result<()> {
        self.transform.set_phase_mode(mode);
        Ok(())
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        if frozen != self.transform.is_frozen() {
            debug!(frozen, "spectral freeze toggled");
        }
        self.transform.set_frozen(frozen);
    }

    pub fn freeze(&mut self) {
        self.set_frozen(true);
    }

    pub fn unfreeze(&mut self) {
        self.set_frozen(false);
    }

    /// Pre-size internal accumulators for blocks up to `max_block_len`
    pub fn prepare(&mut self, max_block_len: usize) {
        self.engine.prepare(max_block_len);
    }

    /// Drop the captured frame and clear phase state
    pub fn reset(&mut self) {
        self.transform.reset();
        self.engine.reset();
    }

    /// Process `buf` in place, reporting transform failures
    ///
    /// On error `buf` is left untouched.
    pub fn try_process_in_place(&mut self, buf: &mut [f64]) -> Result<()> {
        if buf.is_empty() || !self.transform.is_frozen() {
            return Ok(());
        }

        self.engine.overlap_add(&mut self.transform, buf)?;
        self.engine.write_mixed(buf, self.mix);
        Ok(())
    }

    /// Process into a new buffer of the same length, reporting failures
    pub fn try_process(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let mut out = input.to_vec();
        self.try_process_in_place(&mut out)?;
        Ok(out)
    }

    /// Process into a new buffer; a transform failure yields a copy of `input`
    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        let mut out = input.to_vec();
        self.process_in_place(&mut out);
        out
    }

    /// Process in place; a transform failure leaves `buf` unmodified
    pub fn process_in_place(&mut self, buf: &mut [f64]) {
        if let Err(e) = self.try_process_in_place(buf) {
            warn!(error = %e, "spectral freeze failed, passing input through");
        }
    }
}
