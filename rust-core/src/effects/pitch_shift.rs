//! Spectral pitch shifting by bin remapping with identity phase locking
//!
//! Each synthesis bin k reads its magnitude and instantaneous frequency from
//! source position k/ratio, interpolated between the two nearest analysis
//! bins, and the frequency is scaled by the ratio. Bins near a spectral peak
//! keep their analysis phase offset to that peak (Laroche & Dolson identity
//! phase locking); everything else advances by its own shifted frequency.

use num_complex::Complex64;
use tracing::warn;

use crate::error::{Result, SpectralError};
use crate::spectrum::analysis::AnalysisFrame;
use crate::spectrum::windowing::WindowType;
use crate::stft::config::{validate_frame_size, validate_hop_size, validate_sample_rate, StftConfig};
use crate::stft::engine::{FrameTransform, StftEngine};

pub const MIN_PITCH_RATIO: f64 = 0.25;
pub const MAX_PITCH_RATIO: f64 = 4.0;

/// Ratios this close to 1 return the input untouched
pub const IDENTITY_RATIO_EPSILON: f64 = 1e-9;

/// Max distance in bins from a peak for a bin to be phase-locked to it.
/// Empirical; tune per material.
pub const PHASE_LOCK_RADIUS: usize = 4;

/// Shifted magnitudes at or below this fall back to plain phase advance
pub const PHASE_LOCK_MAGNITUDE_FLOOR: f64 = 1e-9;

/// Spectral pitch shifter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PitchShiftConfig {
    pub stft: StftConfig,
    /// Frequency ratio in [0.25, 4]
    pub ratio: f64,
}

impl Default for PitchShiftConfig {
    fn default() -> Self {
        Self {
            stft: StftConfig::default(),
            ratio: 1.0,
        }
    }
}

impl PitchShiftConfig {
    pub fn validate(&self) -> Result<()> {
        self.stft.validate()?;
        validate_ratio(self.ratio)
    }
}

fn validate_ratio(ratio: f64) -> Result<()> {
    if !(MIN_PITCH_RATIO..=MAX_PITCH_RATIO).contains(&ratio) {
        return Err(SpectralError::InvalidPitchRatio {
            ratio,
            min: MIN_PITCH_RATIO,
            max: MAX_PITCH_RATIO,
        });
    }
    Ok(())
}

/// Bin-remapping frame transform
pub struct PitchShiftTransform {
    ratio: f64,

    /// Accumulated synthesis phase per bin
    sum_phase: Vec<f64>,
    shifted_mag: Vec<f64>,
    shifted_freq: Vec<f64>,
    /// Capacity = bin count, so pushing never reallocates
    peak_bins: Vec<usize>,
}

impl PitchShiftTransform {
    pub fn new(num_bins: usize, ratio: f64) -> Self {
        Self {
            ratio,
            sum_phase: vec![0.0; num_bins],
            shifted_mag: vec![0.0; num_bins],
            shifted_freq: vec![0.0; num_bins],
            peak_bins: Vec::with_capacity(num_bins),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio;
    }

    /// Shifted magnitudes of the last transformed frame
    pub fn shifted_magnitudes(&self) -> &[f64] {
        &self.shifted_mag
    }

    /// Shifted instantaneous frequencies of the last transformed frame
    pub fn shifted_frequencies(&self) -> &[f64] {
        &self.shifted_freq
    }

    /// Peak bins detected in the last transformed frame
    pub fn peak_bins(&self) -> &[usize] {
        &self.peak_bins
    }

    fn remap_bins(&mut self, frame: &AnalysisFrame<'_>) {
        let half = frame.num_bins() - 1;

        for k in 0..=half {
            let src = k as f64 / self.ratio;
            if src >= half as f64 {
                self.shifted_mag[k] = 0.0;
                self.shifted_freq[k] = frame.omega[k];
                continue;
            }

            let lo = src as usize;
            let hi = (lo + 1).min(half);
            let frac = src - lo as f64;

            self.shifted_mag[k] = frame.magnitudes[lo] * (1.0 - frac) + frame.magnitudes[hi] * frac;
            let freq = frame.inst_freqs[lo] * (1.0 - frac) + frame.inst_freqs[hi] * frac;
            self.shifted_freq[k] = freq * self.ratio;
        }
    }

    fn find_peaks(&mut self) {
        let mag = &self.shifted_mag;
        let half = mag.len() - 1;

        self.peak_bins.clear();
        for k in 1..half.saturating_sub(1) {
            if mag[k] >= mag[k - 1] && mag[k] > mag[k + 1] {
                self.peak_bins.push(k);
            }
        }
    }

    fn advance_phases(&mut self, hop: f64, phases: &[f64]) {
        if self.peak_bins.is_empty() {
            for (phase, &freq) in self.sum_phase.iter_mut().zip(&self.shifted_freq) {
                *phase += freq * hop;
            }
            return;
        }

        for &peak in &self.peak_bins {
            self.sum_phase[peak] += self.shifted_freq[peak] * hop;
        }

        let mut nearest = 0;
        for k in 0..self.sum_phase.len() {
            while nearest + 1 < self.peak_bins.len()
                && self.peak_bins[nearest + 1].abs_diff(k) < self.peak_bins[nearest].abs_diff(k)
            {
                nearest += 1;
            }

            let peak = self.peak_bins[nearest];
            if k == peak {
                continue;
            }

            if peak.abs_diff(k) <= PHASE_LOCK_RADIUS && self.shifted_mag[k] > PHASE_LOCK_MAGNITUDE_FLOOR {
                let offset = interp_phase(phases, k as f64 / self.ratio)
                    - interp_phase(phases, peak as f64 / self.ratio);
                self.sum_phase[k] = self.sum_phase[peak] + offset;
            } else {
                self.sum_phase[k] += self.shifted_freq[k] * hop;
            }
        }
    }
}

/// Phase at fractional bin `pos`, interpolated on the unit circle so that
/// neighbours on either side of the ±π cut blend smoothly
fn interp_phase(phases: &[f64], pos: f64) -> f64 {
    let last = phases.len() - 1;
    let lo = (pos as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = (pos - lo as f64).clamp(0.0, 1.0);

    let z = Complex64::from_polar(1.0 - frac, phases[lo]) + Complex64::from_polar(frac, phases[hi]);
    z.arg()
}

impl FrameTransform for PitchShiftTransform {
    fn transform_frame(&mut self, frame: &AnalysisFrame<'_>, synthesis: &mut [Complex64]) {
        self.remap_bins(frame);
        self.find_peaks();
        self.advance_phases(frame.hop, frame.phases);

        for (k, bin) in synthesis.iter_mut().enumerate() {
            *bin = Complex64::from_polar(self.shifted_mag[k], self.sum_phase[k]);
        }
    }

    fn reset(&mut self) {
        self.sum_phase.fill(0.0);
        self.shifted_mag.fill(0.0);
        self.shifted_freq.fill(0.0);
        self.peak_bins.clear();
    }
}

/// Mono frequency-domain pitch shifter
///
/// Output length always equals input length. Not thread-safe; use one
/// instance per stream.
pub struct SpectralPitchShifter {
    engine: StftEngine,
    transform: PitchShiftTransform,
}

impl SpectralPitchShifter {
    /// Create a pitch shifter with default settings (ratio 1)
    pub fn new(sample_rate: f64) -> Result<Self> {
        Self::with_config(PitchShiftConfig {
            stft: StftConfig::with_sample_rate(sample_rate),
            ..PitchShiftConfig::default()
        })
    }

    pub fn with_config(config: PitchShiftConfig) -> Result<Self> {
        config.validate()?;
        let engine = StftEngine::new(config.stft)?;
        let transform = PitchShiftTransform::new(engine.num_bins(), config.ratio);

        Ok(Self { engine, transform })
    }

    pub fn config(&self) -> PitchShiftConfig {
        PitchShiftConfig {
            stft: self.engine.config().clone(),
            ratio: self.transform.ratio(),
        }
    }

    /// Replace the whole configuration; on error nothing changes
    pub fn set_config(&mut self, config: PitchShiftConfig) -> Result<()> {
        config.validate()?;
        self.apply_stft(config.stft)?;
        self.transform.set_ratio(config.ratio);
        Ok(())
    }

    fn apply_stft(&mut self, stft: StftConfig) -> Result<()> {
        let rebuild = self.engine.config().changes_shape(&stft);
        self.engine.rebuild(stft)?;
        if rebuild {
            self.transform = PitchShiftTransform::new(self.engine.num_bins(), self.transform.ratio());
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

    /// Output hop; bin remapping keeps duration, so this equals the analysis hop
    pub fn synthesis_hop(&self) -> usize {
        self.hop_size()
    }

    pub fn window_type(&self) -> WindowType {
        self.engine.config().window_type
    }

    pub fn num_bins(&self) -> usize {
        self.engine.num_bins()
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.transform.ratio()
    }

    pub fn pitch_semitones(&self) -> f64 {
        12.0 * self.pitch_ratio().log2()
    }

    /// Ratio actually realized; bin remapping applies the requested ratio exactly
    pub fn effective_pitch_ratio(&self) -> f64 {
        self.pitch_ratio()
    }

    /// Shifted magnitudes of the last processed frame
    pub fn shifted_magnitudes(&self) -> &[f64] {
        self.transform.shifted_magnitudes()
    }

    /// Phase-locking peaks of the last processed frame
    pub fn peak_bins(&self) -> &[usize] {
        self.transform.peak_bins()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<()> {
        validate_sample_rate(sample_rate)?;
        let stft = StftConfig {
            sample_rate,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    /// Set the pitch ratio in [0.25, 4]
    pub fn set_pitch_ratio(&mut self, ratio: f64) -> Result<()> {
        validate_ratio(ratio)?;
        self.transform.set_ratio(ratio);
        Ok(())
    }

    /// Set the pitch shift in semitones (ratio = 2^(st/12))
    pub fn set_pitch_semitones(&mut self, semitones: f64) -> Result<()> {
        if !semitones.is_finite() {
            return Err(SpectralError::InvalidSemitones(semitones));
        }
        self.set_pitch_ratio(2f64.powf(semitones / 12.0))
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

    pub fn set_hop_size(&mut self, hop_size: usize) -> Result<()> {
        validate_hop_size(hop_size, self.frame_size())?;
        let stft = StftConfig {
            hop_size,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    pub fn set_window_type(&mut self, window_type: WindowType) -> Result<()> {
        let stft = StftConfig {
            window_type,
            ..self.engine.config().clone()
        };
        self.apply_stft(stft)
    }

    pub fn prepare(&mut self, max_block_len: usize) {
        self.engine.prepare(max_block_len);
    }

    /// Clear analysis and synthesis phase state
    pub fn reset(&mut self) {
        self.transform.reset();
        self.engine.reset();
    }

    fn is_identity(&self) -> bool {
        (self.pitch_ratio() - 1.0).abs() <= IDENTITY_RATIO_EPSILON
    }

    /// Process `buf` in place, reporting transform failures
    ///
    /// Every call frames `buf` from sample 0, so analysis and synthesis
    /// phase start fresh and equal blocks give equal output. On error `buf`
    /// is left untouched.
    pub fn try_process_in_place(&mut self, buf: &mut [f64]) -> Result<()> {
        if buf.is_empty() || self.is_identity() {
            return Ok(());
        }

        self.reset();
        self.engine.overlap_add(&mut self.transform, buf)?;
        self.engine.write_wet(buf);
        Ok(())
    }

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
            warn!(error = %e, "spectral pitch shift failed, passing input through");
        }
    }
}
