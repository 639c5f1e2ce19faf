//! Shared STFT analysis/synthesis scaffold
//!
//! Per frame: window, forward transform, phase-vocoder analysis, a
//! mode-specific [`FrameTransform`], Hermitian reconstruction, inverse
//! transform, then windowed overlap-add. After the last frame the
//! accumulated signal is divided by the accumulated squared window.
//!
//! Every buffer is sized when the engine is built. The overlap-add
//! accumulators grow only when a call is longer than any before it, which
//! [`StftEngine::prepare`] avoids for a known host block size.

use num_complex::Complex64;
use tracing::debug;

use super::config::StftConfig;
use super::scheduler::FramePlan;
use crate::error::{Result, SpectralError, TransformStage};
use crate::spectrum::analysis::{AnalysisFrame, PhaseVocoderAnalysis};
use crate::spectrum::fft::FftEngine;
use crate::spectrum::windowing::generate_window;

/// Accumulated squared-window energy below this is left unnormalized
pub const NORM_FLOOR: f64 = 1e-12;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Mode-specific step between analysis and synthesis
pub trait FrameTransform {
    /// Fill synthesis bins 0..=N/2 from one analysis observation
    fn transform_frame(&mut self, frame: &AnalysisFrame<'_>, synthesis: &mut [Complex64]);

    /// Clear per-bin state without reallocating
    fn reset(&mut self);
}

/// STFT engine owning window, transform plan and all work buffers
pub struct StftEngine {
    config: StftConfig,
    fft: FftEngine,
    window: Vec<f64>,
    analysis: PhaseVocoderAnalysis,

    analysis_spectrum: Vec<Complex64>,
    synthesis_spectrum: Vec<Complex64>,
    time_frame: Vec<Complex64>,

    /// Overlap-add accumulators for the current call
    wet: Vec<f64>,
    norm: Vec<f64>,
    /// Largest block length passed to `prepare`, carried across rebuilds
    max_block_len: usize,
}

impl StftEngine {
    /// Build engine state for a validated configuration
    pub fn new(config: StftConfig) -> Result<Self> {
        config.validate()?;

        let n = config.frame_size;
        let fft = FftEngine::new(n)?;
        let window = generate_window(config.window_type, n, true);

        debug!(
            frame_size = n,
            hop_size = config.hop_size,
            window = %config.window_type,
            "built STFT state"
        );

        Ok(Self {
            fft,
            window,
            analysis: PhaseVocoderAnalysis::new(n),
            analysis_spectrum: vec![ZERO; n],
            synthesis_spectrum: vec![ZERO; n],
            time_frame: vec![ZERO; n],
            wet: Vec::new(),
            norm: Vec::new(),
            max_block_len: 0,
            config,
        })
    }

    /// Apply a new configuration
    ///
    /// Frame size or window changes rebuild every array; hop and sample rate
    /// changes keep them. On error the engine is unchanged.
    pub fn rebuild(&mut self, config: StftConfig) -> Result<()> {
        config.validate()?;

        if self.config.changes_shape(&config) {
            let mut rebuilt = StftEngine::new(config)?;
            rebuilt.prepare(self.max_block_len);
            *self = rebuilt;
        } else {
            self.config = config;
            self.prepare(self.max_block_len);
        }
        Ok(())
    }

    /// Pre-size the overlap-add accumulators for inputs up to `max_block_len`
    pub fn prepare(&mut self, max_block_len: usize) {
        self.max_block_len = max_block_len;
        let plan = FramePlan::new(max_block_len, self.config.hop_size, self.config.frame_size);
        let needed = plan.buffer_len();
        self.wet.reserve(needed.saturating_sub(self.wet.len()));
        self.norm.reserve(needed.saturating_sub(self.norm.len()));
    }

    /// Clear analysis phase history
    pub fn reset(&mut self) {
        self.analysis.reset();
    }

    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    pub fn num_bins(&self) -> usize {
        self.config.num_bins()
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Run analysis, `transform` and overlap-add over `input`
    ///
    /// Frames reaching past the end of `input` are zero-padded. The result
    /// stays in the accumulators until [`write_wet`](Self::write_wet) or
    /// [`write_mixed`](Self::write_mixed) is called. A transform failure
    /// aborts the call with phase state partially advanced.
    pub fn overlap_add<T: FrameTransform>(&mut self, transform: &mut T, input: &[f64]) -> Result<()> {
        let n = self.config.frame_size;
        let half = n / 2;
        let hop = self.config.hop_size as f64;
        let plan = FramePlan::new(input.len(), self.config.hop_size, n);

        self.wet.clear();
        self.wet.resize(plan.buffer_len(), 0.0);
        self.norm.clear();
        self.norm.resize(plan.buffer_len(), 0.0);

        for pos in plan.frame_starts() {
            for (i, (bin, &w)) in self.analysis_spectrum.iter_mut().zip(&self.window).enumerate() {
                let x = input.get(pos + i).copied().unwrap_or(0.0);
                *bin = Complex64::new(x * w, 0.0);
            }

            self.fft
                .forward(&mut self.analysis_spectrum)
                .map_err(|e| SpectralError::during(TransformStage::Forward, e))?;

            let frame = self.analysis.analyze(&self.analysis_spectrum[..=half], hop);
            transform.transform_frame(&frame, &mut self.synthesis_spectrum[..=half]);
            enforce_hermitian(&mut self.synthesis_spectrum);

            self.fft
                .inverse_into(&self.synthesis_spectrum, &mut self.time_frame)
                .map_err(|e| SpectralError::during(TransformStage::Inverse, e))?;

            let wet = &mut self.wet[pos..pos + n];
            let norm = &mut self.norm[pos..pos + n];
            for i in 0..n {
                let w = self.window[i];
                wet[i] += self.time_frame[i].re * w;
                norm[i] += w * w;
            }
        }

        Ok(())
    }

    /// Normalized overlap-add output at `i`
    #[inline]
    fn normalized(&self, i: usize) -> f64 {
        match (self.wet.get(i), self.norm.get(i)) {
            (Some(&wet), Some(&norm)) if norm > NORM_FLOOR => wet / norm,
            (Some(&wet), _) => wet,
            _ => 0.0,
        }
    }

    /// Write the normalized wet signal, fitted to `out.len()`
    pub fn write_wet(&self, out: &mut [f64]) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.normalized(i);
        }
    }

    /// Blend in place: `out` holds the dry signal on entry and
    /// `dry*(1-mix) + wet*mix` on return
    pub fn write_mixed(&self, out: &mut [f64], mix: f64) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = *sample * (1.0 - mix) + self.normalized(i) * mix;
        }
    }

    #[cfg(test)]
    pub(crate) fn replace_fft(&mut self, fft: FftEngine) {
        self.fft = fft;
    }
}

/// Make bins 0 and N/2 real and mirror bins 1..N/2 as conjugates into
/// N/2+1..N so the inverse transform is real-valued
pub fn enforce_hermitian(spectrum: &mut [Complex64]) {
    let n = spectrum.len();
    let half = n / 2;

    spectrum[0].im = 0.0;
    spectrum[half].im = 0.0;
    for k in 1..half {
        spectrum[n - k] = spectrum[k].conj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::windowing::WindowType;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    /// Resynthesizes each frame unchanged
    struct Passthrough {
        frames: usize,
    }

    impl FrameTransform for Passthrough {
        fn transform_frame(&mut self, frame: &AnalysisFrame<'_>, synthesis: &mut [Complex64]) {
            for (k, bin) in synthesis.iter_mut().enumerate() {
                *bin = Complex64::from_polar(frame.magnitudes[k], frame.phases[k]);
            }
            self.frames += 1;
        }

        fn reset(&mut self) {
            self.frames = 0;
        }
    }

    fn small_config() -> StftConfig {
        StftConfig {
            frame_size: 256,
            hop_size: 64,
            ..StftConfig::default()
        }
    }

    #[test]
    fn test_hermitian_symmetry() {
        let mut spectrum: Vec<Complex64> = (0..16)
            .map(|k| Complex64::new(k as f64, 1.0 + k as f64))
            .collect();
        enforce_hermitian(&mut spectrum);

        assert_eq!(spectrum[0].im, 0.0);
        assert_eq!(spectrum[8].im, 0.0);
        for k in 1..8 {
            assert_eq!(spectrum[16 - k], spectrum[k].conj());
        }
    }

    #[test]
    fn test_passthrough_reconstructs_input() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        let mut transform = Passthrough { frames: 0 };

        let input: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * 440.0 * i as f64 / 48000.0).sin() + 0.1 * (i as f64 * 0.01).cos())
            .collect();

        engine.overlap_add(&mut transform, &input).unwrap();
        assert_eq!(transform.frames, FramePlan::new(1000, 64, 256).frame_count());

        let mut out = vec![0.0; input.len()];
        engine.write_wet(&mut out);

        // First sample sits under a zero window coefficient; skip it
        for i in 1..input.len() {
            assert_abs_diff_eq!(out[i], input[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_mixed_output_blends_dry() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        let mut transform = Passthrough { frames: 0 };
        let input = vec![0.5; 512];

        engine.overlap_add(&mut transform, &input).unwrap();

        let mut out = input.clone();
        engine.write_mixed(&mut out, 0.0);
        assert_eq!(out, input);
    }

    #[test]
    fn test_rebuild_on_shape_change() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        assert_eq!(engine.num_bins(), 129);

        engine
            .rebuild(StftConfig { frame_size: 512, ..small_config() })
            .unwrap();
        assert_eq!(engine.num_bins(), 257);
        assert_eq!(engine.window().len(), 512);

        engine
            .rebuild(StftConfig { frame_size: 512, window_type: WindowType::Hamming, ..small_config() })
            .unwrap();
        assert!(engine.window()[0] > 0.07);
    }

    #[test]
    fn test_failed_rebuild_keeps_state() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        let bad = StftConfig { frame_size: 100, ..small_config() };

        assert!(engine.rebuild(bad).is_err());
        assert_eq!(engine.config(), &small_config());
        assert_eq!(engine.window().len(), 256);
    }

    #[test]
    fn test_prepare_avoids_growth() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        engine.prepare(4096);
        let capacity = engine.wet.capacity();

        let mut transform = Passthrough { frames: 0 };
        engine.overlap_add(&mut transform, &vec![0.0; 4096]).unwrap();
        assert_eq!(engine.wet.capacity(), capacity);
    }

    #[test]
    fn test_rebuild_keeps_prepared_block_len() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        engine.prepare(4096);

        engine
            .rebuild(StftConfig { frame_size: 1024, hop_size: 256, ..small_config() })
            .unwrap();
        assert_eq!(engine.max_block_len, 4096);

        let capacity = engine.wet.capacity();
        assert!(capacity >= FramePlan::new(4096, 256, 1024).buffer_len());

        let mut transform = Passthrough { frames: 0 };
        engine.overlap_add(&mut transform, &vec![0.1; 4096]).unwrap();
        assert_eq!(engine.wet.capacity(), capacity);
    }

    #[test]
    fn test_transform_failure_is_reported_with_stage() {
        let mut engine = StftEngine::new(small_config()).unwrap();
        engine.replace_fft(FftEngine::new(128).unwrap());

        let mut transform = Passthrough { frames: 0 };
        let err = engine.overlap_add(&mut transform, &[0.5; 300]).unwrap_err();
        assert!(err.is_transform_failure());
        assert!(matches!(err, SpectralError::Transform { stage: TransformStage::Forward, .. }));
        assert_eq!(transform.frames, 0);
    }
}
