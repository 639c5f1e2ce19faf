//! Window coefficients, FFT and phase-vocoder analysis

pub mod analysis;
pub mod fft;
pub mod windowing;

pub use analysis::{AnalysisFrame, PhaseVocoderAnalysis};
pub use fft::FftEngine;
pub use windowing::{generate_window, window_energy, WindowType};
