//! Short-time Fourier transform framing and overlap-add

pub mod config;
pub mod engine;
pub mod scheduler;

pub use config::StftConfig;
pub use engine::{FrameTransform, StftEngine};
pub use scheduler::FramePlan;
