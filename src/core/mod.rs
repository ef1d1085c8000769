pub mod dsp;
pub mod engine;
pub mod features;
