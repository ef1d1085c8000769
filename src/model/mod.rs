pub mod bundle;
pub mod classifier;
pub mod labels;
pub mod model_manager;
pub mod scaler;
