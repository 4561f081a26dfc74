pub mod classifier;
pub mod outcome;
