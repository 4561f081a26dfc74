pub mod finder;
pub mod geometry;
