pub mod handle;
pub mod safe;
