pub mod locator;
pub mod record;
