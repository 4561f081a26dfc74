pub mod driver;
pub mod fake;
pub mod webdriver;
