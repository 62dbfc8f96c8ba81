pub mod display_mode;
pub mod errors;
pub mod geo;
pub mod measurements;
pub mod progress;
pub mod results;
pub mod speedtest;
