//! speedtest.net client and measurement engine.

pub mod cache;
pub mod client;
pub mod error;
pub mod requests;
pub mod servers;
pub mod tests;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
