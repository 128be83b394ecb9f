//! Match Pilot — rule-driven candidate approval loop.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
