//! formulactl - command-line client for formulad
//!
//! Talks to the daemon over HTTP, and runs the shared validator and pattern
//! matcher locally for the offline commands.

pub mod client;
pub mod display;

pub use client::FormuladClient;
