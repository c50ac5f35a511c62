//! Formula generator daemon library - exposes modules for testing.

pub mod cache;
pub mod config;
pub mod invoker;
pub mod orchestrator;
pub mod prompts;
pub mod routes;
pub mod server;
