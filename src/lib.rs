//! SodaCert - live monitor for suspicious newly issued TLS certificates
//!
//! This library subscribes to a certificate-transparency event stream,
//! matches each certificate's common name against a keyword list, keeps the
//! matching domains in memory and appends them to a flat output file, while
//! an interactive prompt renders what has been found so far.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod internal_metrics;
pub mod listener;
pub mod matching;
pub mod network;
pub mod persistence;
pub mod store;
pub mod task_manager;
pub mod terminal;
pub mod utils;
pub mod viewer;

// Re-export core types for convenience
pub use core::*;
