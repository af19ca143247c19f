//! `macro-charts` library crate.
//!
//! The binary (`mc`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes or hitting the network
//! - chart recipes and providers are reusable outside the CLI

pub mod app;
pub mod catalog;
pub mod chart;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod report;
pub mod transform;
