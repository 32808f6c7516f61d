//! hostprep - provision a bare Ubuntu host into a GPU-capable Docker server
//!
//! This library provides the staged provisioning pipeline behind the
//! `hostprep` binary, including:
//! - Confirmation gates and operator console output
//! - Host effects (external commands, file writes) behind the `Host` trait
//! - Pipeline state shared between stages, written once per flag
//! - Stages for system update, storage, GPU drivers, Docker, the NVIDIA
//!   container toolkit, CasaOS, optional tools and the final summary
//! - Derived artifacts: mount-table entries, Docker daemon config, apt sources
//!
//! # Example
//!
//! ```no_run
//! use hostprep::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod pipeline;
