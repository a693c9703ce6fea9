//! `tedana-gear` - platform gear wrapping the tedana denoising workflow
//!
//! This library provides the pieces of a single gear run: parsing the
//! platform invocation, discovering multi-echo inputs by their filename
//! conventions, building and executing the external tedana command, and
//! post-processing its HTML reports into portable, platform-displayable
//! files.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod bids;
pub mod cli;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use config::{AppConfig, OutputLayout};
pub use context::{GearContext, InputKind};
pub use error::{Error, Result};
pub use logging::init_logging;
