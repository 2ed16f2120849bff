#![allow(clippy::uninlined_format_args)]

pub mod apod;
pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod dates;
pub mod gallery;
pub mod logging;
pub mod modal;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
