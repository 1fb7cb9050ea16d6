#![forbid(unsafe_code)]

pub mod chrome;
pub mod classes;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod grading;
pub mod logging;
pub mod progress;
pub mod render;
pub mod resources;
pub mod session;
pub mod sheet;
pub mod site;
