//! CLI module for the mstone application
mod app;
mod args;

pub use app::*;
pub use args::*;
