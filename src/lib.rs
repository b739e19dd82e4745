#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod directory;
pub mod gallery;
pub mod photos;
pub mod portal;
pub mod roster;
pub mod selection;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::open;
pub use portal::Portal;
