//! UI layer for the desktop GUI: app shell and theme plumbing.

pub mod app;
pub mod theme;

pub use app::GreenVisionApp;
