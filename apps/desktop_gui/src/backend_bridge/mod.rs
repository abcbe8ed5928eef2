//! Bridge between the GUI thread and the async analysis worker.

pub mod commands;
pub mod runtime;
