//! GUI-side controller: worker events and command dispatch.

pub mod events;
pub mod orchestration;
