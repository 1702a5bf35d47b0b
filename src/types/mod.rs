//! Core types for stepstream.

pub mod content;
pub mod event;
pub mod step;

pub use content::*;
pub use event::*;
pub use step::*;
