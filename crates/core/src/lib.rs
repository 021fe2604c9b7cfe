//! Core domain types, markdown slide grammar, and error taxonomy
//! for slide deck compilation.

pub mod error;
pub mod markdown;
pub mod types;

pub use error::{Error, Result};
pub use types::{LayoutRole, SlidePlan, SlideRecord, Typography};
