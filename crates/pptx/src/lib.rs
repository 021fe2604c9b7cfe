//! PPTX (Office Open XML) backend for slide deck compilation.
//!
//! Assembles a parsed [`deck_core::SlidePlan`] into a `.pptx` package,
//! either from the embedded blank scaffold or grafted onto a user-supplied
//! template whose layouts and masters are reused.

pub mod assembler;
pub mod layout;
pub mod package;
mod scaffold;
pub mod writer;
mod xmlutil;

pub use assembler::DeckAssembler;
pub use layout::LayoutInfo;
pub use package::BasePackage;
pub use writer::{RenderedDeck, PPTX_MIME_TYPE};
