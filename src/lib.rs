//! Input/output plumbing around the C3D feature extractor: dense window
//! lists for the extractor to consume, and per-video packing of the blobs it
//! writes back.

pub mod annotations;
pub mod blob;
pub mod check;
pub mod container;
pub mod error;
pub mod lists;
pub mod manifest;
pub mod naming;
pub mod packer;
pub mod progress;
pub mod sampling;

pub use error::{KitError, PackWarning};
