//! Replacement artwork: loading sources, normalizing them and encoding the
//! files the client expects.

pub mod builder;
mod error;
pub mod normalize;
pub mod source;
#[cfg(feature = "svg")]
pub mod svg;
pub mod targets;

pub use builder::{build, IconSet, NormalizedIcon};
pub use error::IconError;
pub use normalize::{Normalizer, VectorRenderer};
pub use source::{ImageData, Provenance, SourceImage, SourceSet};
pub use targets::{Encoding, IconRequirement, Role, TargetTable};
