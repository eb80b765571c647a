//! Foundation types shared by every layer.
//!
//! The graph side of the bridge separates qualified-name segments with `::`
//! while Modelica source text separates them with `.`. The two never mix
//! inside one string; every crossing of that boundary goes through
//! [`QualifiedName`] so the translation is explicit.

mod name;

pub use name::{GRAPH_SEPARATOR, QualifiedName, SOURCE_SEPARATOR};
