//! # sysmo-base
//!
//! Core library for bidirectional translation between a SysML-style model
//! graph and Modelica text, using an external Modelica compiler service as
//! the parser oracle.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! import    → graph reconstruction from the compiler's class catalog
//! emit      → Modelica text emission from the model graph
//!   ↓
//! model     → standalone model graph (containers, components, connections)
//!   ↓
//! protocol  → compiler wire protocol: reply unparser, typed query client
//!   ↓
//! base      → qualified-name primitives (`::` graph side, `.` source side)
//! ```

// ============================================================================
// MODULES (dependency order: base → protocol → model → emit/import)
// ============================================================================

/// Foundation types: qualified-name handling across both separators
pub mod base;

/// Error types for import and export operations
pub mod error;

/// Compiler protocol: reply-string unparser and typed query client
pub mod protocol;

/// Standalone model graph: container arena, component sum type
pub mod model;

/// Modelica text emission from the model graph
pub mod emit;

/// Graph reconstruction from the compiler catalog, deferred resolution
pub mod import;

// Re-export commonly needed items
pub use base::QualifiedName;
pub use emit::ExportSession;
pub use error::BridgeError;
pub use import::{ImportReport, ImportSession};
pub use model::{Component, Container, ContainerId, Model, Restriction, TypeRef};
pub use protocol::{Compiler, QueryClient};
