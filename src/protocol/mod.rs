//! Wire protocol for the text-mode compiler session.
//!
//! The compiler speaks a simple request/reply protocol: every request is a
//! single command string, every reply a single line of text. Replies that
//! carry structured data use Modelica's own literal syntax (brace-wrapped,
//! comma-separated, quote-escaped), so this module has two halves:
//!
//! - [`unparse`] is the codec: it splits brace lists into element strings
//!   without ever parsing the grammar inside them. Nested braces and quoted
//!   commas survive verbatim.
//! - [`client`] holds the [`Compiler`] transport trait and the typed
//!   [`QueryClient`] that drives the catalog queries on top of it.

pub mod client;
pub mod unparse;

pub use client::{Compiler, ComponentData, QueryClient};
