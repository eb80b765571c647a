//! Qualified names across the graph/source boundary.

use smol_str::SmolStr;

/// Segment separator on the model-graph side.
pub const GRAPH_SEPARATOR: &str = "::";

/// Segment separator in Modelica source text and compiler queries.
pub const SOURCE_SEPARATOR: &str = ".";

/// A dot- or colon-agnostic qualified name.
///
/// Internally stored in graph form (`A::B::C`). Construction normalizes
/// whichever separator the input used; [`QualifiedName::as_graph`] and
/// [`QualifiedName::to_source`] pick the form each boundary needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Build from graph form (`A::B::C`).
    pub fn from_graph(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build from source form (`A.B.C`).
    pub fn from_source(name: &str) -> Self {
        Self(name.replace(SOURCE_SEPARATOR, GRAPH_SEPARATOR))
    }

    /// Build from ordered segments.
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            segments
                .into_iter()
                .collect::<Vec<_>>()
                .join(GRAPH_SEPARATOR),
        )
    }

    /// The graph form (`A::B::C`).
    pub fn as_graph(&self) -> &str {
        &self.0
    }

    /// The source form (`A.B.C`), as sent to the compiler.
    pub fn to_source(&self) -> String {
        self.0.replace(GRAPH_SEPARATOR, SOURCE_SEPARATOR)
    }

    /// Final segment (the simple name).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(GRAPH_SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Ordered segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(GRAPH_SEPARATOR)
    }

    /// Append a segment, returning the extended name.
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}{}{}", self.0, GRAPH_SEPARATOR, segment))
        }
    }

    /// Right-to-left segment comparison: does `self` end with every segment
    /// of `query`, matched from the tail inward?
    ///
    /// This is how catalog type references are resolved: the compiler may
    /// report a type relative to an enclosing namespace, so `Pkg::Sub::T`
    /// suffix-matches the query `Sub::T` but not `Other::T`.
    pub fn suffix_matches(&self, query: &QualifiedName) -> bool {
        let mine: Vec<&str> = self.segments().collect();
        let theirs: Vec<&str> = query.segments().collect();
        if theirs.is_empty() || theirs.len() > mine.len() {
            return false;
        }
        mine.iter()
            .rev()
            .zip(theirs.iter().rev())
            .all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        if s.contains(GRAPH_SEPARATOR) {
            Self::from_graph(s)
        } else {
            Self::from_source(s)
        }
    }
}

impl From<SmolStr> for QualifiedName {
    fn from(s: SmolStr) -> Self {
        Self::from(s.as_str())
    }
}
