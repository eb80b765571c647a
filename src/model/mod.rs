//! In-memory model graph shared by import and export.
//!
//! The graph is the neutral middle of the bridge: the importer builds it
//! from catalog queries, the exporter walks it to print source text. It is
//! deliberately plain data with no compiler handle attached.
//!
//! ```text
//! Model
//! ├── containers: Vec<Container>        (arena, creation order)
//! ├── by_qname: FxHashMap<_, ContainerId>
//! └── roots: Vec<ContainerId>
//! ```
//!
//! Containers live in an arena and refer to each other by [`ContainerId`];
//! type references resolve either to a builtin ([`TypeRef::Real`] and
//! friends) or to another container in the same model.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::QualifiedName;

mod component;

pub use component::{
    Causality, Component, Declaration, Scope, Transport, Variability, Visibility,
};

// ============================================================================
// IDS AND TYPE REFERENCES
// ============================================================================

/// Arena index of a container. Valid only within the model that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub usize);

/// A resolved type reference.
///
/// The four value primitives and the state-selection enumeration are
/// builtins of the source language and never appear as containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Real,
    Integer,
    Boolean,
    String,
    StateSelect,
    Container(ContainerId),
}

impl TypeRef {
    /// Builtin for a source-form name, if it is one.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "Real" => Some(Self::Real),
            "Integer" => Some(Self::Integer),
            "Boolean" => Some(Self::Boolean),
            "String" => Some(Self::String),
            "StateSelect" => Some(Self::StateSelect),
            _ => None,
        }
    }

    /// Source-form name of a builtin.
    pub fn builtin_name(&self) -> Option<&'static str> {
        match self {
            Self::Real => Some("Real"),
            Self::Integer => Some("Integer"),
            Self::Boolean => Some("Boolean"),
            Self::String => Some("String"),
            Self::StateSelect => Some("StateSelect"),
            Self::Container(_) => None,
        }
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

/// What kind of definition a container is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Restriction {
    Block,
    Class,
    Connector,
    ExpandableConnector,
    Enumeration,
    Function,
    Model,
    Package,
    Record,
    Type,
}

impl Restriction {
    /// Parse the catalog's restriction word.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "block" => Some(Self::Block),
            "class" => Some(Self::Class),
            "connector" => Some(Self::Connector),
            "expandable connector" => Some(Self::ExpandableConnector),
            "enumeration" => Some(Self::Enumeration),
            "function" => Some(Self::Function),
            "model" => Some(Self::Model),
            "package" => Some(Self::Package),
            "record" => Some(Self::Record),
            "type" => Some(Self::Type),
            _ => None,
        }
    }

    /// Keyword used in printed source.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Class => "class",
            Self::Connector => "connector",
            Self::ExpandableConnector => "expandable connector",
            Self::Enumeration | Self::Type => "type",
            Self::Function => "function",
            Self::Model => "model",
            Self::Package => "package",
            Self::Record => "record",
        }
    }
}

/// A generalization edge from a container to its base type.
///
/// Short definitions (`type Voltage = Real(unit = "V")`) are a degenerate
/// container whose only content is one of these edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generalization {
    pub base: Option<TypeRef>,
    /// Base name as the catalog reported it, kept for diagnostics.
    pub base_name: QualifiedName,
    pub is_short_definition: bool,
    /// Modification texts, each already in `name = value` form.
    pub modifications: Vec<String>,
    /// Causality prefix of a short definition base, when stated.
    pub causality: Option<Causality>,
    pub array_size: Vec<SmolStr>,
}

/// One end of a connection: an optional part and an optional port on it.
///
/// A plain `connect (a, b)` between ports of the owner has no part; an end
/// into an expandable bus may carry a part with no port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionEnd {
    pub part: Option<SmolStr>,
    pub port: Option<SmolStr>,
}

impl ConnectionEnd {
    pub fn port(name: impl Into<SmolStr>) -> Self {
        Self {
            part: None,
            port: Some(name.into()),
        }
    }

    pub fn part_port(part: impl Into<SmolStr>, port: impl Into<SmolStr>) -> Self {
        Self {
            part: Some(part.into()),
            port: Some(port.into()),
        }
    }

    pub fn part_only(part: impl Into<SmolStr>) -> Self {
        Self {
            part: Some(part.into()),
            port: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Connection {
    pub source: ConnectionEnd,
    pub target: ConnectionEnd,
}

/// External-language clause of a function.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalFunction {
    pub language: String,
    /// Call text, e.g. `y = fmult(u1,u2)`.
    pub body: String,
    /// Values of the `Library` named annotation.
    pub libraries: Vec<String>,
}

/// A definition: package, model, block, connector, record, function, or
/// type. Everything the printer needs is denormalized onto this struct;
/// fields that do not apply to a given restriction stay empty.
#[derive(Clone, Debug)]
pub struct Container {
    pub name: SmolStr,
    pub qname: QualifiedName,
    pub restriction: Restriction,
    pub parent: Option<ContainerId>,

    pub is_partial: bool,
    pub is_final: bool,
    pub is_encapsulated: bool,
    pub is_replaceable: bool,

    /// Import statement texts, already in printable form.
    pub imports: Vec<String>,
    pub generalizations: Vec<Generalization>,
    pub components: Vec<Component>,
    pub nested: Vec<ContainerId>,

    /// Enumeration literals, in declaration order.
    pub literals: Vec<SmolStr>,
    /// External-language clause of a function.
    pub external: Option<ExternalFunction>,
    pub annotation: Option<String>,

    pub initial_equations: Vec<String>,
    pub equations: Vec<String>,
    pub initial_algorithms: Vec<String>,
    pub algorithms: Vec<String>,
    pub connections: Vec<Connection>,
}

impl Container {
    pub fn new(qname: QualifiedName, restriction: Restriction) -> Self {
        Self {
            name: SmolStr::new(qname.simple_name()),
            qname,
            restriction,
            parent: None,
            is_partial: false,
            is_final: false,
            is_encapsulated: false,
            is_replaceable: false,
            imports: Vec::new(),
            generalizations: Vec::new(),
            components: Vec::new(),
            nested: Vec::new(),
            literals: Vec::new(),
            external: None,
            annotation: None,
            initial_equations: Vec::new(),
            equations: Vec::new(),
            initial_algorithms: Vec::new(),
            algorithms: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// The sole generalization of a short definition, if this is one.
    pub fn short_definition(&self) -> Option<&Generalization> {
        self.generalizations.iter().find(|g| g.is_short_definition)
    }

    /// Component lookup by name, declaration order.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.declaration().name == name)
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// The container arena plus its lookup indices.
#[derive(Default)]
pub struct Model {
    containers: Vec<Container>,
    by_qname: FxHashMap<QualifiedName, ContainerId>,
    roots: Vec<ContainerId>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a container, wiring the parent/child link when a parent is
    /// given. Returns the new id.
    pub fn insert(&mut self, mut container: Container, parent: Option<ContainerId>) -> ContainerId {
        let id = ContainerId(self.containers.len());
        container.parent = parent;
        self.by_qname.insert(container.qname.clone(), id);
        self.containers.push(container);
        match parent {
            Some(p) => self.containers[p.0].nested.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn get(&self, id: ContainerId) -> &Container {
        &self.containers[id.0]
    }

    pub fn get_mut(&mut self, id: ContainerId) -> &mut Container {
        &mut self.containers[id.0]
    }

    /// Top-level containers, insertion order.
    pub fn roots(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.roots.iter().copied()
    }

    /// All containers with their ids, creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ContainerId, &Container)> {
        self.containers
            .iter()
            .enumerate()
            .map(|(i, c)| (ContainerId(i), c))
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Exact qualified-name lookup.
    pub fn find_exact(&self, qname: &QualifiedName) -> Option<ContainerId> {
        self.by_qname.get(qname).copied()
    }

    /// Suffix lookup: the first container, in creation order, whose
    /// qualified name ends with every segment of `query`. Creation order
    /// makes the match deterministic when several containers share a
    /// simple name.
    pub fn find_by_suffix(&self, query: &QualifiedName) -> Option<ContainerId> {
        self.containers
            .iter()
            .position(|c| c.qname.suffix_matches(query))
            .map(ContainerId)
    }

    /// Component lookup on a container, falling back to inherited members.
    ///
    /// Walks the generalization closure depth-first; cycles are cut by a
    /// visited set.
    pub fn component_including_inherited(
        &self,
        id: ContainerId,
        name: &str,
    ) -> Option<&Component> {
        let mut visited = Vec::new();
        self.component_walk(id, name, &mut visited)
    }

    fn component_walk<'a>(
        &'a self,
        id: ContainerId,
        name: &str,
        visited: &mut Vec<ContainerId>,
    ) -> Option<&'a Component> {
        if visited.contains(&id) {
            return None;
        }
        visited.push(id);
        let container = self.get(id);
        if let Some(found) = container.component(name) {
            return Some(found);
        }
        for edge in &container.generalizations {
            if let Some(TypeRef::Container(base)) = edge.base {
                if let Some(found) = self.component_walk(base, name, visited) {
                    return Some(found);
                }
            }
        }
        None
    }
}
