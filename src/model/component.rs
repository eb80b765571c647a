//! Component declarations and their prefix vocabulary.

use smol_str::SmolStr;

use crate::base::QualifiedName;
use crate::model::TypeRef;

// ============================================================================
// PREFIXES
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
}

impl Visibility {
    pub fn from_keyword(word: &str) -> Self {
        match word {
            "protected" => Self::Protected,
            _ => Self::Public,
        }
    }
}

/// Value-property variability. Anything the catalog does not mark as
/// constant, discrete, or parameter is continuous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Variability {
    Constant,
    Discrete,
    Parameter,
    #[default]
    Continuous,
}

impl Variability {
    pub fn from_keyword(word: &str) -> Self {
        match word {
            "constant" => Self::Constant,
            "discrete" => Self::Discrete,
            "parameter" => Self::Parameter,
            _ => Self::Continuous,
        }
    }

    /// Printed prefix; continuous is the default and prints nothing.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::Constant => Some("constant"),
            Self::Discrete => Some("discrete"),
            Self::Parameter => Some("parameter"),
            Self::Continuous => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Causality {
    Input,
    Output,
}

impl Causality {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Flow semantics of a continuous value property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Flow,
    Stream,
}

impl Transport {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Stream => "stream",
        }
    }
}

/// Inner/outer instance scoping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Inner,
    Outer,
}

impl Scope {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "inner" => Some(Self::Inner),
            "outer" => Some(Self::Outer),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
        }
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// The parts of a component every kind shares.
///
/// `ty` is `None` while the component's type is still unresolved; the
/// printer skips such components rather than inventing a type name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Declaration {
    pub name: SmolStr,
    /// Type name as the catalog reported it.
    pub type_name: QualifiedName,
    pub ty: Option<TypeRef>,
    pub comment: Option<String>,
    pub visibility: Visibility,
    pub is_final: bool,
    pub is_replaceable: bool,
    pub array_size: Vec<SmolStr>,
    /// Modification texts, each already in `name = value` form.
    pub modifications: Vec<String>,
    /// Right-hand side of `name = ...`, without the equals sign.
    pub declaration_equation: Option<String>,
    /// Guard of a conditional component, without the `if` keyword.
    pub condition: Option<String>,
    pub annotation: Option<String>,
}

impl Declaration {
    pub fn named(name: impl Into<SmolStr>, ty: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty,
            ..Default::default()
        }
    }
}

// ============================================================================
// COMPONENT KINDS
// ============================================================================

/// A component, tagged by role.
///
/// The role decides which prefixes make sense: a part has no causality, a
/// port no variability, a function parameter nothing but causality. Keeping
/// them as variants means an impossible combination cannot be represented.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    /// Typed by a record, a primitive, or a `type` definition.
    ValueProperty {
        decl: Declaration,
        variability: Variability,
        causality: Option<Causality>,
        transport: Option<Transport>,
        scope: Option<Scope>,
    },
    /// Typed by a model, block, or class.
    Part {
        decl: Declaration,
        scope: Option<Scope>,
    },
    /// Typed by a connector.
    Port {
        decl: Declaration,
        causality: Option<Causality>,
    },
    /// A formal of a function.
    Parameter {
        decl: Declaration,
        causality: Option<Causality>,
    },
}

impl Component {
    pub fn value_property(
        decl: Declaration,
        variability: Variability,
        causality: Option<Causality>,
        transport: Option<Transport>,
        scope: Option<Scope>,
    ) -> Self {
        Self::ValueProperty {
            decl,
            variability,
            causality,
            transport,
            scope,
        }
    }

    pub fn part(decl: Declaration, scope: Option<Scope>) -> Self {
        Self::Part { decl, scope }
    }

    pub fn port(decl: Declaration, causality: Option<Causality>) -> Self {
        Self::Port { decl, causality }
    }

    pub fn parameter(decl: Declaration, causality: Option<Causality>) -> Self {
        Self::Parameter { decl, causality }
    }

    pub fn declaration(&self) -> &Declaration {
        match self {
            Self::ValueProperty { decl, .. }
            | Self::Part { decl, .. }
            | Self::Port { decl, .. }
            | Self::Parameter { decl, .. } => decl,
        }
    }

    pub fn declaration_mut(&mut self) -> &mut Declaration {
        match self {
            Self::ValueProperty { decl, .. }
            | Self::Part { decl, .. }
            | Self::Port { decl, .. }
            | Self::Parameter { decl, .. } => decl,
        }
    }

    pub fn is_part(&self) -> bool {
        matches!(self, Self::Part { .. })
    }

    pub fn is_port(&self) -> bool {
        matches!(self, Self::Port { .. })
    }

    pub fn is_value_property(&self) -> bool {
        matches!(self, Self::ValueProperty { .. })
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter { .. })
    }
}
