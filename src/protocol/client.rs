//! Typed catalog queries over a raw compiler transport.

use tracing::{trace, warn};

use crate::error::BridgeResult;
use crate::protocol::unparse;

// ============================================================================
// TRANSPORT
// ============================================================================

/// A text-mode compiler session.
///
/// One command in, one reply out. Implementations only surface *transport*
/// failures as errors; replies carrying compiler error text are returned as
/// ordinary strings and handled by the caller.
pub trait Compiler {
    fn execute(&mut self, command: &str) -> BridgeResult<String>;
}

// ============================================================================
// COMPONENT RECORDS
// ============================================================================

/// One component record from a `getComponents` reply.
///
/// The reply lists twelve fields per component; records with fewer fields
/// are malformed and dropped during parsing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentData {
    pub type_qname: String,
    pub name: String,
    pub comment: String,
    pub visibility: String,
    pub is_final: bool,
    pub is_flow: bool,
    pub is_stream: bool,
    pub is_replaceable: bool,
    pub variability: String,
    pub inner_outer: String,
    pub causality: String,
    pub array_size: Vec<String>,
}

impl ComponentData {
    /// Parse one brace group into a record. Returns `None` when the group
    /// does not carry the full field set.
    fn parse(group: &str) -> Option<Self> {
        let items = unparse::unparse_component_strings(group);
        if items.len() <= 10 {
            return None;
        }
        let field = |i: usize| unparse::strip_outer_quotes(&items[i]).to_string();
        Some(Self {
            type_qname: items[0].trim().to_string(),
            name: items[1].trim().to_string(),
            comment: field(2),
            visibility: field(3),
            is_final: items[4].trim() == "true",
            is_flow: items[5].trim() == "true",
            is_stream: items[6].trim() == "true",
            is_replaceable: items[7].trim() == "true",
            variability: field(8),
            inner_outer: field(9),
            causality: field(10),
            array_size: items
                .get(11)
                .map(|raw| parse_array_size(raw))
                .unwrap_or_default(),
        })
    }
}

/// Split an array-size field into dimension items.
///
/// The field arrives curly-wrapped and comma-separated; a dimension written
/// as a bound pair (`lo:hi`) is split into separate items, while a bare `:`
/// stays as one unsized dimension.
fn parse_array_size(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    for piece in unparse::strip_outer_braces(raw.trim()).split(',') {
        if piece.is_empty() {
            continue;
        }
        let mut rest = piece;
        if rest != ":" {
            while let Some(colon) = rest.find(':') {
                let head = &rest[..=colon];
                if head.starts_with(':') {
                    items.push(head.to_string());
                } else {
                    items.push(head.replace(':', ""));
                }
                rest = &rest[colon + 1..];
            }
        }
        items.push(rest.to_string());
    }
    items
}

// ============================================================================
// QUERY CLIENT
// ============================================================================

/// Catalog query layer over a [`Compiler`].
///
/// Keeps an append-only command history for diagnostics. Count queries fall
/// back to zero on error replies, and enumerated replies skip blank /
/// `Error` / `false` entries, so a partially loaded catalog degrades to
/// fewer results rather than a failed traversal.
pub struct QueryClient<C> {
    compiler: C,
    history: Vec<String>,
}

impl<C: Compiler> QueryClient<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            history: Vec::new(),
        }
    }

    /// Commands sent so far, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn into_inner(self) -> C {
        self.compiler
    }

    fn execute(&mut self, command: String) -> BridgeResult<String> {
        let reply = self.compiler.execute(&command)?;
        trace!(command, reply, "compiler round-trip");
        self.history.push(command);
        Ok(reply)
    }

    /// Run a count query; error or blank replies count as zero.
    fn count(&mut self, command: String) -> BridgeResult<usize> {
        let reply = self.execute(command.clone())?;
        let trimmed = reply.trim();
        if trimmed.is_empty() || trimmed.contains("rror") {
            warn!(command, reply = trimmed, "count query failed");
            return Ok(0);
        }
        match trimmed.parse::<usize>() {
            Ok(count) => Ok(count),
            Err(_) => {
                warn!(command, reply = trimmed, "count query not numeric");
                Ok(0)
            }
        }
    }

    /// Run `count_cmd`, then the nth query for 1..=count, collecting the
    /// unquoted, unescaped replies. Blank / `Error` / `false` entries are
    /// skipped.
    fn enumerate(
        &mut self,
        count_cmd: String,
        nth_cmd: impl Fn(usize) -> String,
    ) -> BridgeResult<Vec<String>> {
        let count = self.count(count_cmd)?;
        let mut out = Vec::with_capacity(count);
        for i in 1..=count {
            let reply = self.execute(nth_cmd(i))?;
            let trimmed = reply.trim();
            if trimmed.is_empty() || trimmed.contains("rror") || trimmed == "false" {
                continue;
            }
            out.push(unparse::replace_spec_chars(unparse::strip_outer_quotes(
                trimmed,
            )));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // session
    // ------------------------------------------------------------------

    pub fn load_file(&mut self, path: &str) -> BridgeResult<String> {
        self.execute(format!("loadFile(\"{path}\")"))
    }

    pub fn error_string(&mut self) -> BridgeResult<String> {
        self.execute("getErrorString()".to_string())
    }

    // ------------------------------------------------------------------
    // class catalog
    // ------------------------------------------------------------------

    pub fn class_names(&mut self, parent: &str) -> BridgeResult<Vec<String>> {
        let reply = if parent.is_empty() {
            self.execute("getClassNames()".to_string())?
        } else {
            self.execute(format!("getClassNames({parent})"))?
        };
        Ok(unparse::unparse_strings(&reply)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub fn class_restriction(&mut self, class: &str) -> BridgeResult<String> {
        let reply = self.execute(format!("getClassRestriction({class})"))?;
        Ok(unparse::strip_outer_quotes(reply.trim()).trim().to_string())
    }

    /// Raw `getClassInformation` reply; callers split it themselves since
    /// definition attributes and extends array sizes read different slices.
    pub fn class_information(&mut self, class: &str) -> BridgeResult<String> {
        self.execute(format!("getClassInformation({class})"))
    }

    pub fn short_definition_base_class_information(
        &mut self,
        class: &str,
    ) -> BridgeResult<String> {
        self.execute(format!("getShortDefinitionBaseClassInformation({class})"))
    }

    pub fn is_short_definition(&mut self, class: &str) -> BridgeResult<bool> {
        let reply = self.execute(format!("isShortDefinition({class})"))?;
        Ok(reply.trim() == "true")
    }

    pub fn is_replaceable(&mut self, owner: &str, nested: &str) -> BridgeResult<bool> {
        let reply = self.execute(format!("isReplaceable({owner}, \"{nested}\")"))?;
        Ok(reply.trim() == "true")
    }

    pub fn external_function_specification(&mut self, class: &str) -> BridgeResult<String> {
        self.execute(format!("getExternalFunctionSpecification({class})"))
    }

    pub fn named_annotation(&mut self, class: &str, annotation: &str) -> BridgeResult<String> {
        self.execute(format!("getNamedAnnotation({class},{annotation})"))
    }

    pub fn enumeration_literals(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        let reply = self.execute(format!("getEnumerationLiterals({class})"))?;
        let trimmed = reply.trim();
        if trimmed.is_empty() || trimmed.contains("rror") {
            return Ok(Vec::new());
        }
        Ok(unparse::unparse_strings(trimmed)
            .into_iter()
            .map(|s| unparse::strip_outer_quotes(s.trim()).to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    // ------------------------------------------------------------------
    // imports
    // ------------------------------------------------------------------

    pub fn imports(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        let count = self.count(format!("getImportCount({class})"))?;
        let mut out = Vec::with_capacity(count);
        for i in 1..=count {
            let reply = self.execute(format!("getNthImport({class}, {i})"))?;
            let trimmed = reply.trim();
            if trimmed.is_empty() || trimmed.contains("rror") || trimmed == "false" {
                continue;
            }
            out.push(trimmed.to_string());
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // generalizations
    // ------------------------------------------------------------------

    pub fn inherited_classes(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getInheritanceCount({class})"), |i| {
            format!("getNthInheritedClass({class},{i})")
        })
    }

    pub fn extends_modifier_names(
        &mut self,
        class: &str,
        base: &str,
    ) -> BridgeResult<String> {
        self.execute(format!("getExtendsModifierNames({class}, {base})"))
    }

    pub fn extends_modifier_value(
        &mut self,
        class: &str,
        base: &str,
        name: &str,
    ) -> BridgeResult<String> {
        self.execute(format!("getExtendsModifierValue({class}, {base}, {name})"))
    }

    // ------------------------------------------------------------------
    // components
    // ------------------------------------------------------------------

    pub fn components(&mut self, class: &str) -> BridgeResult<Vec<ComponentData>> {
        let reply = self.execute(format!("getComponents({class})"))?;
        Ok(unparse::unparse_arrays(&reply)
            .iter()
            .filter_map(|group| ComponentData::parse(group))
            .collect())
    }

    pub fn component_modifier_names(
        &mut self,
        class: &str,
        component: &str,
    ) -> BridgeResult<String> {
        self.execute(format!("getComponentModifierNames({class}, {component})"))
    }

    pub fn component_modifier_value(
        &mut self,
        class: &str,
        component: &str,
    ) -> BridgeResult<String> {
        self.execute(format!("getComponentModifierValue({class}, {component})"))
    }

    /// Declaration equation of a component, via the parameter-value query.
    pub fn parameter_value(&mut self, class: &str, component: &str) -> BridgeResult<String> {
        self.execute(format!("getParameterValue({class},{component})"))
    }

    pub fn nth_component_condition(
        &mut self,
        component: &str,
        n: usize,
    ) -> BridgeResult<String> {
        self.execute(format!("getNthComponentCondition({component}, {n})"))
    }

    // ------------------------------------------------------------------
    // behavior sections
    // ------------------------------------------------------------------

    pub fn initial_equations(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getInitialEquationCount({class})"), |i| {
            format!("getNthInitialEquation({class}, {i})")
        })
    }

    pub fn equations(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getEquationItemsCount({class})"), |i| {
            format!("getNthEquationItem({class}, {i})")
        })
    }

    pub fn connections(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getConnectionCount({class})"), |i| {
            format!("getNthConnection({class}, {i})")
        })
    }

    pub fn initial_algorithms(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getInitialAlgorithmCount({class})"), |i| {
            format!("getNthInitialAlgorithm({class}, {i})")
        })
    }

    pub fn algorithms(&mut self, class: &str) -> BridgeResult<Vec<String>> {
        self.enumerate(format!("getAlgorithmItemsCount({class})"), |i| {
            format!("getNthAlgorithmItem({class}, {i})")
        })
    }
}
