//! Shared test fixtures: a scripted compiler for hand-written catalog
//! scenarios, and a model-backed compiler that answers the query protocol
//! from an in-memory graph (which makes round-trip tests possible without
//! a real compiler service).

#![allow(dead_code)]

use std::collections::HashMap;

use sysmo::base::QualifiedName;
use sysmo::error::BridgeResult;
use sysmo::model::{Component, Connection, ConnectionEnd, Container, Model, Restriction, TypeRef};
use sysmo::protocol::Compiler;

// ============================================================================
// SCRIPTED COMPILER
// ============================================================================

/// Replies from a fixed command -> reply table; anything unscripted gets
/// the service's own error shape.
pub struct ScriptedCompiler {
    replies: HashMap<String, String>,
}

impl ScriptedCompiler {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            replies: pairs
                .iter()
                .map(|(c, r)| (c.to_string(), r.to_string()))
                .collect(),
        }
    }
}

impl Compiler for ScriptedCompiler {
    fn execute(&mut self, command: &str) -> BridgeResult<String> {
        Ok(self
            .replies
            .get(command)
            .cloned()
            .unwrap_or_else(|| "Error".to_string()))
    }
}

// ============================================================================
// MODEL-BACKED COMPILER
// ============================================================================

/// Answers catalog queries from a model graph, as if the compiler had
/// loaded the text that graph would print.
pub struct ModelCompiler {
    model: Model,
}

impl ModelCompiler {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    fn find(&self, query: &str) -> Option<&Container> {
        self.model
            .find_exact(&QualifiedName::from_source(query))
            .map(|id| self.model.get(id))
    }

    fn type_name(&self, ty: TypeRef) -> String {
        match ty {
            TypeRef::Container(id) => self.model.get(id).qname.to_source(),
            builtin => builtin.builtin_name().unwrap_or_default().to_string(),
        }
    }

    fn reply(&self, command: &str) -> String {
        let open = match command.find('(') {
            Some(i) => i,
            None => return "Error".to_string(),
        };
        let name = &command[..open];
        let args: Vec<String> = command[open + 1..command.len() - 1]
            .split(',')
            .map(|a| a.trim().trim_matches('"').to_string())
            .filter(|a| !a.is_empty())
            .collect();

        match name {
            "getClassNames" => {
                let names: Vec<String> = match args.first() {
                    None => self
                        .model
                        .roots()
                        .map(|id| self.model.get(id).name.to_string())
                        .collect(),
                    Some(parent) => match self.find(parent) {
                        Some(c) => c
                            .nested
                            .iter()
                            .map(|&id| self.model.get(id).name.to_string())
                            .collect(),
                        None => return "Error".to_string(),
                    },
                };
                format!("{{{}}}", names.join(","))
            }
            "getClassRestriction" => match self.find(&args[0]) {
                Some(c) => c.restriction.keyword().to_string(),
                None => "Error".to_string(),
            },
            "getEnumerationLiterals" => match self.find(&args[0]) {
                Some(c) if c.restriction == Restriction::Enumeration => {
                    let lits: Vec<&str> = c.literals.iter().map(|l| l.as_str()).collect();
                    format!("{{{}}}", lits.join(","))
                }
                _ => "Error".to_string(),
            },
            "getClassInformation" => match self.find(&args[0]) {
                Some(c) => {
                    let dims: Vec<&str> = c
                        .short_definition()
                        .map(|g| g.array_size.iter().map(|d| d.as_str()).collect())
                        .unwrap_or_default();
                    format!(
                        "{{\"{}\",\"\",false,{{{},{},{}}},false,\"\",false,\"\",false,{{{}}}}}",
                        c.restriction.keyword(),
                        c.is_partial,
                        c.is_final,
                        c.is_encapsulated,
                        dims.join(",")
                    )
                }
                None => "Error".to_string(),
            },
            "isReplaceable" => {
                let child = format!("{}.{}", args[0], args[1]);
                match self.find(&child) {
                    Some(c) => c.is_replaceable.to_string(),
                    None => "false".to_string(),
                }
            }
            "isShortDefinition" => match self.find(&args[0]) {
                Some(c) => c.short_definition().is_some().to_string(),
                None => "false".to_string(),
            },
            "getInheritanceCount" => match self.find(&args[0]) {
                Some(c) => c.generalizations.len().to_string(),
                None => "0".to_string(),
            },
            "getNthInheritedClass" => {
                let n: usize = args[1].parse().unwrap_or(0);
                match self.find(&args[0]).and_then(|c| c.generalizations.get(n - 1)) {
                    Some(g) => match g.base {
                        Some(ty) => self.type_name(ty),
                        None => g.base_name.to_source(),
                    },
                    None => "Error".to_string(),
                }
            }
            "getShortDefinitionBaseClassInformation" => match self
                .find(&args[0])
                .and_then(Container::short_definition)
            {
                Some(g) => {
                    let causality = g.causality.map(|c| c.keyword()).unwrap_or("none");
                    format!("{{none,none,none,none,{causality},none}}")
                }
                None => "Error".to_string(),
            },
            "getExtendsModifierNames" => {
                match self.generalization(&args[0], &args[1]) {
                    Some(g) => {
                        let names: Vec<&str> =
                            g.modifications.iter().filter_map(|m| mod_name(m)).collect();
                        format!("{{{}}}", names.join(","))
                    }
                    None => "Error".to_string(),
                }
            }
            "getExtendsModifierValue" => match self.generalization(&args[0], &args[1]) {
                Some(g) => g
                    .modifications
                    .iter()
                    .find(|m| mod_name(m) == Some(&args[2]))
                    .and_then(|m| mod_value(m))
                    .map(str::to_string)
                    .unwrap_or_else(|| "Error".to_string()),
                None => "Error".to_string(),
            },
            "getComponents" => match self.find(&args[0]) {
                Some(c) => {
                    let records: Vec<String> = c
                        .components
                        .iter()
                        .map(|m| self.component_record(m))
                        .collect();
                    format!("{{{}}}", records.join(","))
                }
                None => "Error".to_string(),
            },
            "getComponentModifierNames" => match self.component(&args[0], &args[1]) {
                Some(m) => {
                    let names: Vec<&str> = m
                        .declaration()
                        .modifications
                        .iter()
                        .filter_map(|t| mod_name(t))
                        .collect();
                    format!("{{{}}}", names.join(","))
                }
                None => "Error".to_string(),
            },
            "getComponentModifierValue" => {
                let (comp, modifier) = match args[1].split_once('.') {
                    Some(pair) => pair,
                    None => return "Error".to_string(),
                };
                match self.component(&args[0], comp) {
                    Some(m) => m
                        .declaration()
                        .modifications
                        .iter()
                        .find(|t| mod_name(t) == Some(modifier))
                        .and_then(|t| mod_value(t))
                        .map(str::to_string)
                        .unwrap_or_else(|| "Error".to_string()),
                    None => "Error".to_string(),
                }
            }
            "getParameterValue" => match self.component(&args[0], &args[1]) {
                Some(m) => m
                    .declaration()
                    .declaration_equation
                    .clone()
                    .unwrap_or_default(),
                None => "".to_string(),
            },
            "getNthComponentCondition" => {
                let n: usize = args[1].parse().unwrap_or(0);
                match self.find(&args[0]).and_then(|c| c.components.get(n - 1)) {
                    Some(m) => m.declaration().condition.clone().unwrap_or_default(),
                    None => "".to_string(),
                }
            }
            "getExternalFunctionSpecification" => {
                match self.find(&args[0]).and_then(|c| c.external.as_ref()) {
                    Some(ext) => format!(
                        "{{\"{}\",\"\",\"{}\",\"\",\"\",\"\"}}",
                        ext.language, ext.body
                    ),
                    None => "Error".to_string(),
                }
            }
            "getNamedAnnotation" => {
                if args.get(1).map(String::as_str) != Some("Library") {
                    return "Error".to_string();
                }
                match self.find(&args[0]).and_then(|c| c.external.as_ref()) {
                    Some(ext) if !ext.libraries.is_empty() => {
                        let libs: Vec<String> =
                            ext.libraries.iter().map(|l| format!("\"{l}\"")).collect();
                        format!("{{{}}}", libs.join(","))
                    }
                    _ => "Error".to_string(),
                }
            }
            "getImportCount" => match self.find(&args[0]) {
                Some(c) => c.imports.len().to_string(),
                None => "0".to_string(),
            },
            "getNthImport" => {
                let n: usize = args[1].parse().unwrap_or(0);
                match self.find(&args[0]).and_then(|c| c.imports.get(n - 1)) {
                    Some(text) => import_record(text),
                    None => "Error".to_string(),
                }
            }
            "getInitialEquationCount" => self.section_count(&args[0], |c| &c.initial_equations),
            "getNthInitialEquation" => self.section_nth(&args, |c| &c.initial_equations),
            "getEquationItemsCount" => self.section_count(&args[0], |c| &c.equations),
            "getNthEquationItem" => self.section_nth(&args, |c| &c.equations),
            "getInitialAlgorithmCount" => self.section_count(&args[0], |c| &c.initial_algorithms),
            "getNthInitialAlgorithm" => self.section_nth(&args, |c| &c.initial_algorithms),
            "getAlgorithmItemsCount" => self.section_count(&args[0], |c| &c.algorithms),
            "getNthAlgorithmItem" => self.section_nth(&args, |c| &c.algorithms),
            "getConnectionCount" => match self.find(&args[0]) {
                Some(c) => c.connections.len().to_string(),
                None => "0".to_string(),
            },
            "getNthConnection" => {
                let n: usize = args[1].parse().unwrap_or(0);
                match self.find(&args[0]).and_then(|c| c.connections.get(n - 1)) {
                    Some(connection) => format!(
                        "{},{}",
                        end_text(&connection.source),
                        end_text(&connection.target)
                    ),
                    None => "Error".to_string(),
                }
            }
            _ => "Error".to_string(),
        }
    }

    fn generalization(&self, class: &str, base: &str) -> Option<&sysmo::model::Generalization> {
        self.find(class)?.generalizations.iter().find(|g| {
            g.base
                .map(|ty| self.type_name(ty) == base)
                .unwrap_or(g.base_name.to_source() == base)
        })
    }

    fn component(&self, class: &str, name: &str) -> Option<&Component> {
        self.find(class)?.component(name)
    }

    fn component_record(&self, component: &Component) -> String {
        use sysmo::model::{Transport, Variability};
        let decl = component.declaration();
        let ty = decl
            .ty
            .map(|t| self.type_name(t))
            .unwrap_or_else(|| decl.type_name.to_source());

        let (variability, causality, transport, scope) = match component {
            Component::ValueProperty {
                variability,
                causality,
                transport,
                scope,
                ..
            } => (*variability, *causality, *transport, *scope),
            Component::Part { scope, .. } => {
                (Variability::Continuous, None, None, *scope)
            }
            Component::Port { causality, .. } | Component::Parameter { causality, .. } => {
                (Variability::Continuous, *causality, None, None)
            }
        };

        let dims: Vec<&str> = decl.array_size.iter().map(|d| d.as_str()).collect();
        format!(
            "{{{},{},\"{}\",\"{}\",{},{},{},{},\"{}\",\"{}\",\"{}\",{{{}}}}}",
            ty,
            decl.name,
            decl.comment.as_deref().unwrap_or(""),
            match decl.visibility {
                sysmo::model::Visibility::Public => "public",
                sysmo::model::Visibility::Protected => "protected",
            },
            decl.is_final,
            transport == Some(Transport::Flow),
            transport == Some(Transport::Stream),
            decl.is_replaceable,
            variability.keyword().unwrap_or("unspecified"),
            scope.map(|s| s.keyword()).unwrap_or("none"),
            causality.map(|c| c.keyword()).unwrap_or("none"),
            dims.join(",")
        )
    }

    fn section_count(&self, class: &str, section: impl Fn(&Container) -> &Vec<String>) -> String {
        match self.find(class) {
            Some(c) => section(c).len().to_string(),
            None => "0".to_string(),
        }
    }

    fn section_nth(&self, args: &[String], section: impl Fn(&Container) -> &Vec<String>) -> String {
        let n: usize = args[1].parse().unwrap_or(0);
        match self.find(&args[0]).and_then(|c| section(c).get(n - 1)) {
            Some(text) => format!("\"{}\"", text.replace('"', "\\\"")),
            None => "Error".to_string(),
        }
    }
}

impl Compiler for ModelCompiler {
    fn execute(&mut self, command: &str) -> BridgeResult<String> {
        Ok(self.reply(command))
    }
}

// ============================================================================
// SMALL HELPERS
// ============================================================================

fn mod_name(text: &str) -> Option<&str> {
    text.split(['=', '('])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn mod_value(text: &str) -> Option<&str> {
    text.find(['=', '(']).map(|i| text[i..].trim())
}

fn import_record(text: &str) -> String {
    let body = text.strip_prefix("import ").unwrap_or(text);
    match body.split_once('=') {
        Some((alias, imported)) => {
            format!("{{{},{},named}}", imported.trim(), alias.trim())
        }
        None => format!("{{{},,qualified}}", body.trim()),
    }
}

fn end_text(end: &ConnectionEnd) -> String {
    match (&end.part, &end.port) {
        (Some(part), Some(port)) => format!("{part}.{port}"),
        (Some(part), None) => part.to_string(),
        (None, Some(port)) => port.to_string(),
        (None, None) => String::new(),
    }
}

/// Builder shorthand for graph-side containers in tests.
pub fn container(name: &str, restriction: Restriction) -> Container {
    Container::new(QualifiedName::from_graph(name), restriction)
}

pub fn connection(source: ConnectionEnd, target: ConnectionEnd) -> Connection {
    Connection { source, target }
}
