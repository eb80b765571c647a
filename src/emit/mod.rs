//! Source-text printer for model graphs.
//!
//! Output layout is fixed: tab indentation, CRLF line endings, and one
//! canonical section order per container. Determinism matters more than
//! prettiness here since downstream tools diff the generated text.

use std::path::Path;

use tracing::warn;

use crate::error::BridgeResult;
use crate::model::{
    Component, Connection, ConnectionEnd, Container, ContainerId, Model, Restriction, TypeRef,
    Visibility,
};

const EOL: &str = "\r\n";
const INDENT: &str = "\t";

/// One export operation over a model graph.
///
/// Holds the indentation register the printer threads through nested
/// containers. The register is reset at the start of every [`emit`] call,
/// so a session can be reused; it must not be shared across concurrent
/// emits.
///
/// [`emit`]: ExportSession::emit
#[derive(Default)]
pub struct ExportSession {
    indent: String,
    out: String,
}

impl ExportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print one container and everything it owns.
    pub fn emit(&mut self, model: &Model, root: ContainerId) -> String {
        self.indent.clear();
        self.out = String::new();
        self.container(model, root);
        std::mem::take(&mut self.out)
    }

    /// Print every root container, in insertion order.
    pub fn emit_all(&mut self, model: &Model) -> String {
        self.indent.clear();
        self.out = String::new();
        for root in model.roots() {
            self.container(model, root);
        }
        std::mem::take(&mut self.out)
    }

    // ------------------------------------------------------------------
    // containers
    // ------------------------------------------------------------------

    fn container(&mut self, model: &Model, id: ContainerId) {
        let c = model.get(id);

        if c.restriction == Restriction::Enumeration {
            self.enumeration(c);
            return;
        }
        if let Some(short) = c.short_definition() {
            let line = self.short_definition_line(model, c, short);
            self.line(&line);
            return;
        }

        let mut header = self.definition_prefixes(c);
        header.push_str(c.restriction.keyword());
        header.push(' ');
        header.push_str(&c.name);
        self.line(&header);
        self.indent.push_str(INDENT);

        for import in &c.imports {
            self.line(&format!("{import};"));
        }
        for edge in &c.generalizations {
            let mut line = String::from("extends ");
            line.push_str(&self.base_name(model, edge.base, &edge.base_name));
            if !edge.array_size.is_empty() {
                line.push('[');
                line.push_str(&join(&edge.array_size, ","));
                line.push(']');
            }
            push_modifications(&mut line, &edge.modifications);
            line.push(';');
            self.line(&line);
        }

        self.member_sections(model, c);

        // nested encapsulated definitions and functions come before behavior
        for &nested in &c.nested {
            let n = model.get(nested);
            if n.is_encapsulated || n.restriction == Restriction::Function {
                self.container(model, nested);
            }
        }

        if c.restriction == Restriction::Function {
            if let Some(external) = &c.external {
                let mut line = format!("external \"{}\"", external.language);
                if !external.body.is_empty() {
                    line.push(' ');
                    line.push_str(&external.body);
                }
                line.push(';');
                self.line(&line);
                if !external.libraries.is_empty() {
                    self.line(&format!(
                        "annotation(Library=\"{}\");",
                        external.libraries.join(",")
                    ));
                }
            }
        }

        self.behavior_sections(model, c);

        for &nested in &c.nested {
            let n = model.get(nested);
            if !(n.is_encapsulated || n.restriction == Restriction::Function) {
                self.container(model, nested);
            }
        }

        if let Some(annotation) = &c.annotation {
            self.line(&format!("annotation({annotation});"));
        }

        self.indent.truncate(self.indent.len() - INDENT.len());
        self.line(&format!("end {};", c.name));
    }

    fn enumeration(&mut self, c: &Container) {
        let mut text = String::new();
        text.push_str(&self.indent);
        text.push_str(&self.definition_prefixes(c));
        text.push_str("type ");
        text.push_str(&c.name);
        text.push_str(" = enumeration(");
        text.push_str(EOL);
        let literal_indent = format!("{}{}", self.indent, INDENT);
        let body: Vec<String> = c
            .literals
            .iter()
            .map(|l| format!("{literal_indent}{l}"))
            .collect();
        text.push_str(&body.join(&format!(",{EOL}")));
        text.push_str(&format!("{EOL}{});{EOL}", self.indent));
        self.out.push_str(&text);
    }

    fn short_definition_line(
        &self,
        model: &Model,
        c: &Container,
        edge: &crate::model::Generalization,
    ) -> String {
        let mut line = self.definition_prefixes(c);
        line.push_str(c.restriction.keyword());
        line.push(' ');
        line.push_str(&c.name);
        line.push_str(" = ");
        if let Some(causality) = edge.causality {
            line.push_str(causality.keyword());
            line.push(' ');
        }
        line.push_str(&self.base_name(model, edge.base, &edge.base_name));
        if !edge.array_size.is_empty() {
            line.push('[');
            line.push_str(&join(&edge.array_size, ","));
            line.push(']');
        }
        push_modifications(&mut line, &edge.modifications);
        line.push(';');
        line
    }

    fn definition_prefixes(&self, c: &Container) -> String {
        let mut s = String::new();
        if c.is_final {
            s.push_str("final ");
        }
        if c.is_encapsulated {
            s.push_str("encapsulated ");
        }
        if c.is_partial {
            s.push_str("partial ");
        }
        if c.is_replaceable {
            s.push_str("replaceable ");
        }
        s
    }

    // ------------------------------------------------------------------
    // members
    // ------------------------------------------------------------------

    /// Parts, then ports, then value properties; protected members repeat
    /// the same order after a `protected` marker. Connectors and records
    /// carry value properties only; functions carry parameters.
    fn member_sections(&mut self, model: &Model, c: &Container) {
        let groups: &[fn(&Component) -> bool] = match c.restriction {
            Restriction::Connector | Restriction::ExpandableConnector | Restriction::Record => {
                &[Component::is_value_property]
            }
            Restriction::Function => &[Component::is_parameter],
            _ => &[
                Component::is_part,
                Component::is_port,
                Component::is_value_property,
            ],
        };

        for visibility in [Visibility::Public, Visibility::Protected] {
            let members: Vec<&Component> = groups
                .iter()
                .flat_map(|&belongs| {
                    c.components
                        .iter()
                        .filter(move |m| belongs(m) && m.declaration().visibility == visibility)
                })
                .collect();
            if members.is_empty() {
                continue;
            }
            if visibility == Visibility::Protected {
                self.marker("protected");
            }
            for member in members {
                if let Some(line) = self.component_line(model, c, member) {
                    self.line(&line);
                }
            }
        }
    }

    fn component_line(
        &self,
        model: &Model,
        owner: &Container,
        component: &Component,
    ) -> Option<String> {
        let decl = component.declaration();
        let Some(ty) = decl.ty else {
            warn!(
                owner = %owner.qname,
                component = %decl.name,
                "skipping component with unresolved type"
            );
            return None;
        };

        let mut line = String::new();
        if decl.is_final {
            line.push_str("final ");
        }
        if decl.is_replaceable {
            line.push_str("replaceable ");
        }
        match component {
            Component::ValueProperty {
                variability,
                causality,
                transport,
                scope,
                ..
            } => {
                if let Some(scope) = scope {
                    line.push_str(scope.keyword());
                    line.push(' ');
                }
                if let Some(transport) = transport {
                    line.push_str(transport.keyword());
                    line.push(' ');
                }
                if let Some(word) = variability.keyword() {
                    line.push_str(word);
                    line.push(' ');
                }
                if let Some(causality) = causality {
                    line.push_str(causality.keyword());
                    line.push(' ');
                }
            }
            Component::Part { scope, .. } => {
                if let Some(scope) = scope {
                    line.push_str(scope.keyword());
                    line.push(' ');
                }
            }
            Component::Port { causality, .. } | Component::Parameter { causality, .. } => {
                if let Some(causality) = causality {
                    line.push_str(causality.keyword());
                    line.push(' ');
                }
            }
        }

        line.push_str(&self.type_name(model, ty));
        line.push(' ');
        line.push_str(&decl.name);
        if !decl.array_size.is_empty() {
            line.push('[');
            line.push_str(&join(&decl.array_size, ","));
            line.push(']');
        }
        push_modifications(&mut line, &decl.modifications);
        if let Some(eq) = &decl.declaration_equation {
            line.push_str(" = ");
            line.push_str(eq);
        }
        if let Some(condition) = &decl.condition {
            line.push_str(" if ");
            line.push_str(condition);
        }
        if let Some(annotation) = &decl.annotation {
            line.push_str(" annotation(");
            line.push_str(annotation);
            line.push(')');
        }
        line.push(';');
        Some(line)
    }

    fn type_name(&self, model: &Model, ty: TypeRef) -> String {
        match ty {
            TypeRef::Container(id) => model.get(id).qname.to_source(),
            builtin => builtin
                .builtin_name()
                .map(str::to_string)
                .unwrap_or_default(),
        }
    }

    fn base_name(
        &self,
        model: &Model,
        base: Option<TypeRef>,
        reported: &crate::base::QualifiedName,
    ) -> String {
        match base {
            Some(ty) => self.type_name(model, ty),
            None => reported.to_source(),
        }
    }

    // ------------------------------------------------------------------
    // behavior
    // ------------------------------------------------------------------

    fn behavior_sections(&mut self, model: &Model, c: &Container) {
        if !c.initial_equations.is_empty() {
            self.marker("initial equation");
            for eq in &c.initial_equations {
                self.line(&format!("{eq};"));
            }
        }

        let mut equation_marker_printed = false;
        if !c.equations.is_empty() {
            self.marker("equation");
            equation_marker_printed = true;
            for eq in &c.equations {
                self.line(&format!("{eq};"));
            }
        }
        if !c.connections.is_empty() {
            if !equation_marker_printed {
                self.marker("equation");
            }
            for connection in &c.connections {
                self.connection(model, connection);
            }
        }

        if !c.initial_algorithms.is_empty() {
            self.marker("initial algorithm");
            for stmt in &c.initial_algorithms {
                self.line(&format!("{stmt};"));
            }
        }
        if !c.algorithms.is_empty() {
            self.marker("algorithm");
            for stmt in &c.algorithms {
                self.line(&format!("{stmt};"));
            }
        }
    }

    fn connection(&mut self, _model: &Model, connection: &Connection) {
        let left = end_text(&connection.source);
        let right = end_text(&connection.target);
        self.line(&format!("connect ({left}, {right});"));
    }

    // ------------------------------------------------------------------
    // plumbing
    // ------------------------------------------------------------------

    fn line(&mut self, text: &str) {
        self.out.push_str(&self.indent);
        self.out.push_str(text);
        self.out.push_str(EOL);
    }

    /// Section keyword, printed at the same indent as the body it opens.
    fn marker(&mut self, keyword: &str) {
        self.line(keyword);
    }
}

/// Write an emitted document to disk, byte for byte.
pub fn write_document(path: &Path, text: &str) -> BridgeResult<()> {
    std::fs::write(path, text.as_bytes())?;
    Ok(())
}

fn end_text(end: &ConnectionEnd) -> String {
    match (&end.part, &end.port) {
        (Some(part), Some(port)) => format!("{part}.{port}"),
        (Some(part), None) => part.to_string(),
        (None, Some(port)) => port.to_string(),
        (None, None) => String::new(),
    }
}

fn join(items: &[smol_str::SmolStr], sep: &str) -> String {
    items
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Append the modification list, flattening one level of dot-nested
/// modifications: once a value opens a parenthesized sub-modification,
/// later entries targeting `that.anything` are already inside it and are
/// suppressed.
fn push_modifications(line: &mut String, modifications: &[String]) {
    if modifications.is_empty() {
        return;
    }
    let mut kept: Vec<&str> = Vec::new();
    let mut nested_lhs: Option<String> = None;
    for text in modifications {
        let lhs = text
            .split(['=', '('])
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if let Some(prefix) = &nested_lhs {
            if lhs.starts_with(&format!("{prefix}.")) {
                continue;
            }
        }
        if text.contains('(') {
            nested_lhs = Some(lhs.to_string());
        }
        kept.push(text);
    }
    if kept.is_empty() {
        return;
    }
    line.push('(');
    line.push_str(&kept.join(", "));
    line.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::QualifiedName;
    use crate::model::{Causality, Declaration, Transport, Variability};

    fn container(name: &str, restriction: Restriction) -> Container {
        Container::new(QualifiedName::from_graph(name), restriction)
    }

    fn value_property(name: &str) -> Component {
        Component::value_property(
            Declaration::named(name, Some(TypeRef::Real)),
            Variability::Continuous,
            None,
            None,
            None,
        )
    }

    #[test]
    fn plain_value_property_prints_bare() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Model), None);
        model.get_mut(m).components.push(value_property("x"));
        let text = ExportSession::new().emit(&model, m);
        assert_eq!(text, "model M\r\n\tReal x;\r\nend M;\r\n");
    }

    #[test]
    fn final_parameter_prints_both_prefixes() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Model), None);
        let mut decl = Declaration::named("x", Some(TypeRef::Real));
        decl.is_final = true;
        model.get_mut(m).components.push(Component::value_property(
            decl,
            Variability::Parameter,
            None,
            None,
            None,
        ));
        let text = ExportSession::new().emit(&model, m);
        assert!(text.contains("\tfinal parameter Real x;\r\n"));
    }

    #[test]
    fn connections_share_the_equation_section() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Model), None);
        {
            let c = model.get_mut(m);
            c.equations.push("x = 1".to_string());
            c.connections.push(Connection {
                source: ConnectionEnd::part_port("a", "p"),
                target: ConnectionEnd::part_port("b", "q"),
            });
        }
        let text = ExportSession::new().emit(&model, m);
        assert_eq!(text.matches("equation\r\n").count(), 1);
        // the section keyword shares the body indent
        assert!(text.contains("\tequation\r\n\tx = 1;\r\n"));
        assert!(text.contains("\tconnect (a.p, b.q);\r\n"));
    }

    #[test]
    fn connection_without_equations_still_opens_the_section() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Model), None);
        model.get_mut(m).connections.push(Connection {
            source: ConnectionEnd::port("p"),
            target: ConnectionEnd::part_port("b", "q"),
        });
        let text = ExportSession::new().emit(&model, m);
        assert!(text.contains("\tequation\r\n\tconnect (p, b.q);\r\n"));
    }

    #[test]
    fn protected_members_follow_a_single_marker() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Model), None);
        {
            let c = model.get_mut(m);
            c.components.push(value_property("pub_x"));
            let mut hidden = Declaration::named("hidden", Some(TypeRef::Integer));
            hidden.visibility = Visibility::Protected;
            c.components.push(Component::value_property(
                hidden,
                Variability::Continuous,
                None,
                None,
                None,
            ));
        }
        let text = ExportSession::new().emit(&model, m);
        let marker = text.find("\tprotected\r\n").unwrap();
        assert!(text.find("Real pub_x;").unwrap() < marker);
        assert!(text.find("Integer hidden;").unwrap() > marker);
    }

    #[test]
    fn enumeration_prints_as_type_alias() {
        let mut model = Model::new();
        let e = model.insert(container("Color", Restriction::Enumeration), None);
        model.get_mut(e).literals.extend(["red".into(), "green".into()]);
        let text = ExportSession::new().emit(&model, e);
        assert_eq!(
            text,
            "type Color = enumeration(\r\n\tred,\r\n\tgreen\r\n);\r\n"
        );
    }

    #[test]
    fn short_definition_suppresses_end() {
        let mut model = Model::new();
        let t = model.insert(container("Voltage", Restriction::Type), None);
        model.get_mut(t).generalizations.push(crate::model::Generalization {
            base: Some(TypeRef::Real),
            base_name: QualifiedName::from_graph("Real"),
            is_short_definition: true,
            modifications: vec!["unit = \"V\"".to_string()],
            causality: None,
            array_size: Vec::new(),
        });
        let text = ExportSession::new().emit(&model, t);
        assert_eq!(text, "type Voltage = Real(unit = \"V\");\r\n");
    }

    #[test]
    fn external_clause_prints_language_body_and_libraries() {
        let mut model = Model::new();
        let f = model.insert(container("Mult", Restriction::Function), None);
        {
            let c = model.get_mut(f);
            c.components.push(Component::parameter(
                Declaration::named("u", Some(TypeRef::Real)),
                Some(Causality::Input),
            ));
            c.external = Some(crate::model::ExternalFunction {
                language: "C".to_string(),
                body: "y = fmult(u)".to_string(),
                libraries: vec!["fmath".to_string(), "m".to_string()],
            });
        }
        let text = ExportSession::new().emit(&model, f);
        assert!(text.contains("\texternal \"C\" y = fmult(u);\r\n"));
        assert!(text.contains("\tannotation(Library=\"fmath,m\");\r\n"));
    }

    #[test]
    fn emission_is_idempotent() {
        let mut model = Model::new();
        let pkg = model.insert(container("P", Restriction::Package), None);
        let m = model.insert(container("P::M", Restriction::Model), Some(pkg));
        model.get_mut(m).components.push(value_property("x"));
        let mut session = ExportSession::new();
        let first = session.emit(&model, pkg);
        let second = session.emit(&model, pkg);
        assert_eq!(first, second);
        assert!(first.contains("\tmodel M\r\n\t\tReal x;\r\n\tend M;\r\n"));
    }

    #[test]
    fn flow_and_causality_prefixes_order() {
        let mut model = Model::new();
        let m = model.insert(container("M", Restriction::Connector), None);
        model.get_mut(m).components.push(Component::value_property(
            Declaration::named("i", Some(TypeRef::Real)),
            Variability::Continuous,
            Some(Causality::Input),
            Some(Transport::Flow),
            None,
        ));
        let text = ExportSession::new().emit(&model, m);
        assert!(text.contains("\tflow input Real i;\r\n"));
    }

    #[test]
    fn nested_modifications_are_suppressed_once_parenthesized() {
        let mut line = String::new();
        push_modifications(
            &mut line,
            &[
                "T(min = 0, max = 1)".to_string(),
                "T.start = 20".to_string(),
                "k = 5".to_string(),
            ],
        );
        assert_eq!(line, "(T(min = 0, max = 1), k = 5)");
    }
}
