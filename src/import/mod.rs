//! Graph construction from a compiler catalog.
//!
//! An [`ImportSession`] walks the catalog depth-first and rebuilds the
//! container graph. Forward references are the whole difficulty: the
//! catalog is flat and ordered, so a component's type or a connection's
//! endpoint may name a container that has not been visited yet. The
//! session therefore runs two passes:
//!
//! 1. the primary traversal creates every container and defers *all*
//!    component typing (deferring unconditionally keeps component order
//!    identical to catalog order, whether or not a type happened to be
//!    resolvable early), and
//! 2. a single extra sweep ([`resolve`]) attaches deferred components,
//!    re-attempts failed generalizations, and retries queued connections.
//!
//! Anything still unresolved after the sweep is reported, never retried
//! again.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::base::QualifiedName;
use crate::error::{BridgeError, BridgeResult};
use crate::model::{
    Causality, Component, ConnectionEnd, Container, ContainerId, Declaration, ExternalFunction,
    Generalization, Model, Restriction, Scope, Transport, TypeRef, Variability, Visibility,
};
use crate::protocol::{Compiler, ComponentData, QueryClient};
use crate::protocol::unparse;

mod resolve;

pub use resolve::{ImportReport, UnresolvedComponent, UnresolvedConnection};

/// Bus connector types that declare no ports of their own; a connection
/// end into one of these resolves roleless instead of failing.
const PORTLESS_BUS_TYPES: [&str; 2] = ["ControlBus", "AxisControlBus"];

// ============================================================================
// DEFERRED WORK
// ============================================================================

struct PendingComponent {
    data: ComponentData,
    owner: ContainerId,
    /// 1-based position in the owner's catalog reply.
    index: usize,
}

struct PendingConnection {
    owner: ContainerId,
    text: String,
}

// ============================================================================
// SESSION
// ============================================================================

/// One import operation.
///
/// Owns the query client, the model under construction, and the deferred
/// resolution collections. All collections are cleared when [`import`]
/// starts, so a session object can be reused, serially.
///
/// [`import`]: ImportSession::import
pub struct ImportSession<C> {
    client: QueryClient<C>,
    model: Model,
    /// Named-import aliases, graph form, alias -> target namespace.
    aliases: FxHashMap<String, String>,
    pending_components: IndexMap<(ContainerId, SmolStr), PendingComponent>,
    pending_connections: Vec<PendingConnection>,
    unresolved_generalization_owners: Vec<ContainerId>,
    last_traversal: bool,
}

impl<C: Compiler> ImportSession<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            client: QueryClient::new(compiler),
            model: Model::new(),
            aliases: FxHashMap::default(),
            pending_components: IndexMap::new(),
            pending_connections: Vec::new(),
            unresolved_generalization_owners: Vec::new(),
            last_traversal: false,
        }
    }

    /// Load a Modelica document into the compiler's catalog. A refused
    /// load is a hard error, with the compiler's own error text attached.
    pub fn load_document(&mut self, path: &str) -> BridgeResult<()> {
        let reply = self.client.load_file(path)?;
        if reply.trim() == "true" {
            return Ok(());
        }
        let detail = self.client.error_string()?;
        Err(BridgeError::compiler(
            format!("loadFile(\"{path}\")"),
            detail.trim().to_string(),
        ))
    }

    /// Walk the whole catalog and build the graph.
    pub fn import(mut self) -> BridgeResult<(Model, ImportReport)> {
        self.reset();
        let roots = self.client.class_names("")?;
        for name in roots {
            self.import_class(&name, None)?;
        }
        let report = self.sweep()?;
        Ok((self.model, report))
    }

    fn reset(&mut self) {
        self.model = Model::new();
        self.aliases.clear();
        self.pending_components.clear();
        self.pending_connections.clear();
        self.unresolved_generalization_owners.clear();
        self.last_traversal = false;
    }

    // ------------------------------------------------------------------
    // per-class pipeline
    // ------------------------------------------------------------------

    /// Restriction, attributes, imports, generalizations, components,
    /// nested classes, then behavior sections, recursing into nested
    /// classes before the behavior of the owner is read.
    fn import_class(&mut self, simple_name: &str, parent: Option<ContainerId>) -> BridgeResult<()> {
        let qname = match parent {
            Some(p) => self.model.get(p).qname.child(simple_name),
            None => QualifiedName::from_source(simple_name),
        };
        let query_name = qname.to_source();
        debug!(class = %query_name, "importing class");

        let restriction_word = self.client.class_restriction(&query_name)?;
        let mut restriction = match Restriction::from_keyword(restriction_word.trim()) {
            Some(r) => r,
            None => {
                warn!(class = %query_name, word = %restriction_word, "unknown restriction");
                return Ok(());
            }
        };

        let mut literals = Vec::new();
        if restriction == Restriction::Type {
            literals = self.client.enumeration_literals(&query_name)?;
            if !literals.is_empty() {
                restriction = Restriction::Enumeration;
            }
        }

        let mut container = Container::new(qname.clone(), restriction);
        container.literals = literals.iter().map(SmolStr::new).collect();
        let id = self.model.insert(container, parent);

        self.import_definition_attributes(id, &query_name, parent)?;
        self.import_imports(id, &query_name)?;
        if !self.import_generalizations(id)? && !self.unresolved_generalization_owners.contains(&id)
        {
            self.unresolved_generalization_owners.push(id);
        }
        self.import_components(id, &query_name)?;

        if restriction == Restriction::Function {
            self.import_external_function(id, &query_name)?;
        }

        for nested in self.client.class_names(&query_name)? {
            self.import_class(&nested, Some(id))?;
        }

        self.model.get_mut(id).initial_equations = self.client.initial_equations(&query_name)?;
        self.import_equations(id, &query_name)?;
        self.import_connections(id, &query_name)?;
        self.model.get_mut(id).initial_algorithms =
            self.client.initial_algorithms(&query_name)?;
        self.model.get_mut(id).algorithms = self.client.algorithms(&query_name)?;

        Ok(())
    }

    /// Fourth field of `getClassInformation` carries the partial / final /
    /// encapsulated triple; replaceability is a separate query against the
    /// enclosing class.
    fn import_definition_attributes(
        &mut self,
        id: ContainerId,
        query_name: &str,
        parent: Option<ContainerId>,
    ) -> BridgeResult<()> {
        let reply = self.client.class_information(query_name)?;
        let fields = unparse::unparse_strings(&reply);
        if fields.len() == 10 {
            let flags: Vec<&str> = unparse::strip_outer_braces(&fields[3]).split(',').collect();
            let c = self.model.get_mut(id);
            c.is_partial = flags.first().is_some_and(|f| f.trim() == "true");
            c.is_final = flags.get(1).is_some_and(|f| f.trim() == "true");
            c.is_encapsulated = flags.get(2).is_some_and(|f| f.trim() == "true");
        }
        if let Some(parent) = parent {
            let owner = self.model.get(parent).qname.to_source();
            let simple = self.model.get(id).name.clone();
            let replaceable = self.client.is_replaceable(&owner, &simple)?;
            self.model.get_mut(id).is_replaceable = replaceable;
        }
        Ok(())
    }

    /// The specification reply is a six-field tuple; field 0 carries the
    /// language, field 2 the call text. External libraries live in the
    /// `Library` named annotation, one brace list of quoted names.
    fn import_external_function(&mut self, id: ContainerId, query_name: &str) -> BridgeResult<()> {
        let reply = self.client.external_function_specification(query_name)?;
        let fields = unparse::unparse_strings(&reply);
        if fields.len() <= 5 {
            return Ok(());
        }
        let language = unparse::strip_outer_quotes(fields[0].trim()).to_string();
        let body = unparse::strip_outer_quotes(fields[2].trim()).to_string();

        let mut libraries = Vec::new();
        let annotation = self.client.named_annotation(query_name, "Library")?;
        let annotation = annotation.trim();
        if !annotation.contains("rror") && annotation != "false" {
            for lib in unparse::strip_outer_braces(annotation).split(',') {
                let lib = unparse::strip_outer_quotes(lib.trim()).replace('\n', "");
                if !lib.is_empty() {
                    libraries.push(lib);
                }
            }
        }

        self.model.get_mut(id).external = Some(ExternalFunction {
            language,
            body,
            libraries,
        });
        Ok(())
    }

    /// Named imports feed the alias table used by type lookup; qualified
    /// imports are only kept as text.
    fn import_imports(&mut self, id: ContainerId, query_name: &str) -> BridgeResult<()> {
        for reply in self.client.imports(query_name)? {
            let fields = unparse::unparse_strings(&reply);
            let field = |i: usize| {
                fields
                    .get(i)
                    .map(|f| unparse::strip_outer_quotes(f.trim()).to_string())
                    .unwrap_or_default()
            };
            let imported = field(0);
            let alias = field(1);
            let kind = field(2);
            match kind.as_str() {
                "named" => {
                    self.aliases.insert(
                        QualifiedName::from_source(&alias).as_graph().to_string(),
                        QualifiedName::from_source(&imported).as_graph().to_string(),
                    );
                    self.model
                        .get_mut(id)
                        .imports
                        .push(format!("import {alias} = {imported}"));
                }
                "qualified" => {
                    self.model.get_mut(id).imports.push(format!("import {imported}"));
                }
                other => {
                    warn!(class = %query_name, kind = %other, "unsupported import kind");
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // generalizations
    // ------------------------------------------------------------------

    /// Attempted eagerly on every visit. If any base fails to resolve the
    /// owner keeps no edges and is queued whole; a later attempt must
    /// resolve all of them to count. Returns whether every base resolved.
    fn import_generalizations(&mut self, id: ContainerId) -> BridgeResult<bool> {
        let query_name = self.model.get(id).qname.to_source();
        let bases = self.client.inherited_classes(&query_name)?;
        if bases.is_empty() {
            return Ok(true);
        }

        let is_short = self.client.is_short_definition(&query_name)?;
        let mut edges = Vec::with_capacity(bases.len());
        let mut complete = true;

        for base in &bases {
            let base_qname = QualifiedName::from_source(base.trim());
            let Some(ty) = self.lookup_type(&base_qname) else {
                complete = false;
                continue;
            };

            let mut edge = Generalization {
                base: Some(ty),
                base_name: base_qname,
                is_short_definition: is_short,
                ..Default::default()
            };
            edge.modifications = self.extends_modifications(&query_name, base)?;
            if is_short {
                edge.causality = self.short_definition_causality(&query_name)?;
                edge.array_size = self.extends_array_size(&query_name)?;
            }
            edges.push(edge);
        }

        if complete || self.last_traversal {
            // partial credit only in the final sweep; an incomplete owner
            // still lands in the report
            self.model.get_mut(id).generalizations = edges;
        }
        Ok(complete)
    }

    fn extends_modifications(
        &mut self,
        class: &str,
        base: &str,
    ) -> BridgeResult<Vec<String>> {
        let reply = self.client.extends_modifier_names(class, base)?;
        if reply.trim().is_empty() || reply.contains("rror") {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for name in unparse::unparse_strings(&reply) {
            let name = unparse::strip_outer_quotes(name.trim()).to_string();
            if name.is_empty() {
                continue;
            }
            let value = self.client.extends_modifier_value(class, base, &name)?;
            let value = value.trim();
            if value.is_empty() || value.contains("rror") || value == "false" {
                continue;
            }
            out.push(join_modification(&name, value));
        }
        Ok(out)
    }

    /// Fifth field of the short-definition base information carries the
    /// causality prefix, when the reply has its full six fields.
    fn short_definition_causality(&mut self, class: &str) -> BridgeResult<Option<Causality>> {
        let reply = self.client.short_definition_base_class_information(class)?;
        let fields = unparse::unparse_strings(&reply);
        if fields.len() == 6 {
            Ok(Causality::from_keyword(
                unparse::strip_outer_quotes(fields[4].trim()),
            ))
        } else {
            Ok(None)
        }
    }

    /// Dimensions of a short definition, read from the tail brace group of
    /// the class information reply.
    fn extends_array_size(&mut self, class: &str) -> BridgeResult<Vec<SmolStr>> {
        let reply = self.client.class_information(class)?;
        let Some(open) = reply.rfind('{') else {
            return Ok(Vec::new());
        };
        let tail = reply[open + 1..].replace(['}', '\n', '\r'], "");
        Ok(tail
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty() && *d != "none" && *d != "parameter")
            .map(SmolStr::new)
            .collect())
    }

    // ------------------------------------------------------------------
    // components
    // ------------------------------------------------------------------

    /// The primary traversal always defers, even when the type would
    /// already resolve: attaching opportunistically would make component
    /// order depend on catalog layout instead of declaration order.
    fn import_components(&mut self, id: ContainerId, query_name: &str) -> BridgeResult<()> {
        let records = self.client.components(query_name)?;
        for (i, data) in records.into_iter().enumerate() {
            let key = (id, SmolStr::new(&data.name));
            self.pending_components.insert(key, PendingComponent {
                owner: id,
                index: i + 1,
                data,
            });
        }
        Ok(())
    }

    /// Resolve a deferred component's type and attach it to its owner.
    /// Returns `false` when the type is still unknown.
    fn attach_component(&mut self, pending: PendingComponent) -> BridgeResult<bool> {
        let PendingComponent { data, owner, index } = pending;
        let type_qname = QualifiedName::from(data.type_qname.as_str());
        let Some(ty) = self.lookup_type(&type_qname) else {
            return Ok(false);
        };

        let owner_query = self.model.get(owner).qname.to_source();
        let mut decl = Declaration {
            name: SmolStr::new(&data.name),
            type_name: type_qname,
            ty: Some(ty),
            comment: (!data.comment.trim().is_empty()).then(|| data.comment.clone()),
            visibility: Visibility::from_keyword(data.visibility.trim()),
            is_final: data.is_final,
            is_replaceable: data.is_replaceable,
            array_size: data
                .array_size
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty() && *d != "none" && *d != "parameter")
                .map(SmolStr::new)
                .collect(),
            ..Default::default()
        };

        decl.modifications = self.component_modifications(&owner_query, &data.name)?;
        decl.declaration_equation = self.declaration_equation(&owner_query, &data.name)?;
        if index > 1 {
            let reply = self.client.nth_component_condition(&owner_query, index)?;
            let cond = unparse::strip_outer_quotes(reply.trim());
            if !cond.is_empty() && !cond.contains("rror") && cond != "false" {
                decl.condition = Some(cond.to_string());
            }
        }

        let causality = Causality::from_keyword(data.causality.trim());
        let scope = Scope::from_keyword(data.inner_outer.trim());
        let transport = if data.is_stream {
            Some(Transport::Stream)
        } else if data.is_flow {
            Some(Transport::Flow)
        } else {
            None
        };

        let owner_is_function = self.model.get(owner).restriction == Restriction::Function;
        let component = if owner_is_function {
            Component::parameter(decl, causality)
        } else {
            match ty {
                TypeRef::Container(target) => match self.model.get(target).restriction {
                    Restriction::Connector | Restriction::ExpandableConnector => {
                        Component::port(decl, causality)
                    }
                    Restriction::Record | Restriction::Type | Restriction::Enumeration => {
                        Component::value_property(
                            decl,
                            Variability::from_keyword(data.variability.trim()),
                            causality,
                            transport,
                            scope,
                        )
                    }
                    _ => Component::part(decl, scope),
                },
                _ => Component::value_property(
                    decl,
                    Variability::from_keyword(data.variability.trim()),
                    causality,
                    transport,
                    scope,
                ),
            }
        };
        self.model.get_mut(owner).components.push(component);
        Ok(true)
    }

    fn component_modifications(
        &mut self,
        class: &str,
        component: &str,
    ) -> BridgeResult<Vec<String>> {
        let reply = self.client.component_modifier_names(class, component)?;
        if reply.trim().is_empty() || reply.contains("rror") {
            return Ok(Vec::new());
        }
        let names = unparse::strip_outer_braces(reply.trim()).replace(' ', "");
        let mut out = Vec::new();
        for name in names.split(',').filter(|n| !n.is_empty()) {
            let value = self
                .client
                .component_modifier_value(class, &format!("{component}.{name}"))?;
            let value = value.trim();
            if value.is_empty() || value.contains("rror") || value == "false" {
                continue;
            }
            out.push(join_modification(name, value));
        }
        Ok(out)
    }

    fn declaration_equation(
        &mut self,
        class: &str,
        component: &str,
    ) -> BridgeResult<Option<String>> {
        let reply = self.client.parameter_value(class, component)?;
        let value = reply.trim();
        if value.is_empty() || value.contains("rror") || value == "false" {
            return Ok(None);
        }
        let value = unparse::replace_spec_chars(unparse::strip_outer_quotes(value));
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    // ------------------------------------------------------------------
    // behavior sections
    // ------------------------------------------------------------------

    fn import_equations(&mut self, id: ContainerId, query_name: &str) -> BridgeResult<()> {
        let equations = self.client.equations(query_name)?;
        self.model.get_mut(id).equations = equations;
        Ok(())
    }

    /// Connection texts carrying index expressions stay plain equations;
    /// the rest resolve into endpoint pairs, or queue for the final sweep.
    fn import_connections(&mut self, id: ContainerId, query_name: &str) -> BridgeResult<()> {
        for text in self.client.connections(query_name)? {
            if text.contains('[') {
                self.model.get_mut(id).equations.push(format!("connect({text})"));
                continue;
            }
            if !self.try_resolve_connection(id, &text) {
                self.pending_connections.push(PendingConnection {
                    owner: id,
                    text,
                });
            }
        }
        Ok(())
    }

    /// Resolve both connection ends against the owner. Bus leniency only
    /// applies during the final sweep.
    fn try_resolve_connection(&mut self, owner: ContainerId, text: &str) -> bool {
        let Some((left, right)) = unparse::connect_ends(text) else {
            warn!(connection = text, "malformed connection text");
            return true;
        };
        let Some(source) = self.resolve_end(owner, &left) else {
            return false;
        };
        let Some(target) = self.resolve_end(owner, &right) else {
            return false;
        };
        self.model
            .get_mut(owner)
            .connections
            .push(crate::model::Connection { source, target });
        true
    }

    fn resolve_end(&self, owner: ContainerId, name: &str) -> Option<ConnectionEnd> {
        let mut segments = name.splitn(2, '.');
        let first = segments.next()?.trim();
        match segments.next().map(str::trim) {
            // port directly on the owner
            None => self
                .model
                .component_including_inherited(owner, first)
                .map(|_| ConnectionEnd::port(first)),
            Some(port) => {
                let part = self.model.component_including_inherited(owner, first)?;
                let Some(TypeRef::Container(part_type)) = part.declaration().ty else {
                    return None;
                };
                if self.last_traversal && self.is_portless_bus(part_type) {
                    return Some(ConnectionEnd::part_only(first));
                }
                self.model
                    .component_including_inherited(part_type, port)
                    .map(|_| ConnectionEnd::part_port(first, port))
            }
        }
    }

    fn is_portless_bus(&self, ty: ContainerId) -> bool {
        let name = &self.model.get(ty).name;
        PORTLESS_BUS_TYPES.iter().any(|bus| name == bus)
    }

    // ------------------------------------------------------------------
    // type lookup
    // ------------------------------------------------------------------

    /// Builtins first, then suffix match over containers in creation
    /// order, then one retry with the leading segment substituted through
    /// the named-import alias table.
    fn lookup_type(&self, query: &QualifiedName) -> Option<TypeRef> {
        if let Some(builtin) = TypeRef::builtin(query.as_graph()) {
            return Some(builtin);
        }
        if let Some(id) = self.model.find_by_suffix(query) {
            return Some(TypeRef::Container(id));
        }
        let graph = query.as_graph();
        for (alias, target) in &self.aliases {
            let prefix = format!("{alias}::");
            if let Some(rest) = graph.strip_prefix(prefix.as_str()) {
                let substituted = QualifiedName::from_graph(format!("{target}::{rest}"));
                if let Some(id) = self.model.find_by_suffix(&substituted) {
                    return Some(TypeRef::Container(id));
                }
            }
        }
        None
    }
}

/// Concatenate a modifier name with its reply value. Values usually arrive
/// as `= expr`; a parenthesized value is a sub-modification list and glues
/// directly onto the name.
fn join_modification(name: &str, value: &str) -> String {
    let value = unparse::replace_spec_chars(value);
    if value.starts_with('(') {
        format!("{name}{value}")
    } else if value.starts_with('=') {
        format!("{name} {value}")
    } else {
        format!("{name} = {value}")
    }
}
