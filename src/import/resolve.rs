//! The single extra resolution sweep and its advisory report.
//!
//! Order matters: generalizations first (component kind classification
//! reads the base chain), then components (connection endpoints need
//! attached components), then connections. There is exactly one sweep;
//! whatever it cannot resolve is reported and left alone.

use tracing::warn;

use crate::error::BridgeResult;
use crate::import::ImportSession;
use crate::protocol::Compiler;

// ============================================================================
// REPORT
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedComponent {
    pub name: String,
    pub type_name: String,
    pub owner: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedConnection {
    pub text: String,
    pub owner: String,
}

/// What the final sweep could not resolve.
///
/// Advisory output for the operator: an import with leftovers still
/// succeeds, the graph just has gaps where these references would attach.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Owners with at least one unresolved base, by qualified name.
    pub unresolved_generalizations: Vec<String>,
    pub unresolved_components: Vec<UnresolvedComponent>,
    pub unresolved_connections: Vec<UnresolvedConnection>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved_generalizations.is_empty()
            && self.unresolved_components.is_empty()
            && self.unresolved_connections.is_empty()
    }
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return writeln!(f, "import completed with no unresolved references");
        }
        for owner in &self.unresolved_generalizations {
            writeln!(f, "unresolved generalization(s) on {owner}")?;
        }
        for c in &self.unresolved_components {
            writeln!(
                f,
                "unresolved component {} : {} in {}",
                c.name, c.type_name, c.owner
            )?;
        }
        for c in &self.unresolved_connections {
            writeln!(f, "unresolved connection `{}` in {}", c.text, c.owner)?;
        }
        Ok(())
    }
}

// ============================================================================
// SWEEP
// ============================================================================

impl<C: Compiler> ImportSession<C> {
    /// One extra attempt per deferred collection, then the report.
    pub(super) fn sweep(&mut self) -> BridgeResult<ImportReport> {
        self.last_traversal = true;
        let mut report = ImportReport::default();

        let owners = std::mem::take(&mut self.unresolved_generalization_owners);
        for owner in owners {
            if !self.import_generalizations(owner)? {
                let qname = self.model.get(owner).qname.to_string();
                warn!(owner = %qname, "generalization still unresolved after sweep");
                report.unresolved_generalizations.push(qname);
            }
        }

        let pending = std::mem::take(&mut self.pending_components);
        for (_, item) in pending {
            let name = item.data.name.clone();
            let type_name = item.data.type_qname.clone();
            let owner = self.model.get(item.owner).qname.to_string();
            if !self.attach_component(item)? {
                warn!(
                    component = %name,
                    ty = %type_name,
                    owner = %owner,
                    "component type still unresolved after sweep"
                );
                report.unresolved_components.push(UnresolvedComponent {
                    name,
                    type_name,
                    owner,
                });
            }
        }

        let queued = std::mem::take(&mut self.pending_connections);
        for connection in queued {
            if !self.try_resolve_connection(connection.owner, &connection.text) {
                let owner = self.model.get(connection.owner).qname.to_string();
                warn!(
                    connection = %connection.text,
                    owner = %owner,
                    "connection still unresolved after sweep"
                );
                report.unresolved_connections.push(UnresolvedConnection {
                    text: connection.text,
                    owner,
                });
            }
        }

        Ok(report)
    }
}
