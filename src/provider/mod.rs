//! Dependency providers
//!
//! A provider binds to one named dependency slot and is handed each resolved
//! dependency of that slot. Providers may emit derived artifacts into other
//! slots, publish canonical tables and schedule work for the end of the run.
//!
//! Two roles are designated: exactly one intermediate-mappings provider and
//! exactly one mappings provider must be registered for a run.

mod classpath;
mod intermediate;
mod mappings;
mod registry;

pub use classpath::ModClasspathProvider;
pub use intermediate::{IntermediateMappingsProvider, MappingsDependency};
pub use mappings::MappingsProvider;
pub use registry::{ProviderRegistry, RegisteredProvider};

use crate::context::BuildContext;
use crate::error::ForgeResult;
use crate::orchestrator::{DeferredAction, DeferredQueue};
use crate::resolver::ResolvedDependency;
use crate::store::TableIdentity;
use crate::table::{self, MappingTable};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::path::PathBuf;

/// Well-known slot keys
pub mod slots {
    /// Intermediate mapping tables, merged into one canonical table
    pub const INTERMEDIATE_MAPPINGS: &str = "intermediateMappings";
    /// The project's mapping table
    pub const MAPPINGS: &str = "mappings";
    /// Packaged canonical tables produced during the run
    pub const MAPPINGS_FINAL: &str = "mappingsFinal";
    /// Mod classpath scanned for installer metadata
    pub const MOD_COMPILE_CLASSPATH: &str = "modCompileClasspath";
}

/// Designated role of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    Generic,
    Mappings,
    IntermediateMappings,
}

/// Slot a provider binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBinding {
    pub key: String,
    /// Whether the slot may hold more than one dependency
    pub allow_multiple: bool,
}

impl SlotBinding {
    pub fn single(key: &str) -> Self {
        Self {
            key: key.to_string(),
            allow_multiple: false,
        }
    }

    pub fn multiple(key: &str) -> Self {
        Self {
            key: key.to_string(),
            allow_multiple: true,
        }
    }
}

/// A canonical table produced during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTable {
    pub identity: TableIdentity,
    pub role: ProviderRole,
    /// Slot whose dependencies produced the table
    pub slot: String,
    /// Canonical tiny file in the store
    pub table: PathBuf,
    /// Packaged jar holding the table
    pub artifact: PathBuf,
    pub namespaces: Vec<String>,
}

impl CanonicalTable {
    /// Parse the canonical table file
    pub async fn load(&self) -> ForgeResult<MappingTable> {
        table::read_table(&self.table).await
    }
}

/// Artifacts and tables produced while a run is in progress
#[derive(Debug, Default)]
pub struct RunOutputs {
    emitted: IndexMap<String, Vec<ResolvedDependency>>,
    canonical: IndexMap<TableIdentity, CanonicalTable>,
}

impl RunOutputs {
    /// Dependencies emitted into `slot`
    pub fn emitted(&self, slot: &str) -> &[ResolvedDependency] {
        self.emitted.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    /// Canonical tables in publication order
    pub fn canonical_tables(&self) -> impl Iterator<Item = &CanonicalTable> {
        self.canonical.values()
    }

    pub fn canonical_table(&self, identity: &TableIdentity) -> Option<&CanonicalTable> {
        self.canonical.get(identity)
    }

    /// The canonical intermediate table, once finalized
    pub fn intermediate(&self) -> Option<&CanonicalTable> {
        self.canonical
            .values()
            .find(|t| t.role == ProviderRole::IntermediateMappings)
    }
}

/// What a provider may touch while handling a dependency
pub struct ProvideContext<'a> {
    pub build: &'a BuildContext,
    outputs: &'a mut RunOutputs,
    deferred: &'a mut DeferredQueue,
}

impl<'a> ProvideContext<'a> {
    pub(crate) fn new(
        build: &'a BuildContext,
        outputs: &'a mut RunOutputs,
        deferred: &'a mut DeferredQueue,
    ) -> Self {
        Self {
            build,
            outputs,
            deferred,
        }
    }

    /// Append a derived dependency to `slot`, after its declared ones
    pub fn emit(&mut self, slot: &str, dependency: ResolvedDependency) {
        self.outputs
            .emitted
            .entry(slot.to_string())
            .or_default()
            .push(dependency);
    }

    /// Make a canonical table visible to later providers and the caller
    pub fn publish(&mut self, table: CanonicalTable) {
        self.outputs.canonical.insert(table.identity.clone(), table);
    }

    /// Queue an action to run after every slot is processed
    pub fn schedule(&mut self, action: DeferredAction) {
        self.deferred.push(action);
    }

    pub fn outputs(&self) -> &RunOutputs {
        self.outputs
    }
}

/// Object-safe downcasting for registered providers
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A pluggable handler for one dependency slot
#[async_trait]
pub trait DependencyProvider: AsAny + Send + Sync {
    /// Unique tag of the provider type
    fn kind(&self) -> &'static str;

    /// Designated role, if any
    fn role(&self) -> ProviderRole {
        ProviderRole::Generic
    }

    /// Slot this provider consumes
    fn bind_slot(&self) -> SlotBinding;

    /// Drop state kept from a previous run. Called before every run.
    fn reset(&mut self) {}

    /// Handle one resolved dependency of the bound slot
    async fn provide(
        &mut self,
        dependency: &ResolvedDependency,
        ctx: &mut ProvideContext<'_>,
    ) -> ForgeResult<()>;

    /// Called once after every dependency of the slot was provided.
    /// Only invoked for the intermediate-mappings provider.
    async fn finalize(&mut self, _ctx: &mut ProvideContext<'_>) -> ForgeResult<()> {
        Ok(())
    }
}
