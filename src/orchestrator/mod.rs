//! Run orchestration
//!
//! Drives registered providers through their slots in a fixed order:
//!
//! 1. The intermediate-mappings slot, then `finalize` on its provider
//! 2. Every other slot, in first-registration order
//! 3. Deferred actions, in the order they were scheduled
//!
//! A slot's dependencies are the resolver's declarations followed by any
//! artifacts emitted into it earlier in the same run.

mod deferred;

pub use deferred::{DeferredAction, DeferredQueue};

use crate::context::BuildContext;
use crate::error::{ForgeError, ForgeResult};
use crate::provider::{
    CanonicalTable, DependencyProvider, ProvideContext, ProviderRegistry, ProviderRole,
    RunOutputs,
};
use crate::resolver::DependencyResolver;
use crate::store::TableIdentity;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

/// One `provide` call made during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvideCall {
    pub slot: String,
    pub coordinate: String,
    pub provider: &'static str,
}

/// Everything a run did, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub calls: Vec<ProvideCall>,
    pub deferred: Vec<DeferredAction>,
    pub canonical: Vec<CanonicalTable>,
}

/// Providers sharing one slot key
#[derive(Debug)]
struct SlotGroup {
    key: String,
    allow_multiple: bool,
    members: Vec<usize>,
}

/// Group providers by slot in first-seen order. A slot accepts several
/// dependencies when any of its providers does.
fn partition(registry: &ProviderRegistry) -> Vec<SlotGroup> {
    let mut groups: IndexMap<&str, SlotGroup> = IndexMap::new();
    for (index, entry) in registry.iter().enumerate() {
        let binding = entry.binding();
        let group = groups
            .entry(binding.key.as_str())
            .or_insert_with(|| SlotGroup {
                key: binding.key.clone(),
                allow_multiple: false,
                members: Vec::new(),
            });
        group.allow_multiple |= binding.allow_multiple;
        group.members.push(index);
    }
    groups.into_values().collect()
}

/// Owns the providers and the build context of one project
pub struct Orchestrator {
    registry: ProviderRegistry,
    context: BuildContext,
    outputs: RunOutputs,
}

impl Orchestrator {
    pub fn new(context: BuildContext) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            context,
            outputs: RunOutputs::default(),
        }
    }

    /// Register a provider; see [`ProviderRegistry::register`]
    pub fn register<P>(&mut self, provider: P) -> ForgeResult<&mut P>
    where
        P: DependencyProvider + 'static,
    {
        self.registry.register(provider)
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn outputs(&self) -> &RunOutputs {
        &self.outputs
    }

    /// Canonical table produced for `identity` by the last run
    pub fn canonical_table(&self, identity: &TableIdentity) -> Option<&CanonicalTable> {
        self.outputs.canonical_table(identity)
    }

    /// Run every slot and deferred action. Each call starts from fresh
    /// provider state, so repeated runs over the same inputs agree.
    pub async fn resolve_dependencies(
        &mut self,
        resolver: &dyn DependencyResolver,
    ) -> ForgeResult<RunReport> {
        info!(":setting up dependencies");
        self.outputs = RunOutputs::default();
        self.context.clear_installer();
        self.registry.reset_all();

        let intermediate = designated(
            &self.registry,
            ProviderRole::IntermediateMappings,
            "intermediate mappings",
        )?;
        designated(&self.registry, ProviderRole::Mappings, "mappings")?;

        let intermediate_slot = self
            .registry
            .get(intermediate)
            .map(|entry| entry.binding().key.clone())
            .ok_or_else(|| ForgeError::Internal("intermediate provider vanished".to_string()))?;

        let (first, rest): (Vec<SlotGroup>, Vec<SlotGroup>) = partition(&self.registry)
            .into_iter()
            .partition(|group| group.key == intermediate_slot);

        let mut queue = DeferredQueue::default();
        let mut report = RunReport::default();
        let mut run = GroupRun {
            registry: &mut self.registry,
            build: &self.context,
            outputs: &mut self.outputs,
            queue: &mut queue,
            resolver,
            report: &mut report,
        };

        for group in &first {
            run.group(group)
                .await
                .map_err(|e| ForgeError::slot_failed(&group.key, e))?;
        }
        run.finalize(intermediate)
            .await
            .map_err(|e| ForgeError::slot_failed(&intermediate_slot, e))?;

        for group in &rest {
            run.group(group).await?;
        }

        for action in queue.iter() {
            debug!("Running deferred action {}", action.name());
            action
                .execute(&self.context, resolver, &self.outputs)
                .await?;
            report.deferred.push(action.clone());
        }

        report.canonical = self.outputs.canonical_tables().cloned().collect();
        Ok(report)
    }
}

/// Index of the single provider holding `role`
fn designated(registry: &ProviderRegistry, role: ProviderRole, what: &str) -> ForgeResult<usize> {
    match registry.with_role(role).as_slice() {
        [index] => Ok(*index),
        [] => Err(ForgeError::Configuration(format!(
            "no {} provider is registered",
            what
        ))),
        many => Err(ForgeError::Configuration(format!(
            "{} {} providers are registered, expected one",
            many.len(),
            what
        ))),
    }
}

/// Borrowed state for processing slot groups
struct GroupRun<'a> {
    registry: &'a mut ProviderRegistry,
    build: &'a BuildContext,
    outputs: &'a mut RunOutputs,
    queue: &'a mut DeferredQueue,
    resolver: &'a dyn DependencyResolver,
    report: &'a mut RunReport,
}

impl GroupRun<'_> {
    async fn group(&mut self, group: &SlotGroup) -> ForgeResult<()> {
        let mut dependencies = self.resolver.dependencies(&group.key);
        dependencies.extend(self.outputs.emitted(&group.key).iter().cloned());

        if dependencies.is_empty() {
            return Err(ForgeError::MissingDependency {
                slot: group.key.clone(),
            });
        }
        if !group.allow_multiple && dependencies.len() > 1 {
            return Err(ForgeError::Multiplicity {
                slot: group.key.clone(),
                count: dependencies.len(),
            });
        }

        for dependency in &dependencies {
            let coordinate = dependency.coordinate();
            for &index in &group.members {
                let provider = self.registry.provider_mut(index)?;
                let kind = provider.kind();
                debug!("Providing {} to '{}' ({})", coordinate, group.key, kind);

                let mut ctx =
                    ProvideContext::new(self.build, &mut *self.outputs, &mut *self.queue);
                provider
                    .provide(dependency, &mut ctx)
                    .await
                    .map_err(|e| ForgeError::provide(&coordinate, &group.key, e))?;

                self.report.calls.push(ProvideCall {
                    slot: group.key.clone(),
                    coordinate: coordinate.clone(),
                    provider: kind,
                });
            }
        }
        Ok(())
    }

    async fn finalize(&mut self, index: usize) -> ForgeResult<()> {
        let provider = self.registry.provider_mut(index)?;
        let mut ctx = ProvideContext::new(self.build, &mut *self.outputs, &mut *self.queue);
        provider.finalize(&mut ctx).await
    }
}
