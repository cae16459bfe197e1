//! Provider registry
//!
//! Holds at most one provider per kind tag, in registration order.

use super::{DependencyProvider, ProviderRole, SlotBinding};
use crate::error::{ForgeError, ForgeResult};
use std::collections::HashSet;
use tracing::debug;

/// A provider together with the slot it bound at registration
pub struct RegisteredProvider {
    binding: SlotBinding,
    provider: Box<dyn DependencyProvider>,
}

impl RegisteredProvider {
    pub fn binding(&self) -> &SlotBinding {
        &self.binding
    }

    pub fn kind(&self) -> &'static str {
        self.provider.kind()
    }

    pub fn role(&self) -> ProviderRole {
        self.provider.role()
    }

    pub fn provider(&self) -> &dyn DependencyProvider {
        self.provider.as_ref()
    }
}

/// Ordered, kind-unique set of providers
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<RegisteredProvider>,
    kinds: HashSet<&'static str>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider and return a handle to it.
    ///
    /// Fails with `DuplicateProvider` when a provider of the same kind is
    /// already registered; the registry is left unchanged in that case.
    pub fn register<P>(&mut self, provider: P) -> ForgeResult<&mut P>
    where
        P: DependencyProvider + 'static,
    {
        let kind = provider.kind();
        if !self.kinds.insert(kind) {
            return Err(ForgeError::DuplicateProvider { kind });
        }

        let binding = provider.bind_slot();
        debug!("Registered provider '{}' for slot '{}'", kind, binding.key);
        self.entries.push(RegisteredProvider {
            binding,
            provider: Box::new(provider),
        });

        self.entries
            .last_mut()
            .and_then(|entry| entry.provider.as_mut().as_any_mut().downcast_mut::<P>())
            .ok_or_else(|| ForgeError::Internal(format!("provider '{}' vanished", kind)))
    }

    /// The registered provider of type `P`, if any
    pub fn lookup<P: DependencyProvider + 'static>(&self) -> Option<&P> {
        self.entries
            .iter()
            .find_map(|entry| entry.provider().as_any().downcast_ref::<P>())
    }

    /// The registered provider with the given kind tag, if any
    pub fn lookup_kind(&self, kind: &str) -> Option<&dyn DependencyProvider> {
        self.entries
            .iter()
            .find(|entry| entry.kind() == kind)
            .map(RegisteredProvider::provider)
    }

    /// Providers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices of the providers holding `role`
    pub(crate) fn with_role(&self, role: ProviderRole) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.role() == role)
            .map(|(index, _)| index)
            .collect()
    }

    /// Reset every provider ahead of a run
    pub(crate) fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.provider.reset();
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&RegisteredProvider> {
        self.entries.get(index)
    }

    pub(crate) fn provider_mut(
        &mut self,
        index: usize,
    ) -> ForgeResult<&mut (dyn DependencyProvider + 'static)> {
        match self.entries.get_mut(index) {
            Some(entry) => Ok(entry.provider.as_mut()),
            None => Err(ForgeError::Internal(format!(
                "no provider at index {}",
                index
            ))),
        }
    }
}
