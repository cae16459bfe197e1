//! Mod classpath provider
//!
//! Records the mod classpath and schedules installer discovery over it once
//! the whole run has been processed.

use super::{slots, DependencyProvider, ProvideContext, SlotBinding};
use crate::error::ForgeResult;
use crate::orchestrator::DeferredAction;
use crate::resolver::ResolvedDependency;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ModClasspathProvider {
    seen: Vec<String>,
}

impl ModClasspathProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates handled so far, in order
    pub fn coordinates(&self) -> &[String] {
        &self.seen
    }
}

#[async_trait]
impl DependencyProvider for ModClasspathProvider {
    fn kind(&self) -> &'static str {
        "mod-classpath"
    }

    fn bind_slot(&self) -> SlotBinding {
        SlotBinding::multiple(slots::MOD_COMPILE_CLASSPATH)
    }

    fn reset(&mut self) {
        self.seen.clear();
    }

    async fn provide(
        &mut self,
        dependency: &ResolvedDependency,
        ctx: &mut ProvideContext<'_>,
    ) -> ForgeResult<()> {
        debug!("Mod classpath entry {}", dependency);
        if self.seen.is_empty() {
            ctx.schedule(DeferredAction::DiscoverInstaller {
                slot: slots::MOD_COMPILE_CLASSPATH.to_string(),
            });
        }
        self.seen.push(dependency.coordinate());
        Ok(())
    }
}
