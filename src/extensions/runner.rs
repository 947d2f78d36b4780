//! Chain execution

use super::{ExtensionKind, ExtensionRegistry, ExtensionScope};
use crate::context::MigrationContext;
use crate::error::{MigrationError, Result};
use tracing::{debug, warn};

/// Executes one kind's chain in registration order
pub struct ExtensionRunner<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> ExtensionRunner<'a> {
    pub fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    /// Thread `input` through every extension registered for `K`
    ///
    /// Each link is instantiated from its factory for this execution. A link
    /// returning `Some` replaces the value the next link sees. The first error
    /// aborts the chain; nothing is retried.
    pub async fn execute<K: ExtensionKind>(
        &self,
        migration: &MigrationContext,
        input: K::Context,
    ) -> Result<K::Context> {
        let links = self.registry.links::<K>();
        if links.is_empty() {
            return Ok(input);
        }

        let mut current = input;
        for (name, factory) in links {
            if migration.is_cancelled() {
                return Err(MigrationError::Canceled);
            }

            let hook = factory(migration);
            let scope = ExtensionScope::new(migration, name);
            match hook.execute(&current, &scope).await {
                Ok(Some(next)) => {
                    debug!(kind = %K::name(), extension = name, "Extension replaced context");
                    current = next;
                }
                Ok(None) => {}
                Err(source) => {
                    warn!(kind = %K::name(), extension = name, error = %source, "Extension failed");
                    return Err(MigrationError::Extension {
                        kind: K::name(),
                        extension: name,
                        source,
                    });
                }
            }
        }
        Ok(current)
    }
}
