/*!
 * Siteport - content migration orchestration kernel
 *
 * Moves typed content (users, groups, projects, data sources, workbooks,
 * extract refresh tasks) from a source site to a destination site:
 * - Ordered pipelines of actions per migration profile
 * - Batched, bounded-concurrency item migration with isolated failures
 * - A manifest recording every item's source, destination and outcome
 * - Resumable runs seeded from an earlier manifest
 * - Compile-time checked extension points (filter, mapping, transform, hooks)
 * - Single-flight bulk reference caches and manifest-first resolution
 *
 * Wire clients for real servers plug in through the traits in [`endpoint`].
 */

pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod extensions;
pub mod logging;
pub mod migrator;
pub mod pipeline;
pub mod resolver;

pub use siteport_core_manifest as manifest;

// Re-export commonly used types
pub use cache::{BulkReferenceCache, CacheSide, LockedProjectCache, ReferenceCache};
pub use config::{LogLevel, MigrationConfig};
pub use content::{ContentItem, Dependency};
pub use context::{MigrationCapabilities, MigrationContext};
pub use endpoint::{ContentConverter, ContentListing, ContentPublisher, EndpointSet, Endpoints, Page, PageRequest};
pub use error::{MigrationError, RegistrationError, Result};
pub use extensions::{Extension, ExtensionFactory, ExtensionRegistry, ExtensionScope, GenericExtension, Hook};
pub use pipeline::{
    build_actions, ActionResult, ActionStatus, MigrationAction, MigrationResult, Migrator, PipelineProfile,
    PipelineRunner,
};
pub use resolver::ManifestReferenceResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
