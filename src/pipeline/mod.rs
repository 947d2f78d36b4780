/*!
 * Migration pipelines
 *
 * A pipeline is a fixed, ordered list of actions built for a profile. Order
 * follows content dependencies: users before groups, projects before the
 * content that lives in them, content before tasks that target it.
 *
 * [`Migrator`] is the entry point: it seeds the manifest from an earlier run,
 * builds the per-run context, runs the pipeline and persists the manifest.
 */

mod action;
mod runner;

pub use action::{ActionResult, ActionStatus, MigrateContentAction, MigrationAction, PreflightAction};
pub use runner::PipelineRunner;

use crate::config::MigrationConfig;
use crate::content::{ContentItem, DataSource, ExtractRefreshTask, Group, Project, User, Workbook};
use crate::context::MigrationContext;
use crate::endpoint::Endpoints;
use crate::error::{Result, EXIT_FATAL, EXIT_PARTIAL, EXIT_SUCCESS};
use crate::extensions::ExtensionRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siteport_core_manifest::{ContentType, Manifest};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Which action sequence a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineProfile {
    /// Every supported content type
    #[default]
    ServerToCloud,
    /// Users and groups only
    IdentityOnly,
}

impl PipelineProfile {
    /// Content types the profile migrates, in pipeline order
    pub fn content_types(&self) -> Vec<ContentType> {
        match self {
            PipelineProfile::ServerToCloud => vec![
                User::CONTENT_TYPE,
                Group::CONTENT_TYPE,
                Project::CONTENT_TYPE,
                DataSource::CONTENT_TYPE,
                Workbook::CONTENT_TYPE,
                ExtractRefreshTask::CONTENT_TYPE,
            ],
            PipelineProfile::IdentityOnly => vec![User::CONTENT_TYPE, Group::CONTENT_TYPE],
        }
    }
}

impl fmt::Display for PipelineProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineProfile::ServerToCloud => write!(f, "server-to-cloud"),
            PipelineProfile::IdentityOnly => write!(f, "identity-only"),
        }
    }
}

/// Ordered actions for a profile
pub fn build_actions(profile: PipelineProfile) -> Vec<Box<dyn MigrationAction>> {
    let mut actions: Vec<Box<dyn MigrationAction>> = vec![
        Box::new(PreflightAction::new(profile.content_types())),
        Box::new(MigrateContentAction::<User>::new()),
        Box::new(MigrateContentAction::<Group>::new()),
    ];
    if profile == PipelineProfile::ServerToCloud {
        actions.push(Box::new(MigrateContentAction::<Project>::new()));
        actions.push(Box::new(MigrateContentAction::<DataSource>::new()));
        actions.push(Box::new(MigrateContentAction::<Workbook>::new()));
        actions.push(Box::new(MigrateContentAction::<ExtractRefreshTask>::new()));
    }
    actions
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct MigrationResult {
    /// Status of the last action that ran, or Failed if the manifest could not be saved
    pub status: ActionStatus,
    pub actions: Vec<ActionResult>,
    pub manifest: Arc<Manifest>,
    pub started_utc: DateTime<Utc>,
    pub finished_utc: DateTime<Utc>,
    /// Set when the manifest could not be written to `manifest_path`
    pub save_error: Option<String>,
}

impl MigrationResult {
    fn from_actions(actions: Vec<ActionResult>, manifest: Arc<Manifest>, started_utc: DateTime<Utc>) -> Self {
        let status = actions
            .last()
            .map(|a| a.status)
            .unwrap_or(ActionStatus::Succeeded);
        Self {
            status,
            actions,
            manifest,
            started_utc,
            finished_utc: Utc::now(),
            save_error: None,
        }
    }

    /// Wall-clock time of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_utc - self.started_utc
    }

    pub fn has_item_failures(&self) -> bool {
        self.actions
            .iter()
            .filter_map(|a| a.content.as_ref())
            .any(|c| c.failed > 0)
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Succeeded && !self.has_item_failures()
    }

    /// Process exit code for the run
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ActionStatus::Failed => EXIT_FATAL,
            ActionStatus::Canceled => EXIT_PARTIAL,
            ActionStatus::Succeeded if self.has_item_failures() => EXIT_PARTIAL,
            ActionStatus::Succeeded => EXIT_SUCCESS,
        }
    }
}

/// Entry point for one migration run
pub struct Migrator {
    config: MigrationConfig,
    endpoints: Endpoints,
    extensions: ExtensionRegistry,
}

impl Migrator {
    pub fn new(config: MigrationConfig, endpoints: Endpoints, extensions: ExtensionRegistry) -> Self {
        Self {
            config,
            endpoints,
            extensions,
        }
    }

    /// Run the configured profile, resuming from `previous_manifest_path` if set
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationResult> {
        let previous = match &self.config.previous_manifest_path {
            Some(path) => {
                info!(path = %path.display(), "Loading previous manifest");
                Some(Manifest::load(path)?)
            }
            None => None,
        };
        self.execute(previous.as_ref(), cancel).await
    }

    pub async fn execute(
        &self,
        previous: Option<&Manifest>,
        cancel: CancellationToken,
    ) -> Result<MigrationResult> {
        self.execute_with(&PipelineRunner::for_profile(self.config.profile), previous, cancel)
            .await
    }

    /// Run an explicit pipeline against a fresh or seeded manifest
    pub async fn execute_with(
        &self,
        runner: &PipelineRunner,
        previous: Option<&Manifest>,
        cancel: CancellationToken,
    ) -> Result<MigrationResult> {
        self.config.validate()?;
        let started_utc = Utc::now();

        let plan_id = Uuid::new_v4();
        let manifest = Arc::new(match previous {
            Some(previous) => Manifest::seeded_from(plan_id, previous),
            None => Manifest::new(plan_id),
        });
        info!(
            plan_id = %plan_id,
            profile = %self.config.profile,
            seeded = previous.is_some(),
            actions = runner.action_names().len(),
            "Starting migration"
        );

        let ctx = MigrationContext::new(
            self.config.clone(),
            manifest.clone(),
            self.endpoints.clone(),
            self.extensions.clone(),
            cancel,
        );
        let actions = runner.run(&ctx).await;

        for action in actions.iter().filter(|a| !a.is_success()) {
            for e in &action.errors {
                manifest.add_error(format!("{}: {}", action.action, e));
            }
        }

        let mut result = MigrationResult::from_actions(actions, manifest, started_utc);
        if let Some(path) = &self.config.manifest_path {
            match result.manifest.save(path) {
                Ok(()) => info!(path = %path.display(), "Manifest saved"),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to save manifest");
                    let message = format!("manifest save to {} failed: {}", path.display(), e);
                    result.manifest.add_error(message.clone());
                    result.status = ActionStatus::Failed;
                    result.save_error = Some(message);
                }
            }
        }

        if result.is_success() {
            info!(plan_id = %plan_id, elapsed_ms = result.duration().num_milliseconds(), "Migration complete");
        } else {
            warn!(
                plan_id = %plan_id,
                status = %result.status,
                elapsed_ms = result.duration().num_milliseconds(),
                "Migration finished with problems"
            );
        }
        Ok(result)
    }
}
