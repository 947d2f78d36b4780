//! Pipeline steps

use crate::content::ContentItem;
use crate::context::MigrationContext;
use crate::migrator::ContentMigrationResult;
use async_trait::async_trait;
use serde::Serialize;
use siteport_core_manifest::ContentType;
use std::fmt;
use std::marker::PhantomData;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Succeeded,
    Failed,
    Canceled,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Succeeded => write!(f, "succeeded"),
            ActionStatus::Failed => write!(f, "failed"),
            ActionStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Outcome of one action, handed to action-completed hooks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: String,
    pub status: ActionStatus,
    /// When false the runner stops after this action
    pub perform_next_action: bool,
    pub errors: Vec<String>,
    pub content: Option<ContentMigrationResult>,
}

impl ActionResult {
    pub fn succeeded<S: Into<String>>(action: S) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Succeeded,
            perform_next_action: true,
            errors: Vec::new(),
            content: None,
        }
    }

    pub fn failed<S: Into<String>>(action: S, errors: Vec<String>) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Failed,
            perform_next_action: false,
            errors,
            content: None,
        }
    }

    pub fn canceled<S: Into<String>>(action: S) -> Self {
        Self {
            action: action.into(),
            status: ActionStatus::Canceled,
            perform_next_action: false,
            errors: Vec::new(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: ContentMigrationResult) -> Self {
        if self.errors.is_empty() {
            self.errors = content.errors.clone();
        }
        self.content = Some(content);
        self
    }

    /// Stop the pipeline after this action regardless of status
    pub fn stop(mut self) -> Self {
        self.perform_next_action = false;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Succeeded
    }
}

/// One step of a migration pipeline
#[async_trait]
pub trait MigrationAction: Send + Sync {
    fn name(&self) -> String;

    async fn execute(&self, ctx: &MigrationContext) -> ActionResult;
}

/// Checks collaborators for every content type the pipeline will migrate
///
/// Content types excluded by configuration are disabled in the run's
/// capabilities instead of being checked.
pub struct PreflightAction {
    content_types: Vec<ContentType>,
}

impl PreflightAction {
    pub fn new(content_types: Vec<ContentType>) -> Self {
        Self { content_types }
    }
}

#[async_trait]
impl MigrationAction for PreflightAction {
    fn name(&self) -> String {
        "preflight".to_string()
    }

    async fn execute(&self, ctx: &MigrationContext) -> ActionResult {
        let endpoints = ctx.endpoints();
        let mut errors = Vec::new();

        for content_type in &self.content_types {
            if !ctx.config().includes(content_type) {
                ctx.capabilities().disable(content_type);
                continue;
            }
            if !endpoints.source.has_listing(content_type) {
                errors.push(format!("no source listing registered for {}", content_type));
            }
            if !endpoints.destination.has_listing(content_type) {
                errors.push(format!("no destination listing registered for {}", content_type));
            }
            if !endpoints.destination.has_publisher(content_type) {
                errors.push(format!("no destination publisher registered for {}", content_type));
            }
        }

        if errors.is_empty() {
            info!(
                content_types = self.content_types.len(),
                disabled = ctx.capabilities().disabled().len(),
                "Preflight passed"
            );
            ActionResult::succeeded(self.name())
        } else {
            for e in &errors {
                error!(error = %e, "Preflight check failed");
            }
            ActionResult::failed(self.name(), errors)
        }
    }
}

/// Migrates every item of one content type
pub struct MigrateContentAction<T> {
    _content: PhantomData<fn() -> T>,
}

impl<T: ContentItem> MigrateContentAction<T> {
    pub fn new() -> Self {
        Self {
            _content: PhantomData,
        }
    }
}

impl<T: ContentItem> Default for MigrateContentAction<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: ContentItem> MigrationAction for MigrateContentAction<T> {
    fn name(&self) -> String {
        format!("migrate {}", T::CONTENT_TYPE)
    }

    async fn execute(&self, ctx: &MigrationContext) -> ActionResult {
        let migrator = match ctx.content_migrator::<T>() {
            Ok(migrator) => migrator,
            Err(e) => return ActionResult::failed(self.name(), vec![e.to_string()]),
        };

        match migrator.migrate(ctx).await {
            Ok(content) if ctx.is_cancelled() => ActionResult::canceled(self.name()).with_content(content),
            Ok(content) => {
                if content.failed > 0 {
                    warn!(
                        content_type = %T::CONTENT_TYPE,
                        failed = content.failed,
                        "Some items failed to migrate"
                    );
                }
                ActionResult::succeeded(self.name()).with_content(content)
            }
            Err(e) if e.is_canceled() => ActionResult::canceled(self.name()),
            Err(e) => {
                error!(content_type = %T::CONTENT_TYPE, category = %e.category(), error = %e, "Content migration failed");
                ActionResult::failed(self.name(), vec![e.to_string()])
            }
        }
    }
}
