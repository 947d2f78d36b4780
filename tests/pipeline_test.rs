/*!
 * Pipeline flow control and extension chains
 */

mod common;

use async_trait::async_trait;
use common::*;
use siteport::content::User;
use siteport::extensions::{ActionCompletedKind, KindRegistrar, TransformerKind};
use siteport::manifest::Manifest;
use siteport::{
    ActionResult, ActionStatus, ContentItem, Extension, ExtensionFactory, ExtensionRegistry, ExtensionScope, Hook,
    MigrationAction, MigrationConfig, MigrationContext, Migrator, PipelineRunner,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Step {
    name: &'static str,
    stop: bool,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl MigrationAction for Step {
    fn name(&self) -> String {
        self.name.to_string()
    }

    async fn execute(&self, _ctx: &MigrationContext) -> ActionResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let result = ActionResult::succeeded(self.name);
        if self.stop {
            result.stop()
        } else {
            result
        }
    }
}

fn steps(stop_at: Option<usize>, runs: &Arc<AtomicUsize>) -> PipelineRunner {
    let names = ["one", "two", "three", "four", "five"];
    PipelineRunner::new(
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                Box::new(Step {
                    name,
                    stop: stop_at == Some(i + 1),
                    runs: runs.clone(),
                }) as Box<dyn MigrationAction>
            })
            .collect(),
    )
}

fn context(registry: ExtensionRegistry) -> MigrationContext {
    let source = Site::empty();
    let destination = Site::empty();
    MigrationContext::new(
        MigrationConfig::default(),
        Arc::new(Manifest::new(Uuid::new_v4())),
        endpoints(&source, &destination),
        registry,
        CancellationToken::new(),
    )
}

/// Counts action-completed calls
struct Observer {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Hook<ActionCompletedKind> for Observer {
    async fn execute(&self, _result: &ActionResult, _scope: &ExtensionScope<'_>) -> anyhow::Result<Option<ActionResult>> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

impl Extension for Observer {
    fn declare(kinds: &mut KindRegistrar<Self>) {
        kinds.kind::<ActionCompletedKind>();
    }
}

#[tokio::test]
async fn test_pipeline_stops_after_action_three_of_five() {
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(AtomicUsize::new(0));
    let mut builder = ExtensionRegistry::builder();
    let observer_seen = seen.clone();
    builder
        .add(ExtensionFactory::from_fn(move |_| Observer {
            seen: observer_seen.clone(),
        }))
        .unwrap();
    let ctx = context(builder.build());

    let results = steps(Some(3), &runs).run(&ctx).await;

    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(results.len(), 3);
    assert_eq!(results[2].action, "three");
    assert!(!results[2].perform_next_action);
    // The stopping action still reaches its hooks
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_all_actions_run_without_a_stop() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runner = steps(None, &runs);
    assert_eq!(runner.action_names(), vec!["one", "two", "three", "four", "five"]);

    let results = runner.run(&context(ExtensionRegistry::empty())).await;
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(ActionResult::is_success));
}

/// Stops the pipeline after the action it names
struct StopAfter(&'static str);

#[async_trait]
impl Hook<ActionCompletedKind> for StopAfter {
    async fn execute(&self, result: &ActionResult, _scope: &ExtensionScope<'_>) -> anyhow::Result<Option<ActionResult>> {
        if result.action == self.0 {
            return Ok(Some(result.clone().stop()));
        }
        Ok(None)
    }
}

impl Extension for StopAfter {
    fn declare(kinds: &mut KindRegistrar<Self>) {
        kinds.kind::<ActionCompletedKind>();
    }
}

#[tokio::test]
async fn test_action_completed_hook_can_stop_pipeline() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut builder = ExtensionRegistry::builder();
    builder.add(ExtensionFactory::singleton(StopAfter("two"))).unwrap();

    let results = steps(None, &runs).run(&context(builder.build())).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(results.last().unwrap().status, ActionStatus::Succeeded);
}

struct Broken;

#[async_trait]
impl Hook<ActionCompletedKind> for Broken {
    async fn execute(&self, _result: &ActionResult, _scope: &ExtensionScope<'_>) -> anyhow::Result<Option<ActionResult>> {
        anyhow::bail!("audit sink unavailable")
    }
}

impl Extension for Broken {
    fn declare(kinds: &mut KindRegistrar<Self>) {
        kinds.kind::<ActionCompletedKind>();
    }
}

#[tokio::test]
async fn test_failing_action_hook_fails_the_action() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut builder = ExtensionRegistry::builder();
    builder.add(ExtensionFactory::singleton(Broken)).unwrap();

    let results = steps(None, &runs).run(&context(builder.build())).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ActionStatus::Failed);
    assert!(results[0].errors[0].contains("audit sink unavailable"));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let runs = Arc::new(AtomicUsize::new(0));
    let ctx = context(ExtensionRegistry::empty());
    ctx.cancel_token().cancel();

    let results = steps(None, &runs).run(&ctx).await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ActionStatus::Canceled);
}

/// Transformer that records what it saw and optionally rewrites the role
struct Role {
    set: Option<&'static str>,
    seen: Arc<parking_lot::Mutex<Vec<String>>>,
}

#[async_trait]
impl Hook<TransformerKind<User>> for Role {
    async fn execute(&self, user: &User, _scope: &ExtensionScope<'_>) -> anyhow::Result<Option<User>> {
        self.seen.lock().push(user.site_role.clone());
        Ok(self.set.map(|role| User {
            site_role: format!("{}{}", user.site_role, role),
            ..user.clone()
        }))
    }
}

impl Extension for Role {
    fn declare(kinds: &mut KindRegistrar<Self>) {
        kinds.kind::<TransformerKind<User>>();
    }
}

#[tokio::test]
async fn test_chain_order_and_unchanged_results() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut builder = ExtensionRegistry::builder();
    for set in [Some("A"), None, Some("C")] {
        builder
            .add(ExtensionFactory::singleton(Role {
                set,
                seen: seen.clone(),
            }))
            .unwrap();
    }
    let ctx = context(builder.build());

    let mut start = user("alice");
    start.site_role = String::new();
    let out = ctx.run_extensions::<TransformerKind<User>>(start).await.unwrap();

    // B returned nothing, so C saw A's output
    assert_eq!(*seen.lock(), vec!["", "A", "A"]);
    assert_eq!(out.site_role, "AC");
}

#[tokio::test]
async fn test_transformer_applies_to_published_items() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut builder = ExtensionRegistry::builder();
    builder
        .add(ExtensionFactory::singleton(Role {
            set: Some("-migrated"),
            seen,
        }))
        .unwrap();
    let source = Site::with_users(vec![user("alice")]);
    let destination = Site::empty();
    let config = MigrationConfig {
        profile: siteport::PipelineProfile::IdentityOnly,
        ..MigrationConfig::default()
    };

    let result = Migrator::new(config, endpoints(&source, &destination), builder.build())
        .execute(None, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(destination.users.find("alice").unwrap().site_role, "Explorer-migrated");
}

/// Cancels the run from inside the action
struct CancelsRun;

#[async_trait]
impl MigrationAction for CancelsRun {
    fn name(&self) -> String {
        "cancels".to_string()
    }

    async fn execute(&self, ctx: &MigrationContext) -> ActionResult {
        ctx.cancel_token().cancel();
        ActionResult::canceled(self.name())
    }
}

#[tokio::test]
async fn test_cancelled_action_skips_completion_hooks_and_stops() {
    let seen = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let mut builder = ExtensionRegistry::builder();
    let observer_seen = seen.clone();
    builder
        .add(ExtensionFactory::from_fn(move |_| Observer {
            seen: observer_seen.clone(),
        }))
        .unwrap();
    let ctx = context(builder.build());

    let mut actions: Vec<Box<dyn MigrationAction>> = vec![Box::new(CancelsRun)];
    actions.push(Box::new(Step {
        name: "after",
        stop: false,
        runs: runs.clone(),
    }));
    let results = PipelineRunner::new(actions).run(&ctx).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ActionStatus::Canceled);
    assert!(!results[0].perform_next_action);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_custom_pipeline_honors_skipped_content_types() {
    use siteport::content::Group;
    use siteport::pipeline::MigrateContentAction;

    let alice = user("alice");
    let source = Site::with_users(vec![alice.clone()]);
    source.groups.insert(group("G1", &[&alice]));
    let destination = Site::empty();
    let config = MigrationConfig {
        skip_content_types: vec![Group::CONTENT_TYPE],
        ..MigrationConfig::default()
    };
    let runner = PipelineRunner::new(vec![
        Box::new(MigrateContentAction::<User>::new()),
        Box::new(MigrateContentAction::<Group>::new()),
    ]);

    let result = Migrator::new(config, endpoints(&source, &destination), ExtensionRegistry::empty())
        .execute_with(&runner, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.actions.len(), 2);
    assert!(result.actions[1].content.as_ref().unwrap().disabled);
    assert_eq!(source.groups.list_calls(), 0);
    assert_eq!(destination.groups.len(), 0);
    assert_eq!(destination.users.len(), 1);
}
