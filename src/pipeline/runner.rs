//! Sequential action execution

use super::action::{ActionResult, MigrationAction};
use super::{build_actions, PipelineProfile};
use crate::context::MigrationContext;
use crate::extensions::ActionCompletedKind;
use tracing::{error, info, warn};

/// Runs actions in order until one asks the pipeline to stop
pub struct PipelineRunner {
    actions: Vec<Box<dyn MigrationAction>>,
}

impl PipelineRunner {
    pub fn new(actions: Vec<Box<dyn MigrationAction>>) -> Self {
        Self { actions }
    }

    pub fn for_profile(profile: PipelineProfile) -> Self {
        Self::new(build_actions(profile))
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Execute the pipeline and return the result of every action that ran
    ///
    /// Action-completed hooks run after each action, including one that
    /// stops the pipeline, and may replace its result. Once the run is
    /// cancelled the hook chain is skipped like every other chain: the
    /// action's own result is kept and the pipeline stops.
    pub async fn run(&self, ctx: &MigrationContext) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(self.actions.len());
        let total = self.actions.len();

        for (index, action) in self.actions.iter().enumerate() {
            let name = action.name();
            if ctx.is_cancelled() {
                warn!(action = %name, "Run canceled before action started");
                results.push(ActionResult::canceled(name));
                break;
            }

            info!(action = %name, step = index + 1, of = total, "Starting action");
            let outcome = action.execute(ctx).await;

            let outcome = match ctx.run_extensions::<ActionCompletedKind>(outcome.clone()).await {
                Ok(result) => result,
                Err(e) if e.is_canceled() => ActionResult {
                    perform_next_action: false,
                    ..outcome
                },
                Err(e) => {
                    error!(action = %name, error = %e, "Action-completed hook failed");
                    let mut errors = outcome.errors;
                    errors.push(e.to_string());
                    ActionResult::failed(name.clone(), errors)
                }
            };

            info!(
                action = %name,
                status = %outcome.status,
                errors = outcome.errors.len(),
                perform_next_action = outcome.perform_next_action,
                "Action finished"
            );
            let stop = !outcome.perform_next_action;
            results.push(outcome);
            if stop {
                if index + 1 < total {
                    info!(action = %name, remaining = total - index - 1, "Pipeline stopped early");
                }
                break;
            }
        }
        results
    }
}
