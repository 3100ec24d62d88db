//! Host loop: ask the supervisor, run the chosen worker, merge, repeat.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voyage_control::{synthesize, Next, Scheduler, Supervisor, VoyageReport};
use voyage_core::{Policy, StateUpdate, VoyageRequest, VoyageState};
use voyage_world::{build_initial_state, Content};

use crate::call::bounded;
use crate::collaborators::Collaborators;
use crate::memo::RouteMemo;
use crate::workers::{worker_for, WorkerContext};

#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub report: VoyageReport,
    pub state: VoyageState,
}

/// Shared by every session in the process. Only the route memo is mutable.
pub struct Runtime {
    content: Arc<Content>,
    supervisor: Supervisor,
    collaborators: Collaborators,
    memo: Arc<RouteMemo>,
}

impl Runtime {
    pub fn new(content: Arc<Content>, collaborators: Collaborators) -> Self {
        let supervisor = Supervisor::new(content.registry.clone(), content.policy.clone());
        Self {
            content,
            supervisor,
            collaborators,
            memo: Arc::new(RouteMemo::default()),
        }
    }

    pub fn offline(content: Arc<Content>) -> Self {
        let collaborators = Collaborators::offline(&content);
        Self::new(content, collaborators)
    }

    /// Replaces the policy loaded with the content.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.supervisor = Supervisor::new(self.content.registry.clone(), policy);
        self
    }

    pub fn policy(&self) -> &Policy {
        self.supervisor.policy()
    }

    pub fn memo(&self) -> &RouteMemo {
        &self.memo
    }

    fn context(&self, state: &VoyageState, cancel: &CancellationToken) -> WorkerContext {
        WorkerContext {
            session: state.session_id,
            content: Arc::clone(&self.content),
            policy: self.policy().clone(),
            collaborators: self.collaborators.clone(),
            memo: Arc::clone(&self.memo),
            cancel: cancel.clone(),
        }
    }

    /// Asks the external planner for a stage order. Any failure leaves the
    /// order empty and records a notice.
    async fn plan_order(&self, state: &VoyageState, cancel: &CancellationToken) -> StateUpdate {
        let mut update = StateUpdate::based_on(state);
        let Some(planner) = &self.collaborators.planner else {
            return update;
        };
        let planned = bounded(
            "planner",
            self.policy().timeouts.planner_ms,
            cancel,
            planner.plan(&state.request, self.supervisor.registry()),
        )
        .await;
        match planned {
            Ok(order) if !order.stages.is_empty() => {
                debug!(session = %state.session_id, reasoning = %order.reasoning, "planner order");
                update.planned_order = Some(order);
            }
            Ok(_) => {
                warn!(session = %state.session_id, "planner proposed no stages; using fixed order");
                update.notice("planner proposed no stages; fixed stage order used");
            }
            Err(error) => {
                warn!(session = %state.session_id, "planner failed, using fixed order: {error}");
                update.notice(format!("planner unavailable ({error}); fixed stage order used"));
            }
        }
        update
    }

    /// Runs one request to its final report. Errors only on an internally
    /// inconsistent state update.
    pub async fn run_session(
        &self,
        request: VoyageRequest,
        cancel: CancellationToken,
    ) -> Result<SessionOutcome> {
        let mut state = build_initial_state(&self.content, request);
        let session = state.session_id;
        let ctx = self.context(&state, &cancel);
        info!(
            session = %session,
            origin = %state.request.origin,
            destination = %state.request.destination,
            "session started"
        );

        let planned = self.plan_order(&state, &cancel).await;
        state.apply(planned).context("applying planner order")?;

        loop {
            let decision = self.supervisor.decide(&state);
            debug!(session = %session, reasoning = %decision.reasoning, "decision");
            let next = decision.next;
            state
                .apply(decision.update)
                .context("applying scheduler update")?;
            match next {
                Next::Finalize(reason) => {
                    let report = synthesize(&self.supervisor, &state, reason);
                    info!(
                        session = %session,
                        invocations = state.invocations,
                        missing = report.missing.len(),
                        "finalized: {}",
                        reason.describe()
                    );
                    return Ok(SessionOutcome { report, state });
                }
                Next::Run(stage) => {
                    state.record_invocation();
                    debug!(session = %session, stage = %stage, attempt = state.attempts(stage), "running");
                    let update = worker_for(stage).run(state.clone(), &ctx).await;
                    state
                        .apply(update)
                        .with_context(|| format!("applying {stage} update"))?;
                }
            }
        }
    }
}

/// Runs every request concurrently, one task per session. Results come back
/// in request order.
pub async fn run_batch(
    runtime: Arc<Runtime>,
    requests: Vec<VoyageRequest>,
    cancel: &CancellationToken,
) -> Vec<Result<SessionOutcome>> {
    let count = requests.len();
    let mut tasks = JoinSet::new();
    for (index, request) in requests.into_iter().enumerate() {
        let runtime = Arc::clone(&runtime);
        let cancel = cancel.child_token();
        tasks.spawn(async move { (index, runtime.run_session(request, cancel).await) });
    }

    let mut results: Vec<Option<Result<SessionOutcome>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => results[index] = Some(outcome),
            Err(error) => warn!("session task ended abnormally: {error}"),
        }
    }
    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(anyhow!("session task ended abnormally"))))
        .collect()
}
