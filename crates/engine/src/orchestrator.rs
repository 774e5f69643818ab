//! Execution orchestrator.
//!
//! A run has two halves so a caller can answer before the graph finishes:
//!
//! 1. [`Orchestrator::begin`] builds the [`ExecutionPlan`] (a malformed graph
//!    is rejected here, before anything is written), creates the execution
//!    and marks it `running`.
//! 2. [`Orchestrator::drive`] walks the plan from the trigger, logs one row
//!    per invoked node and writes the terminal status.
//!
//! [`Orchestrator::run`] does both in sequence.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use wfb_core::condition;
use wfb_core::graph::{Branch, ExecutionPlan};
use wfb_core::status::{ExecutionStatus, NodeStatus};
use wfb_core::template::TemplateContext;
use wfb_core::types::{EntityId, Timestamp};
use wfb_core::workflow::{Node, NodeKind, TriggerType, CONFIG_CONDITION};
use wfb_db::models::execution::{CreateExecution, Execution, UpdateExecution};
use wfb_db::models::execution_log::CreateExecutionLog;
use wfb_db::models::workflow::Workflow;

use crate::credentials::CredentialFetcher;
use crate::error::EngineError;
use crate::executor;
use crate::registry::StepRegistry;
use crate::store::{ExecutionStore, StoreError};

/// Handle-based branch labels written by condition nodes.
const BRANCH_TRUE: &str = "true";
const BRANCH_FALSE: &str = "false";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// An execution that has been created and marked running but not walked.
#[derive(Debug)]
pub struct PreparedRun {
    execution: Execution,
    plan: ExecutionPlan,
    input: Value,
    clock: Instant,
}

impl PreparedRun {
    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn execution_id(&self) -> &str {
        &self.execution.id
    }
}

/// Terminal state of a driven execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub execution_id: EntityId,
    pub status: ExecutionStatus,
    /// Output of the last action node that ran, `null` when none did.
    pub output: Value,
    pub error: Option<String>,
    #[serde(rename = "duration")]
    pub duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

enum NodeOutcome {
    Done { output: Value, branch: Branch<'static> },
    Failed(String),
}

enum WalkEnd {
    Completed(Value),
    Failed(String),
}

/// Timing and payload of one node invocation, ready to be logged.
struct Invocation<'a> {
    node: &'a Node,
    status: NodeStatus,
    input: Value,
    output: Option<Value>,
    error: Option<String>,
    started_at: Timestamp,
    completed_at: Timestamp,
    duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn ExecutionStore>,
    registry: Arc<StepRegistry>,
    fetcher: CredentialFetcher,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        registry: Arc<StepRegistry>,
        fetcher: CredentialFetcher,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
        }
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    /// Load a workflow by id and run it to completion.
    pub async fn run_workflow(
        &self,
        workflow_id: &str,
        trigger_type: TriggerType,
        input: Value,
    ) -> Result<ExecutionOutcome, EngineError> {
        let workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;
        self.run(&workflow, trigger_type, input).await
    }

    /// Run a workflow to completion.
    pub async fn run(
        &self,
        workflow: &Workflow,
        trigger_type: TriggerType,
        input: Value,
    ) -> Result<ExecutionOutcome, EngineError> {
        let prepared = self.begin(workflow, trigger_type, input).await?;
        self.drive(prepared).await
    }

    /// Plan the graph, create the execution and mark it running.
    pub async fn begin(
        &self,
        workflow: &Workflow,
        trigger_type: TriggerType,
        input: Value,
    ) -> Result<PreparedRun, EngineError> {
        let plan = ExecutionPlan::new(workflow.nodes.0.clone(), &workflow.edges.0)?;

        let created = self
            .store
            .create_execution(&CreateExecution {
                workflow_id: workflow.id.clone(),
                user_id: workflow.user_id.clone(),
                trigger_type,
                input: Some(input.clone()),
            })
            .await?;
        let clock = Instant::now();
        let execution = self
            .store
            .update_execution(
                &created.id,
                &UpdateExecution {
                    status: Some(ExecutionStatus::Running),
                    started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            execution_id = %execution.id,
            workflow_id = %workflow.id,
            trigger = trigger_type.as_str(),
            nodes = plan.nodes().len(),
            "Execution started"
        );

        Ok(PreparedRun {
            execution,
            plan,
            input,
            clock,
        })
    }

    /// Walk a prepared run and record its terminal status.
    #[tracing::instrument(
        name = "execution.drive",
        skip_all,
        fields(execution_id = %run.execution.id, workflow_id = %run.execution.workflow_id)
    )]
    pub async fn drive(&self, run: PreparedRun) -> Result<ExecutionOutcome, EngineError> {
        let end = match self.walk(&run).await {
            Ok(end) => end,
            Err(e) => {
                tracing::error!(error = %e, "Execution aborted by store failure");
                let patch = UpdateExecution {
                    status: Some(ExecutionStatus::Error),
                    error: Some(e.to_string()),
                    completed_at: Some(Utc::now()),
                    duration_ms: Some(run.clock.elapsed().as_millis() as i64),
                    ..Default::default()
                };
                if let Err(mark) = self.store.update_execution(&run.execution.id, &patch).await {
                    tracing::error!(error = %mark, "Failed to mark execution as errored");
                }
                return Err(e.into());
            }
        };

        let duration_ms = run.clock.elapsed().as_millis() as i64;
        let (status, output, error) = match end {
            WalkEnd::Completed(output) => (ExecutionStatus::Completed, output, None),
            WalkEnd::Failed(message) => (ExecutionStatus::Error, Value::Null, Some(message)),
        };

        self.store
            .update_execution(
                &run.execution.id,
                &UpdateExecution {
                    status: Some(status),
                    output: (!output.is_null()).then(|| output.clone()),
                    error: error.clone(),
                    completed_at: Some(Utc::now()),
                    duration_ms: Some(duration_ms),
                    ..Default::default()
                },
            )
            .await?;

        match &error {
            None => tracing::info!(duration_ms, "Execution completed"),
            Some(message) => tracing::warn!(duration_ms, error = %message, "Execution failed"),
        }

        Ok(ExecutionOutcome {
            execution_id: run.execution.id.clone(),
            status,
            output,
            error,
            duration_ms,
        })
    }

    async fn walk(&self, run: &PreparedRun) -> Result<WalkEnd, StoreError> {
        let mut ctx = TemplateContext::new();
        let mut walk = run.plan.walk();
        let mut last_action_output = Value::Null;

        while let Some(index) = walk.next_ready() {
            let node = run.plan.node(index);
            match self.invoke(&run.execution.id, node, &run.input, &ctx).await? {
                NodeOutcome::Done { output, branch } => {
                    if role(node) == NodeKind::Action {
                        last_action_output = output.clone();
                    }
                    ctx.insert_node(node, output);
                    walk.complete(index, branch);
                }
                NodeOutcome::Failed(message) => return Ok(WalkEnd::Failed(message)),
            }
        }

        for node in walk.skipped() {
            tracing::debug!(node_id = %node.id, "Node skipped, no active incoming edge");
        }
        Ok(WalkEnd::Completed(last_action_output))
    }

    async fn invoke(
        &self,
        execution_id: &str,
        node: &Node,
        trigger_input: &Value,
        ctx: &TemplateContext,
    ) -> Result<NodeOutcome, StoreError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        match role(node) {
            NodeKind::Trigger => {
                let output = trigger_input.clone();
                self.record(
                    execution_id,
                    Invocation {
                        node,
                        status: NodeStatus::Success,
                        input: trigger_input.clone(),
                        output: Some(output.clone()),
                        error: None,
                        started_at,
                        completed_at: Utc::now(),
                        duration_ms: clock.elapsed().as_millis() as i64,
                    },
                )
                .await?;
                Ok(NodeOutcome::Done {
                    output,
                    branch: Branch::All,
                })
            }
            NodeKind::Condition => {
                let expression = node.config_str(CONFIG_CONDITION).unwrap_or_default();
                let result = condition::evaluate(expression, ctx);
                let branch = if result { BRANCH_TRUE } else { BRANCH_FALSE };
                let output = json!({ "result": result, "branch": branch });
                self.record(
                    execution_id,
                    Invocation {
                        node,
                        status: NodeStatus::Success,
                        input: json!({ "condition": expression }),
                        output: Some(output.clone()),
                        error: None,
                        started_at,
                        completed_at: Utc::now(),
                        duration_ms: clock.elapsed().as_millis() as i64,
                    },
                )
                .await?;
                Ok(NodeOutcome::Done {
                    output,
                    branch: Branch::Handle(branch),
                })
            }
            NodeKind::Action => self.invoke_action(execution_id, node, ctx).await,
        }
    }

    async fn invoke_action(
        &self,
        execution_id: &str,
        node: &Node,
        ctx: &TemplateContext,
    ) -> Result<NodeOutcome, StoreError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let input = ctx.resolve(&Value::Object(node.data.config.clone()));

        let failure = |message: String| Invocation {
            node,
            status: NodeStatus::Error,
            input: input.clone(),
            output: None,
            error: Some(message),
            started_at,
            completed_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as i64,
        };

        let Some(action_type) = node.action_type() else {
            let message = format!("Node '{}' has no action type configured", node.display_label());
            self.record(execution_id, failure(message.clone())).await?;
            return Ok(NodeOutcome::Failed(message));
        };
        let Some(entry) = self.registry.resolve(action_type) else {
            let message = format!("Unknown action type: {action_type}");
            self.record(execution_id, failure(message.clone())).await?;
            return Ok(NodeOutcome::Failed(message));
        };
        let credentials = match self.fetcher.fetch(node.integration_id()).await {
            Ok(bag) => bag,
            Err(e) => {
                let message = e.to_string();
                self.record(execution_id, failure(message.clone())).await?;
                return Ok(NodeOutcome::Failed(message));
            }
        };

        let result = executor::execute(&entry, input.clone(), &credentials).await;
        self.record(
            execution_id,
            Invocation {
                node,
                status: if result.success {
                    NodeStatus::Success
                } else {
                    NodeStatus::Error
                },
                input,
                output: result.output.clone(),
                error: result.error.clone(),
                started_at: result.started_at,
                completed_at: result.completed_at,
                duration_ms: result.duration_ms,
            },
        )
        .await?;

        if result.success {
            Ok(NodeOutcome::Done {
                output: result.output.unwrap_or(Value::Null),
                branch: Branch::All,
            })
        } else {
            Ok(NodeOutcome::Failed(
                result.error.unwrap_or_else(|| "Step failed".to_string()),
            ))
        }
    }

    async fn record(&self, execution_id: &str, call: Invocation<'_>) -> Result<(), StoreError> {
        let node_type = call
            .node
            .kind()
            .map(NodeKind::as_str)
            .unwrap_or(call.node.node_type.as_str());
        self.store
            .append_execution_log(&CreateExecutionLog {
                execution_id: execution_id.to_string(),
                node_id: call.node.id.clone(),
                node_label: call.node.display_label().to_string(),
                node_type: node_type.to_string(),
                status: call.status,
                input: Some(call.input),
                output: call.output,
                error: call.error,
                started_at: call.started_at,
                completed_at: Some(call.completed_at),
                duration_ms: Some(call.duration_ms),
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// How a node is executed. Nodes without a recognised type run as actions.
fn role(node: &Node) -> NodeKind {
    node.kind().unwrap_or(NodeKind::Action)
}
