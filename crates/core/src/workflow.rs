//! Workflow graph model: nodes, edges, and save-time helpers.
//!
//! The persisted shape is what the builder UI sends. Unknown keys on nodes,
//! node data and edges are kept so a saved graph reads back unchanged.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::graph::GraphError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on nodes in one workflow.
pub const MAX_NODES: usize = 500;

/// Config key naming the integration a node uses.
pub const CONFIG_INTEGRATION_ID: &str = "integrationId";

/// Config key naming an action node's step, e.g. `resend/send-email`.
pub const CONFIG_ACTION_TYPE: &str = "actionType";

/// Config key on the trigger node selecting manual/webhook/schedule.
pub const CONFIG_TRIGGER_TYPE: &str = "triggerType";

/// Config key on a schedule trigger holding the run interval.
pub const CONFIG_SCHEDULE_INTERVAL: &str = "scheduleIntervalMinutes";

/// Longest accepted schedule interval: one year.
pub const MAX_SCHEDULE_INTERVAL_MINUTES: i64 = 365 * 24 * 60;

/// Config key on a condition node holding its expression.
pub const CONFIG_CONDITION: &str = "condition";

/// Id given to the trigger synthesized for an empty workflow.
pub const DEFAULT_TRIGGER_ID: &str = "trigger-1";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What a node does when the walk reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Trigger,
    Action,
    Condition,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Condition => "condition",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trigger" => Some(NodeKind::Trigger),
            "action" => Some(NodeKind::Action),
            "condition" => Some(NodeKind::Condition),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Workspace,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
            Visibility::Workspace => "workspace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Visibility::Private),
            "public" => Some(Visibility::Public),
            "workspace" => Some(Visibility::Workspace),
            _ => None,
        }
    }
}

/// How a run was started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Manual,
    Webhook,
    Schedule,
}

impl TriggerType {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerType::Manual => "manual",
            TriggerType::Webhook => "webhook",
            TriggerType::Schedule => "schedule",
        }
    }

    /// Case-insensitive; the builder stores `Manual`, `Webhook`, `Schedule`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(TriggerType::Manual),
            "webhook" => Some(TriggerType::Webhook),
            "schedule" => Some(TriggerType::Schedule),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node / Edge
// ---------------------------------------------------------------------------

/// Canvas coordinates. Kept as JSON numbers so integers stay integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: serde_json::Number,
    pub y: serde_json::Number,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 0.into(),
            y: 0.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    /// `None` when absent, `Some(None)` for an explicit `null`.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Renderer type used by the builder canvas.
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// `data.type`, falling back to the top-level renderer type.
    pub fn kind(&self) -> Option<NodeKind> {
        self.data.kind.or_else(|| NodeKind::parse(&self.node_type))
    }

    pub fn is_trigger(&self) -> bool {
        self.kind() == Some(NodeKind::Trigger)
    }

    /// A non-empty string value from `data.config`.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.data
            .config
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn integration_id(&self) -> Option<&str> {
        self.config_str(CONFIG_INTEGRATION_ID)
    }

    pub fn action_type(&self) -> Option<&str> {
        self.config_str(CONFIG_ACTION_TYPE)
    }

    /// Label used in logs; falls back to the node id when blank.
    pub fn display_label(&self) -> &str {
        let label = self.data.label.trim();
        if label.is_empty() {
            &self.id
        } else {
            label
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// The builder sends `null` handles on plain edges; they are kept as-is.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// The branch this edge leaves its source on, if any.
    pub fn source_handle(&self) -> Option<&str> {
        self.source_handle.as_ref().and_then(Option::as_deref)
    }
}

/// Present keys deserialize to `Some`, so `null` stays distinct from absent.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Save-time helpers
// ---------------------------------------------------------------------------

/// The trigger node given to a workflow created without nodes.
pub fn default_trigger_node() -> Node {
    let mut config = Map::new();
    config.insert(CONFIG_TRIGGER_TYPE.into(), Value::String("Manual".into()));

    Node {
        id: DEFAULT_TRIGGER_ID.to_string(),
        node_type: NodeKind::Trigger.as_str().to_string(),
        position: Position::default(),
        data: NodeData {
            label: "Trigger".to_string(),
            description: None,
            kind: Some(NodeKind::Trigger),
            config,
            status: Some(Some("idle".to_string())),
            extra: Map::new(),
        },
        extra: Map::new(),
    }
}

/// Replace an empty node list with a single default trigger.
pub fn ensure_trigger(nodes: Vec<Node>) -> Vec<Node> {
    if nodes.is_empty() {
        vec![default_trigger_node()]
    } else {
        nodes
    }
}

/// Checks a graph must pass before it is saved.
///
/// Weaker than [`ExecutionPlan::new`](crate::graph::ExecutionPlan::new): a
/// graph under construction may have unconnected nodes, but it may not
/// reference nodes that do not exist or carry more than one trigger.
pub fn check_structure(nodes: &[Node], edges: &[Edge]) -> Result<(), GraphError> {
    if nodes.len() > MAX_NODES {
        return Err(GraphError::TooManyNodes {
            count: nodes.len(),
            max: MAX_NODES,
        });
    }

    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNode(node.id.clone()));
        }
    }

    let triggers = nodes.iter().filter(|n| n.is_trigger()).count();
    if triggers > 1 {
        return Err(GraphError::MultipleTriggers(triggers));
    }

    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Every distinct non-empty `integrationId`, in first-seen order.
pub fn extract_integration_ids(nodes: &[Node]) -> Vec<String> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter_map(Node::integration_id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Strip integration references before showing a workflow to a non-owner.
pub fn sanitize_for_public(nodes: &[Node]) -> Vec<Node> {
    nodes
        .iter()
        .cloned()
        .map(|mut node| {
            node.data.config.remove(CONFIG_INTEGRATION_ID);
            node
        })
        .collect()
}

/// The trigger node, if any.
pub fn find_trigger(nodes: &[Node]) -> Option<&Node> {
    nodes.iter().find(|n| n.is_trigger())
}

/// Trigger type configured on the trigger node. Defaults to manual.
pub fn trigger_type(nodes: &[Node]) -> TriggerType {
    find_trigger(nodes)
        .and_then(|n| n.config_str(CONFIG_TRIGGER_TYPE))
        .and_then(TriggerType::parse)
        .unwrap_or_default()
}

/// Interval for schedule triggers, accepting a number or numeric string.
///
/// Values outside `1..=MAX_SCHEDULE_INTERVAL_MINUTES` mean "not scheduled".
pub fn schedule_interval_minutes(nodes: &[Node]) -> Option<i64> {
    let value = find_trigger(nodes)?
        .data
        .config
        .get(CONFIG_SCHEDULE_INTERVAL)?;
    let minutes = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (1..=MAX_SCHEDULE_INTERVAL_MINUTES)
        .contains(&minutes)
        .then_some(minutes)
}

/// A node label reduced to alphanumerics, usable as a template key:
/// `"Get Application"` becomes `GetApplication`.
pub fn label_alias(label: &str) -> String {
    label.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}
