//! `{{...}}` template resolution against earlier node outputs.
//!
//! Two reference forms are accepted:
//!
//! - `{{Key.path.to.field}}` where `Key` is a node id, a label alias
//!   (see [`label_alias`]) or `Trigger`.
//! - `{{@nodeId:Label.path}}` as written by the builder's field picker; the
//!   node id is authoritative and the label is display-only.
//!
//! A string consisting of exactly one reference resolves to the referenced
//! JSON value, keeping its type. References embedded in longer text are
//! rendered as strings. Unresolved references become `null` (whole-value) or
//! an empty string (embedded).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::workflow::{label_alias, Node};

/// Context key always bound to the trigger node's output.
pub const TRIGGER_KEY: &str = "Trigger";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(?:@([^:}]+):)?([^{}]+?)\s*\}\}").expect("valid regex")
});

/// Outputs of nodes that have run so far, addressable by template key.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: HashMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's output under its id and label alias. Trigger output is
    /// also bound to [`TRIGGER_KEY`].
    pub fn insert_node(&mut self, node: &Node, output: Value) {
        let alias = label_alias(&node.data.label);
        if !alias.is_empty() && alias != node.id {
            self.values.insert(alias, output.clone());
        }
        if node.is_trigger() {
            self.values.insert(TRIGGER_KEY.to_string(), output.clone());
        }
        self.values.insert(node.id.clone(), output);
    }

    /// The value a node id was recorded with.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Resolve every template inside `value`, recursing into arrays and
    /// objects.
    pub fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_str(s),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Resolve templates in a single string.
    pub fn resolve_str(&self, text: &str) -> Value {
        if let Some(caps) = TEMPLATE_RE.captures(text) {
            let whole = caps.get(0).map(|m| m.as_str().len());
            if whole == Some(text.trim().len()) && text.trim().starts_with("{{") {
                return self
                    .lookup(caps.get(1).map(|m| m.as_str()), &caps[2])
                    .cloned()
                    .unwrap_or(Value::Null);
            }
        } else {
            return Value::String(text.to_string());
        }

        let rendered = TEMPLATE_RE.replace_all(text, |caps: &regex::Captures<'_>| {
            match self.lookup(caps.get(1).map(|m| m.as_str()), &caps[2]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        });
        Value::String(rendered.into_owned())
    }

    fn lookup(&self, node_id: Option<&str>, reference: &str) -> Option<&Value> {
        let mut segments = reference.split('.').map(str::trim);
        let head = segments.next()?;

        // With `@nodeId:Label.path` the label is ignored.
        let root = match node_id {
            Some(id) => self.values.get(id.trim())?,
            None => self.values.get(head)?,
        };

        segments.try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(id: &str, label: &str, kind: &str) -> Node {
        serde_json::from_value(json!({
            "id": id,
            "type": kind,
            "data": { "label": label, "type": kind, "config": {} }
        }))
        .unwrap()
    }

    fn context() -> TemplateContext {
        let mut ctx = TemplateContext::new();
        ctx.insert_node(
            &node("trigger-1", "Trigger", "trigger"),
            json!({ "applicationId": "app-7", "score": 88 }),
        );
        ctx.insert_node(
            &node("n2", "Get Application", "action"),
            json!({ "applicantName": "Ada", "tags": ["a", "b"], "data": { "city": "Oslo" } }),
        );
        ctx
    }

    #[test]
    fn whole_template_keeps_json_type() {
        let ctx = context();
        assert_eq!(ctx.resolve_str("{{Trigger.score}}"), json!(88));
        assert_eq!(ctx.resolve_str("{{GetApplication.tags}}"), json!(["a", "b"]));
        assert_eq!(ctx.resolve_str("  {{ n2.data.city }} "), json!("Oslo"));
    }

    #[test]
    fn embedded_templates_render_as_text() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_str("Hello {{GetApplication.applicantName}}, score {{Trigger.score}}"),
            json!("Hello Ada, score 88")
        );
    }

    #[test]
    fn node_id_reference_ignores_label() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_str("{{@n2:Whatever.applicantName}}"),
            json!("Ada")
        );
    }

    #[test]
    fn array_index_segments() {
        let ctx = context();
        assert_eq!(ctx.resolve_str("{{n2.tags.1}}"), json!("b"));
    }

    #[test]
    fn missing_reference_is_null_or_empty() {
        let ctx = context();
        assert_eq!(ctx.resolve_str("{{Nope.x}}"), Value::Null);
        assert_eq!(ctx.resolve_str("id=[{{Trigger.missing}}]"), json!("id=[]"));
    }

    #[test]
    fn plain_text_is_untouched() {
        let ctx = context();
        assert_eq!(ctx.resolve_str("no templates"), json!("no templates"));
    }

    #[test]
    fn two_templates_are_not_treated_as_one() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_str("{{Trigger.applicationId}}{{Trigger.score}}"),
            json!("app-788")
        );
    }

    #[test]
    fn resolve_recurses_into_objects() {
        let ctx = context();
        let config = json!({
            "applicationId": "{{Trigger.applicationId}}",
            "nested": { "list": ["{{Trigger.score}}", 1] },
            "flag": true
        });
        assert_eq!(
            ctx.resolve(&config),
            json!({
                "applicationId": "app-7",
                "nested": { "list": [88, 1] },
                "flag": true
            })
        );
    }
}
