//! Condition node expressions.
//!
//! An expression is either `lhs <op> rhs` or a single operand judged by
//! truthiness. Operands may contain `{{...}}` templates; the operator is
//! located outside template braces before the operands are resolved.

use serde_json::Value;

use crate::template::TemplateContext;

/// Longest operators first so `>=` is not read as `>`.
const OPERATORS: [(&str, Operator); 7] = [
    (">=", Operator::Gte),
    ("<=", Operator::Lte),
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    (" contains ", Operator::Contains),
    (">", Operator::Gt),
    ("<", Operator::Lt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

/// Evaluate `expression` against the outputs recorded in `ctx`.
pub fn evaluate(expression: &str, ctx: &TemplateContext) -> bool {
    let Some((op, at, len)) = find_operator(expression) else {
        return is_truthy(&ctx.resolve_str(expression.trim()));
    };

    let lhs = operand(&expression[..at], ctx);
    let rhs = operand(&expression[at + len..], ctx);
    compare(&lhs, op, &rhs)
}

/// Compare two resolved operands.
pub fn compare(lhs: &Value, op: Operator, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) {
        return match op {
            Operator::Eq => a == b,
            Operator::Ne => a != b,
            Operator::Gt => a > b,
            Operator::Gte => a >= b,
            Operator::Lt => a < b,
            Operator::Lte => a <= b,
            Operator::Contains => as_text(lhs).contains(&as_text(rhs)),
        };
    }

    match op {
        Operator::Eq => as_text(lhs) == as_text(rhs),
        Operator::Ne => as_text(lhs) != as_text(rhs),
        Operator::Contains => match lhs {
            Value::Array(items) => {
                let needle = as_text(rhs);
                items.iter().any(|item| as_text(item) == needle)
            }
            other => as_text(other).contains(&as_text(rhs)),
        },
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => false,
    }
}

/// `false`, `0`, `""`, `"false"`, `"0"`, `"null"`, `"undefined"`, `null`
/// and empty collections are false; everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim(),
            "" | "false" | "0" | "null" | "undefined"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn find_operator(expression: &str) -> Option<(Operator, usize, usize)> {
    let masked = mask_templates(expression);
    OPERATORS
        .iter()
        .filter_map(|(token, op)| masked.find(token).map(|at| (*op, at, token.len())))
        .min_by_key(|(_, at, _)| *at)
}

/// Overwrite template contents with filler of equal byte length so that
/// operators inside `{{ }}` are not matched.
fn mask_templates(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut depth = 0usize;
    let bytes = expression.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{") {
            depth += 1;
            out.push_str("##");
            i += 2;
        } else if depth > 0 && bytes[i..].starts_with(b"}}") {
            depth -= 1;
            out.push_str("##");
            i += 2;
        } else if depth > 0 || !bytes[i].is_ascii() {
            out.push('#');
            i += 1;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

fn operand(raw: &str, ctx: &TemplateContext) -> Value {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Value::String(inner.to_string());
        }
    }
    ctx.resolve_str(trimmed)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
