// ── Rule evaluation ──
//
// Pure matching of one decoded event against a snapshot of the rule set.
// Rules are independent: every enabled rule in an enabled category is
// checked, and any subset of them may fire for the same event.

use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::decode::{DecodedPayload, value_to_text};
use crate::model::{Condition, NotificationSpec, Operator, RawEvent, Rule, Settings, SourceData};

/// Text substituted for `{value}` when no condition resolved a value.
pub const MISSING_VALUE: &str = "N/A";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a condition could not be evaluated. Always treated as a failed match.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("operator '{0}' requires a threshold")]
    MissingThreshold(Operator),

    #[error("operator '{0}' requires numeric operands")]
    NotNumeric(Operator),
}

/// Why a whole rule was skipped for an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleFault {
    #[error("rule has no conditions")]
    NoConditions,
}

/// Everything the evaluator knows about the event being processed.
pub struct EvaluationContext<'a> {
    pub channel: &'a str,
    pub connection_id: Option<&'a str>,
    pub payload: &'a DecodedPayload,
    pub now: DateTime<Utc>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(event: &'a RawEvent, payload: &'a DecodedPayload, now: DateTime<Utc>) -> Self {
        Self {
            channel: &event.channel,
            connection_id: event.connection_id.as_deref(),
            payload,
            now,
        }
    }
}

/// Evaluate every rule against the event, returning one candidate
/// notification per rule that fired, in rule order.
///
/// Disabled rules and rules whose category is disabled in `settings` are
/// skipped. A faulty rule is logged and skipped; it never blocks the rest.
pub fn evaluate<'r>(
    rules: impl IntoIterator<Item = &'r Rule>,
    settings: &Settings,
    ctx: &EvaluationContext<'_>,
) -> Vec<NotificationSpec> {
    let mut fired = Vec::new();

    for rule in rules {
        if !rule.enabled || !settings.is_category_enabled(rule.category()) {
            continue;
        }
        match evaluate_rule(rule, ctx) {
            Ok(Some(spec)) => {
                debug!(rule = %rule.id, channel = ctx.channel, "rule fired");
                fired.push(spec);
            }
            Ok(None) => {}
            Err(fault) => {
                debug!(rule = %rule.id, error = %fault, "skipping faulty rule");
            }
        }
    }

    fired
}

/// Evaluate a single rule. `Ok(None)` means the conjunction did not hold.
pub fn evaluate_rule(
    rule: &Rule,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<NotificationSpec>, RuleFault> {
    if rule.conditions.is_empty() {
        return Err(RuleFault::NoConditions);
    }

    let mut trigger: Option<&Value> = None;
    for condition in &rule.conditions {
        if !condition_holds(condition, ctx, &mut trigger) {
            return Ok(None);
        }
    }

    Ok(Some(build_notification(rule, ctx, trigger)))
}

/// Check one condition, recording the value it resolved (if any) as the
/// rule's trigger value.
fn condition_holds<'p>(
    condition: &Condition,
    ctx: &EvaluationContext<'p>,
    trigger: &mut Option<&'p Value>,
) -> bool {
    if let Some(ref pattern) = condition.topic_pattern {
        if !pattern.is_match(ctx.channel) {
            return false;
        }
    }
    if let Some(ref topic) = condition.topic {
        if topic != ctx.channel {
            return false;
        }
    }

    let operand = match condition.value_key {
        Some(ref key) => {
            let resolved = ctx.payload.lookup(key);
            *trigger = resolved;
            resolved
        }
        None => Some(ctx.payload.as_value()),
    };

    match apply_operator(condition.operator, operand, condition.threshold.as_ref()) {
        Ok(passed) => passed,
        Err(e) => {
            trace!(error = %e, "condition evaluation error");
            false
        }
    }
}

/// Apply an operator to a resolved operand and the condition's threshold.
pub fn apply_operator(
    operator: Operator,
    operand: Option<&Value>,
    threshold: Option<&Value>,
) -> Result<bool, ConditionError> {
    let required = || threshold.ok_or(ConditionError::MissingThreshold(operator));

    match operator {
        Operator::Exists => Ok(operand.is_some_and(|v| !v.is_null())),
        Operator::Gt | Operator::Lt => {
            let rhs = required()?.as_f64();
            let lhs = operand.and_then(Value::as_f64);
            let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                return Err(ConditionError::NotNumeric(operator));
            };
            Ok(if operator == Operator::Gt {
                lhs > rhs
            } else {
                lhs < rhs
            })
        }
        Operator::Eq => {
            let threshold = required()?;
            Ok(operand.is_some_and(|v| strict_eq(v, threshold)))
        }
        Operator::Ne => {
            let threshold = required()?;
            Ok(!operand.is_some_and(|v| strict_eq(v, threshold)))
        }
        Operator::Contains => {
            let needle = value_to_text(required()?).to_lowercase();
            Ok(operand.is_some_and(|v| value_to_text(v).to_lowercase().contains(&needle)))
        }
    }
}

/// Equality without cross-type coercion. Numbers compare by value so that
/// `65` and `65.0` are equal.
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn build_notification(
    rule: &Rule,
    ctx: &EvaluationContext<'_>,
    trigger: Option<&Value>,
) -> NotificationSpec {
    let template = &rule.template;
    let value_text = trigger.map_or_else(|| MISSING_VALUE.to_owned(), value_to_text);
    let timestamp = ctx
        .now
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string();

    NotificationSpec {
        kind: template.kind,
        title: template.title.clone(),
        message: render_message(&template.message, &value_text, ctx.channel, &timestamp),
        priority: template.priority,
        category: template.category.clone(),
        auto_expire_seconds: template.auto_expire_seconds,
        source: Some(SourceData {
            channel: ctx.channel.to_owned(),
            value: ctx.payload.as_value().clone(),
            connection_id: ctx.connection_id.map(str::to_owned),
            device_id: ctx.payload.device_id(),
        }),
    }
}

/// Substitute every `{value}`, `{topic}` and `{timestamp}` placeholder.
///
/// Single pass over the template: substituted text is never scanned again,
/// so a value that itself reads `{topic}` is inserted literally.
pub fn render_message(message: &str, value: &str, topic: &str, timestamp: &str) -> String {
    let placeholders = [("{value}", value), ("{topic}", topic), ("{timestamp}", timestamp)];

    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match placeholders.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, text)) => {
                out.push_str(text);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
