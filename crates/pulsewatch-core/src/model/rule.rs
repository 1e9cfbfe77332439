// ── Rule domain types ──
//
// A rule is a conjunction of conditions plus the template of the
// notification it raises. Conditions are immutable value objects;
// topic patterns are compiled once, when the rule is deserialized or built.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::notification::{NotificationKind, Priority};
use crate::error::CoreError;

// ── TopicPattern ────────────────────────────────────────────────────

/// Compiled regular expression matched against an event's channel.
///
/// Unanchored: `sensors/` matches `site-a/sensors/temp`. Serializes as the
/// source pattern string.
#[derive(Clone)]
pub struct TopicPattern(Regex);

impl TopicPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, channel: &str) -> bool {
        self.0.is_match(channel)
    }
}

impl fmt::Debug for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TopicPattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for TopicPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl TryFrom<String> for TopicPattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TopicPattern> for String {
    fn from(p: TopicPattern) -> Self {
        p.as_str().to_owned()
    }
}

impl Serialize for TopicPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TopicPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// ── Operator ────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Ne,
    Contains,
    Exists,
}

impl Operator {
    pub fn requires_threshold(self) -> bool {
        !matches!(self, Self::Exists)
    }
}

// ── Condition ───────────────────────────────────────────────────────

/// One atomic predicate within a rule's conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the decoded payload, e.g. `metrics.cpu.load`.
    #[serde(default, alias = "valueKey", skip_serializing_if = "Option::is_none")]
    pub value_key: Option<String>,

    #[serde(default, alias = "topicPattern", skip_serializing_if = "Option::is_none")]
    pub topic_pattern: Option<TopicPattern>,

    /// Exact channel the event must arrive on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    pub operator: Operator,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Value>,
}

impl Condition {
    pub fn new(operator: Operator) -> Self {
        Self {
            value_key: None,
            topic_pattern: None,
            topic: None,
            operator,
            threshold: None,
        }
    }

    #[must_use]
    pub fn value_key(mut self, key: impl Into<String>) -> Self {
        self.value_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: impl Into<Value>) -> Self {
        self.threshold = Some(threshold.into());
        self
    }

    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn topic_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.topic_pattern = Some(TopicPattern::new(pattern)?);
        Ok(self)
    }

    fn validate(&self, index: usize) -> Result<(), CoreError> {
        let invalid =
            |reason: String| CoreError::validation("rules", format!("condition {index}: {reason}"));

        if let Some(ref key) = self.value_key {
            if key.is_empty() || key.split('.').any(str::is_empty) {
                return Err(invalid(format!(
                    "value key '{key}' has an empty path segment"
                )));
            }
        }
        if let Some(ref topic) = self.topic {
            if topic.is_empty() {
                return Err(invalid("topic must not be empty".into()));
            }
        }
        match self.threshold {
            None if self.operator.requires_threshold() => Err(invalid(format!(
                "operator '{}' requires a threshold",
                self.operator
            ))),
            Some(Value::Array(_) | Value::Object(_)) => {
                Err(invalid("threshold must be a scalar".into()))
            }
            _ => Ok(()),
        }
    }
}

// ── NotificationTemplate ────────────────────────────────────────────

/// Blueprint for the notification a rule raises.
///
/// `message` may contain `{value}`, `{topic}` and `{timestamp}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    pub category: String,
    #[serde(default, alias = "autoExpireSeconds")]
    pub auto_expire_seconds: u64,
}

// ── Rule ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub conditions: Vec<Condition>,
    #[serde(alias = "notificationTemplate", alias = "notification_template")]
    pub template: NotificationTemplate,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, template: NotificationTemplate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            conditions: Vec::new(),
            template,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn category(&self) -> &str {
        &self.template.category
    }

    /// Structural validation. Topic patterns are already compiled by construction.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::validation("rules", "rule id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::validation(
                "rules",
                format!("rule '{}': name must not be empty", self.id),
            ));
        }
        if self.conditions.is_empty() {
            return Err(CoreError::validation(
                "rules",
                format!("rule '{}': at least one condition is required", self.id),
            ));
        }
        if self.template.category.trim().is_empty() {
            return Err(CoreError::validation(
                "rules",
                format!("rule '{}': template category must not be empty", self.id),
            ));
        }
        for (index, condition) in self.conditions.iter().enumerate() {
            condition.validate(index).map_err(|e| match e {
                CoreError::ValidationFailed { field, message } => CoreError::ValidationFailed {
                    field,
                    message: format!("rule '{}': {message}", self.id),
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// Apply a partial update. The id never changes.
    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(conditions) = patch.conditions {
            self.conditions = conditions;
        }
        if let Some(template) = patch.template {
            self.template = template;
        }
    }
}

/// Partial update for an existing rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<NotificationTemplate>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn template() -> NotificationTemplate {
        NotificationTemplate {
            kind: NotificationKind::Warning,
            title: "Index high".into(),
            message: "Index is {value}".into(),
            priority: Priority::High,
            category: "sensor".into(),
            auto_expire_seconds: 30,
        }
    }

    #[test]
    fn topic_pattern_round_trips_as_string() {
        let cond = Condition::new(Operator::Exists)
            .topic_pattern("^sensors/.*")
            .unwrap();
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["topic_pattern"], "^sensors/.*");

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn invalid_topic_pattern_fails_to_deserialize() {
        let err = serde_json::from_str::<Condition>(r#"{"operator": "exists", "topicPattern": "("}"#);
        assert!(err.is_err());
    }

    #[test]
    fn deserializes_camel_case_aliases() {
        let rule: Rule = serde_json::from_str(
            r#"{
                "id": "r1",
                "name": "Index over 60",
                "conditions": [{"valueKey": "Index", "operator": "gt", "threshold": 60}],
                "notificationTemplate": {
                    "type": "warning", "title": "High", "message": "{value}",
                    "priority": "high", "category": "sensor", "autoExpireSeconds": 10
                }
            }"#,
        )
        .unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.conditions[0].value_key.as_deref(), Some("Index"));
        assert_eq!(rule.template.auto_expire_seconds, 10);
        rule.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_threshold() {
        let rule = Rule::new("r1", "Broken", template())
            .with_condition(Condition::new(Operator::Gt).value_key("temp"));
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("requires a threshold"), "{err}");
    }

    #[test]
    fn validate_rejects_empty_id_and_conditions() {
        assert!(Rule::new(" ", "x", template()).validate().is_err());
        assert!(Rule::new("r1", "x", template()).validate().is_err());
    }

    #[test]
    fn validate_rejects_structured_threshold() {
        let rule = Rule::new("r1", "x", template()).with_condition(
            Condition::new(Operator::Eq)
                .value_key("a")
                .threshold(serde_json::json!({"nested": true})),
        );
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_path_segment() {
        let rule = Rule::new("r1", "x", template())
            .with_condition(Condition::new(Operator::Exists).value_key("a..b"));
        assert!(rule.validate().is_err());
    }

    #[test]
    fn exists_without_key_is_valid() {
        let rule =
            Rule::new("r1", "Anything", template()).with_condition(Condition::new(Operator::Exists));
        rule.validate().unwrap();
    }

    #[test]
    fn apply_patch_keeps_id() {
        let mut rule = Rule::new("r1", "Old", template())
            .with_condition(Condition::new(Operator::Exists));
        rule.apply(RulePatch {
            name: Some("New".into()),
            enabled: Some(false),
            ..RulePatch::default()
        });
        assert_eq!(rule.id, "r1");
        assert_eq!(rule.name, "New");
        assert!(!rule.enabled);
    }
}
