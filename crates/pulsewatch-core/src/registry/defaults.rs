// ── Built-in rule set ──
//
// Loaded when no rules are configured.

use crate::model::{Condition, NotificationKind, NotificationTemplate, Operator, Priority, Rule};

fn template(
    kind: NotificationKind,
    title: &str,
    message: &str,
    priority: Priority,
    category: &str,
    auto_expire_seconds: u64,
) -> NotificationTemplate {
    NotificationTemplate {
        kind,
        title: title.into(),
        message: message.into(),
        priority,
        category: category.into(),
        auto_expire_seconds,
    }
}

pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "high-temperature",
            "High temperature",
            template(
                NotificationKind::Warning,
                "High temperature",
                "Temperature reached {value} on {topic} at {timestamp}",
                Priority::High,
                "sensor",
                300,
            ),
        )
        .with_condition(
            Condition::new(Operator::Gt)
                .value_key("temperature")
                .threshold(80),
        ),
        Rule::new(
            "device-offline",
            "Device offline",
            template(
                NotificationKind::Alert,
                "Device offline",
                "A device on {topic} reported status {value}",
                Priority::Critical,
                "device",
                0,
            ),
        )
        .with_condition(
            Condition::new(Operator::Eq)
                .value_key("status")
                .threshold("offline"),
        ),
        Rule::new(
            "error-reported",
            "Error reported",
            template(
                NotificationKind::Error,
                "Error reported",
                "{topic}: {value}",
                Priority::High,
                "system",
                600,
            ),
        )
        .with_condition(
            Condition::new(Operator::Contains)
                .value_key("message")
                .threshold("error"),
        ),
        Rule::new(
            "low-battery",
            "Low battery",
            template(
                NotificationKind::Warning,
                "Low battery",
                "Battery at {value}% on {topic}",
                Priority::Medium,
                "device",
                3600,
            ),
        )
        .with_condition(
            Condition::new(Operator::Lt)
                .value_key("battery")
                .threshold(15),
        ),
    ]
}
