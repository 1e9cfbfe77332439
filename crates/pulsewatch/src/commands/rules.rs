//! Rule inspection and validation.

use std::fmt::Write as _;

use pulsewatch_core::{Condition, Rule, RuleRegistry};
use tabled::Tabled;

use crate::cli::{GlobalOpts, RulesArgs, RulesCommand};
use crate::config::{self, Presentation};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Conditions")]
    conditions: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
}

impl RuleRow {
    fn new(rule: &Rule, color: bool) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            enabled: if rule.enabled { "yes" } else { "no" }.into(),
            conditions: rule
                .conditions
                .iter()
                .map(describe_condition)
                .collect::<Vec<_>>()
                .join(" AND "),
            priority: output::paint_priority(rule.template.priority, color),
            category: rule.category().to_owned(),
        }
    }
}

/// Human-readable form of a condition, e.g. `sensors/.* temperature gt 80`.
fn describe_condition(cond: &Condition) -> String {
    let mut out = String::new();
    if let Some(topic) = &cond.topic {
        let _ = write!(out, "@{topic} ");
    }
    if let Some(pattern) = &cond.topic_pattern {
        let _ = write!(out, "/{}/ ", pattern.as_str());
    }
    out.push_str(cond.value_key.as_deref().unwrap_or("<payload>"));
    let _ = write!(out, " {}", cond.operator);
    if let Some(threshold) = &cond.threshold {
        let _ = write!(out, " {threshold}");
    }
    out
}

fn detail(rule: &Rule) -> String {
    let mut lines = vec![
        format!("ID:         {}", rule.id),
        format!("Name:       {}", rule.name),
        format!("Enabled:    {}", rule.enabled),
        format!("Type:       {}", rule.template.kind),
        format!("Priority:   {}", rule.template.priority),
        format!("Category:   {}", rule.template.category),
        format!("Title:      {}", rule.template.title),
        format!("Message:    {}", rule.template.message),
    ];
    lines.push(match rule.template.auto_expire_seconds {
        0 => "Expires:    never".into(),
        secs => format!("Expires:    after {secs}s"),
    });
    lines.push("Conditions:".into());
    for cond in &rule.conditions {
        lines.push(format!("  - {}", describe_condition(cond)));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: RulesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        RulesCommand::List => {
            let cfg = config::load(global)?;
            let view = Presentation::resolve(global, &cfg);
            let rules = cfg.effective_rules();
            let out = output::render_list(
                &view.format,
                &rules,
                |r| RuleRow::new(r, view.color),
                |r| r.id.clone(),
            )?;
            output::print_output(&out, view.quiet);
            Ok(())
        }

        RulesCommand::Get { id } => {
            let cfg = config::load(global)?;
            let view = Presentation::resolve(global, &cfg);
            let rule = cfg
                .effective_rules()
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "rule".into(),
                    identifier: id,
                    list_command: "rules list".into(),
                })?;
            let out = output::render_single(&view.format, &rule, detail, |r| r.id.clone())?;
            output::print_output(&out, view.quiet);
            Ok(())
        }

        RulesCommand::Validate { path } => {
            let path = path.unwrap_or_else(|| config::config_path(global));
            let cfg = pulsewatch_config::load_config_from(&path)?;
            let registry = RuleRegistry::with_rules(cfg.effective_rules())?;
            let enabled = registry.iter().filter(|r| r.enabled).count();

            if !global.quiet {
                eprintln!(
                    "{}: {} rule(s) valid, {enabled} enabled",
                    path.display(),
                    registry.len()
                );
            }
            Ok(())
        }
    }
}
