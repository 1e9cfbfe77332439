// ── Rule registry ──
//
// Ordered, id-keyed rule set. Insertion order is evaluation order. Owned
// by the engine task; readers see it through published snapshots.

mod defaults;

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Rule, RulePatch};

pub use defaults::default_rules;

/// Immutable point-in-time view of the rule set, in evaluation order.
pub type RuleSnapshot = Arc<Vec<Arc<Rule>>>;

pub struct RuleRegistry {
    rules: IndexMap<String, Arc<Rule>>,
    snapshot: watch::Sender<RuleSnapshot>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            rules: IndexMap::new(),
            snapshot,
        }
    }

    /// Build a registry from an initial rule list, validating each rule.
    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self, CoreError> {
        let mut registry = Self::new();
        registry.replace_all(rules)?;
        Ok(registry)
    }

    /// Register a new rule. Rejects invalid rules and duplicate ids.
    pub fn add(&mut self, rule: Rule) -> Result<(), CoreError> {
        rule.validate()?;
        if self.rules.contains_key(&rule.id) {
            return Err(CoreError::DuplicateRule { id: rule.id });
        }
        debug!(rule = %rule.id, "rule added");
        self.rules.insert(rule.id.clone(), Arc::new(rule));
        self.publish();
        Ok(())
    }

    /// Apply a partial update. The patched rule must still validate; on
    /// failure the stored rule is left untouched.
    pub fn update(&mut self, id: &str, patch: RulePatch) -> Result<Arc<Rule>, CoreError> {
        let current = self.rules.get(id).ok_or_else(|| CoreError::RuleNotFound {
            id: id.to_owned(),
        })?;

        let mut updated = Rule::clone(current);
        updated.apply(patch);
        updated.validate()?;

        let updated = Arc::new(updated);
        if let Some(slot) = self.rules.get_mut(id) {
            *slot = Arc::clone(&updated);
        }
        debug!(rule = %id, "rule updated");
        self.publish();
        Ok(updated)
    }

    /// Remove a rule, keeping the order of the rest.
    pub fn delete(&mut self, id: &str) -> Result<Arc<Rule>, CoreError> {
        let removed = self
            .rules
            .shift_remove(id)
            .ok_or_else(|| CoreError::RuleNotFound { id: id.to_owned() })?;
        debug!(rule = %id, "rule deleted");
        self.publish();
        Ok(removed)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<Arc<Rule>, CoreError> {
        self.update(
            id,
            RulePatch {
                enabled: Some(enabled),
                ..RulePatch::default()
            },
        )
    }

    /// Swap the whole rule set atomically. Nothing changes if any rule is
    /// invalid or ids collide.
    pub fn replace_all(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<(), CoreError> {
        let mut next = IndexMap::new();
        for rule in rules {
            rule.validate()?;
            if next.contains_key(&rule.id) {
                return Err(CoreError::DuplicateRule { id: rule.id });
            }
            next.insert(rule.id.clone(), Arc::new(rule));
        }
        self.rules = next;
        self.publish();
        Ok(())
    }

    // ── Read access ─────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Arc<Rule>> {
        self.rules.get(id).cloned()
    }

    /// Iterate in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RuleSnapshot> {
        self.snapshot.subscribe()
    }

    fn publish(&mut self) {
        let values: Vec<Arc<Rule>> = self.rules.values().cloned().collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
