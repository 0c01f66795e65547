use fiscus_core::{AccountId, MatchRule, RuleId};
use fiscus_remote::{BudgetStore, StoreError};

/// Resolve a counterparty description to an account through the rule list.
/// Rules evaluate in ascending `priority` order; the first whose pattern
/// matches wins. Rules without a target account never match.
pub fn match_account(description: &str, rules: &[MatchRule]) -> Option<AccountId> {
    let mut ordered: Vec<&MatchRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| rule.priority);
    ordered
        .into_iter()
        .filter(|rule| rule.account_id.is_some())
        .find(|rule| pattern_matches(&rule.pattern, description))
        .and_then(|rule| rule.account_id.clone())
}

/// Wildcard comparison: a single `*` at the start and/or end of the pattern
/// matches zero or more characters; the remainder compares
/// case-insensitively. A `*` anywhere else is a literal character.
pub fn pattern_matches(pattern: &str, description: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let pattern = pattern.to_lowercase();
    let description = description.to_lowercase();

    let (open_start, rest) = match pattern.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, pattern.as_str()),
    };
    let (open_end, needle) = match rest.strip_suffix('*') {
        Some(needle) => (true, needle),
        None => (false, rest),
    };

    match (open_start, open_end) {
        (true, true) => description.contains(needle),
        (true, false) => description.ends_with(needle),
        (false, true) => description.starts_with(needle),
        (false, false) => description == needle,
    }
}

/// Move one element of a list to a new position, returning the new list.
/// Out-of-range `from` leaves the list unchanged; `to` clamps to the end.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() {
        return out;
    }
    let item = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, item);
    out
}

/// Outcome of a rule-set save: one message per rule that failed validation
/// or whose remote call was rejected. Empty means every pending mutation
/// landed.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub errors: Vec<String>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// All failures joined into the single message the caller displays.
    pub fn message(&self) -> String {
        self.errors.join("\n")
    }
}

/// Client-side working copy of the match rule list. Additions, removals and
/// reordering stay local until `save`, which reconciles the copy with the
/// remote store one independent request at a time.
pub struct RuleSetEditor {
    rules: Vec<MatchRule>,
    pending_deletions: Vec<MatchRule>,
}

impl RuleSetEditor {
    pub fn new(mut rules: Vec<MatchRule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        RuleSetEditor {
            rules,
            pending_deletions: Vec::new(),
        }
    }

    pub async fn load<S: BudgetStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self::new(store.list_match_rules().await?))
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Prepend an empty draft rule and return it. The draft carries a local
    /// id until the store assigns a real one at save time.
    pub fn add_draft(&mut self) -> &MatchRule {
        self.rules.insert(0, MatchRule::draft());
        &self.rules[0]
    }

    pub fn rule_mut(&mut self, id: &RuleId) -> Option<&mut MatchRule> {
        self.rules.iter_mut().find(|rule| &rule.id == id)
    }

    /// Remove a rule from the working copy. A never-persisted draft just
    /// disappears; a persisted rule is queued for remote deletion at save
    /// time while vanishing from the visible list immediately.
    pub fn remove(&mut self, id: &RuleId) {
        let Some(index) = self.rules.iter().position(|rule| &rule.id == id) else {
            return;
        };
        let rule = self.rules.remove(index);
        if rule.is_persisted() {
            self.pending_deletions.push(rule);
        }
    }

    pub fn reorder(&mut self, from: usize, to: usize) {
        self.rules = reorder(&self.rules, from, to);
    }

    /// Push the working copy to the store. Priorities are reassigned from
    /// list position (top = 0 = evaluated first). Invalid rules stay in the
    /// list, are never sent, and contribute a per-rule error; every remote
    /// call is attempted regardless of earlier failures.
    pub async fn save<S: BudgetStore + ?Sized>(&mut self, store: &S) -> SaveReport {
        let mut report = SaveReport::default();

        for (position, rule) in self.rules.iter_mut().enumerate() {
            rule.priority = position as i64;

            if !rule.is_valid() {
                report.errors.push(format!(
                    "The rule with match \"{}\" and account \"{}\" is invalid. \
                     Both match and account need to be set.",
                    rule.pattern,
                    rule.account_id.as_ref().map(|a| a.0.as_str()).unwrap_or("")
                ));
                continue;
            }

            let result = if rule.is_persisted() {
                store.update_match_rule(rule).await
            } else {
                store.create_match_rule(rule).await
            };
            match result {
                Ok(saved) => *rule = saved,
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        let doomed = std::mem::take(&mut self.pending_deletions);
        for rule in doomed {
            if let Err(e) = store.delete_match_rule(&rule).await {
                report.errors.push(e.to_string());
                self.pending_deletions.push(rule);
            }
        }

        if !report.is_success() {
            tracing::warn!(
                errors = report.errors.len(),
                "rule save finished with failures"
            );
        }
        report
    }
}
