// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rule registry keyed by canonical pattern.
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::ident::RuleId;
use crate::rule::{PatternKey, Rule, RuleError, RuleKind};

/// Filter for [`RuleRegistry::find`]. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleQuery {
    /// Exact rule name.
    pub name: Option<String>,
    /// Agent name appearing on either side of the pattern.
    pub agent: Option<String>,
    /// Rule kind.
    pub kind: Option<RuleKind>,
}

impl RuleQuery {
    /// A query matching every rule.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts to the rule called `name`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts to rules whose pattern mentions agent name `agent`.
    #[must_use]
    pub fn involving(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Restricts to rules of `kind`.
    #[must_use]
    pub fn of_kind(mut self, kind: RuleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Returns `true` if `rule` passes every set filter.
    pub fn matches(&self, rule: &Rule) -> bool {
        let pattern = rule.pattern();
        self.name.as_deref().is_none_or(|n| n == rule.name())
            && self.kind.is_none_or(|k| k == rule.kind())
            && self
                .agent
                .as_deref()
                .is_none_or(|a| pattern.left.agent == a || pattern.right.agent == a)
    }
}

/// Registered rules, indexed by canonical pattern, name and id.
///
/// Names and canonical patterns are both unique; the pattern index is what
/// reduction consults, so at most one rule can match a given connection.
#[derive(Clone, Debug, Default)]
pub struct RuleRegistry {
    patterns: BTreeMap<PatternKey, Rule>,
    names: BTreeMap<String, PatternKey>,
    ids: FxHashMap<RuleId, PatternKey>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Registers `rule`.
    ///
    /// # Errors
    /// [`RuleError::DuplicateRuleName`] or [`RuleError::DuplicatePattern`] when
    /// the name or canonical pattern is already taken.
    pub fn insert(&mut self, rule: Rule) -> Result<RuleId, RuleError> {
        if self.names.contains_key(rule.name()) {
            return Err(RuleError::DuplicateRuleName(rule.name().to_owned()));
        }
        let key = rule.key();
        if let Some(existing) = self.patterns.get(&key) {
            return Err(RuleError::DuplicatePattern {
                pattern: key,
                existing: existing.name().to_owned(),
            });
        }
        let id = rule.id();
        self.names.insert(rule.name().to_owned(), key.clone());
        self.ids.insert(id, key.clone());
        self.patterns.insert(key, rule);
        Ok(id)
    }

    /// Removes the rule called `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Rule> {
        let key = self.names.remove(name)?;
        let rule = self.patterns.remove(&key)?;
        self.ids.remove(&rule.id());
        Some(rule)
    }

    /// Removes every rule.
    pub fn clear(&mut self) {
        self.patterns.clear();
        self.names.clear();
        self.ids.clear();
    }

    /// Rule called `name`.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.names.get(name).and_then(|k| self.patterns.get(k))
    }

    /// Rule with id `id`.
    pub fn get_by_id(&self, id: RuleId) -> Option<&Rule> {
        self.ids.get(&id).and_then(|k| self.patterns.get(k))
    }

    /// Rule registered for canonical pattern `key`.
    pub fn lookup(&self, key: &PatternKey) -> Option<&Rule> {
        self.patterns.get(key)
    }

    /// Iterates rules in canonical pattern order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.patterns.values()
    }

    /// Rules passing `query`, in canonical pattern order.
    pub fn find(&self, query: &RuleQuery) -> Vec<&Rule> {
        self.iter().filter(|r| query.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::rule::{ActionCommand, HandlerError, PortPattern};
    use crate::template::RewriteTemplate;
    use crate::view::NetworkView;

    fn noop(_: &mut Agent, _: &mut Agent, _: NetworkView<'_>) -> Result<Vec<ActionCommand>, HandlerError> {
        Ok(Vec::new())
    }

    fn action(name: &str, a: &str, b: &str) -> Rule {
        Rule::action(name, PortPattern::new(a, "main"), PortPattern::new(b, "main"), noop).unwrap()
    }

    #[test]
    fn reversed_pattern_is_a_duplicate() {
        let mut reg = RuleRegistry::new();
        reg.insert(action("ab", "A", "B")).unwrap();
        let err = reg.insert(action("ba", "B", "A")).unwrap_err();
        assert!(matches!(err, RuleError::DuplicatePattern { existing, .. } if existing == "ab"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = RuleRegistry::new();
        reg.insert(action("r", "A", "B")).unwrap();
        assert_eq!(
            reg.insert(action("r", "C", "D")).unwrap_err(),
            RuleError::DuplicateRuleName("r".into())
        );
    }

    #[test]
    fn remove_clears_every_index() {
        let mut reg = RuleRegistry::new();
        let id = reg.insert(action("r", "A", "B")).unwrap();
        assert!(reg.remove("r").is_some());
        assert!(reg.remove("r").is_none());
        assert!(reg.get_by_id(id).is_none());
        assert!(reg.is_empty());
        reg.insert(action("r2", "B", "A")).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn find_filters_by_name_agent_and_kind() {
        let mut reg = RuleRegistry::new();
        reg.insert(action("ab", "A", "B")).unwrap();
        reg.insert(action("cd", "C", "D")).unwrap();
        reg.insert(
            Rule::rewrite(
                "ee",
                PortPattern::new("E", "main"),
                PortPattern::new("A", "aux"),
                RewriteTemplate::new(),
            )
            .unwrap(),
        )
        .unwrap();
        let names = |q: &RuleQuery| reg.find(q).iter().map(|r| r.name().to_owned()).collect::<Vec<_>>();
        assert_eq!(names(&RuleQuery::any()).len(), 3);
        assert_eq!(names(&RuleQuery::any().named("cd")), vec!["cd"]);
        assert_eq!(names(&RuleQuery::any().involving("A")).len(), 2);
        assert_eq!(names(&RuleQuery::any().of_kind(RuleKind::Rewrite)), vec!["ee"]);
        assert!(names(&RuleQuery::any().involving("A").of_kind(RuleKind::Action).named("cd")).is_empty());
        reg.clear();
        assert!(reg.find(&RuleQuery::any()).is_empty());
    }
}
