use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{FilterError, FilterResult};
use crate::filter::attribute_rule::AttributeRule;
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::policy_rule::SharedPolicyRule;
use crate::filter::tristate::Tristate;

/// A requirement rule gating an ordered list of attribute rules.
#[derive(Debug)]
pub struct AttributeFilterPolicy {
    id: String,
    lifecycle: Lifecycle,
    requirement: SharedPolicyRule,
    rules: Vec<Arc<AttributeRule>>,
}

impl AttributeFilterPolicy {
    pub fn new(id: impl Into<String>, requirement: SharedPolicyRule, rules: Vec<Arc<AttributeRule>>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            requirement,
            rules,
        }
    }

    pub fn requirement_rule(&self) -> &SharedPolicyRule {
        &self.requirement
    }

    pub fn attribute_rules(&self) -> &[Arc<AttributeRule>] {
        &self.rules
    }

    /// Runs the attribute rules if, and only if, the requirement is TRUE.
    ///
    /// Returns the requirement's verdict.
    pub fn apply(&self, ctx: &mut FilterContext) -> FilterResult<Tristate> {
        self.ensure_active()?;

        let verdict = self.requirement.matches(ctx)?;
        match verdict {
            Tristate::True => {
                debug!(policy = %self.id, rules = self.rules.len(), "policy is active");
                for rule in &self.rules {
                    rule.apply(ctx)?;
                }
            }
            Tristate::False => {
                debug!(policy = %self.id, "requirement not met, policy is inactive");
            }
            Tristate::Fail => {
                warn!(policy = %self.id, rule = self.requirement.id(), "requirement could not be evaluated, policy is inactive");
            }
        }
        Ok(verdict)
    }
}

impl Component for AttributeFilterPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.requirement
            .initialize()
            .map_err(|e| FilterError::configuration(&self.id, format!("requirement rule: {}", e)))?;
        for rule in &self.rules {
            rule.initialize()
                .map_err(|e| FilterError::configuration(&self.id, format!("attribute rule: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::matcher::matches_all;
    use crate::filter::policy_rule::{self, PredicateRule};
    use crate::model::attribute::Attribute;

    fn context() -> FilterContext {
        FilterContext::new().with_attribute(Attribute::with_values("attribute1", ["one", "two"]))
    }

    fn permit_all() -> Vec<Arc<AttributeRule>> {
        vec![Arc::new(AttributeRule::permit("permitAll", "attribute1", matches_all()))]
    }

    #[test]
    fn true_requirement_runs_rules() {
        let policy = AttributeFilterPolicy::new("p", policy_rule::matches_all(), permit_all());
        policy.initialize().unwrap();
        let mut ctx = context();
        assert_eq!(policy.apply(&mut ctx).unwrap(), Tristate::True);
        assert_eq!(ctx.work_context().unwrap().permitted_values()["attribute1"].len(), 2);
    }

    #[test]
    fn false_or_fail_requirement_skips_rules() {
        for requirement in [policy_rule::matches_none(), policy_rule::rule_fails()] {
            let policy = AttributeFilterPolicy::new("p", requirement, permit_all());
            policy.initialize().unwrap();
            let mut ctx = context();
            assert_ne!(policy.apply(&mut ctx).unwrap(), Tristate::True);
            assert!(ctx.work_context().is_none());
        }
    }

    #[test]
    fn initialization_is_transitive() {
        let requirement = Arc::new(PredicateRule::new("req", |_| Tristate::True));
        let rule = Arc::new(AttributeRule::permit("r", "attribute1", matches_all()));
        let policy = AttributeFilterPolicy::new("p", requirement.clone(), vec![rule.clone()]);
        policy.initialize().unwrap();
        assert!(requirement.is_initialized());
        assert!(rule.is_initialized());
    }

    #[test]
    fn broken_child_fails_activation() {
        let rule = Arc::new(AttributeRule::permit("r", "", matches_all()));
        let policy = AttributeFilterPolicy::new("p", policy_rule::matches_all(), vec![rule]);
        assert!(matches!(policy.initialize(), Err(FilterError::Configuration { .. })));
        assert!(!policy.is_initialized());
    }

    #[test]
    fn destroyed_policy_rejects_apply() {
        let policy = AttributeFilterPolicy::new("p", policy_rule::matches_all(), permit_all());
        policy.initialize().unwrap();
        policy.destroy();
        assert!(matches!(policy.apply(&mut context()), Err(FilterError::Destroyed { .. })));
    }
}
