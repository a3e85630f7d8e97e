//! Bridges between matchers and requirement rules.

use tracing::warn;

use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::matcher::{Matcher, SharedMatcher};
use crate::filter::policy_rule::{PolicyRequirementRule, SharedPolicyRule};
use crate::filter::tristate::Tristate;
use crate::model::attribute::{Attribute, ValueSet};

/// A matcher used as a requirement rule.
///
/// With a target attribute the rule is TRUE when the matcher selects at least
/// one of its values, FALSE when the attribute is absent. Without one it is
/// TRUE when the matcher selects a value of any prefiltered attribute.
/// Matcher failures become FAIL.
#[derive(Debug)]
pub struct MatcherRule {
    id: String,
    lifecycle: Lifecycle,
    matcher: SharedMatcher,
    attribute_id: Option<String>,
}

impl MatcherRule {
    pub fn new(id: impl Into<String>, matcher: SharedMatcher) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            matcher,
            attribute_id: None,
        }
    }

    pub fn with_attribute_id(mut self, attribute_id: impl Into<String>) -> Self {
        self.attribute_id = Some(attribute_id.into());
        self
    }

    pub fn matcher(&self) -> &SharedMatcher {
        &self.matcher
    }

    fn selects_any(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<bool> {
        Ok(!self.matcher.matching_values(attribute, ctx)?.is_empty())
    }

    fn selects_from_any_attribute(&self, ctx: &FilterContext) -> FilterResult<bool> {
        for attribute in ctx.prefiltered_attributes().values() {
            if self.selects_any(attribute, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Component for MatcherRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.matcher.initialize()
    }
}

impl PolicyRequirementRule for MatcherRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        let outcome = match self.attribute_id.as_deref() {
            Some(id) => match ctx.prefiltered_attribute(id) {
                Some(attribute) => self.selects_any(attribute, ctx),
                None => return Ok(Tristate::False),
            },
            None => self.selects_from_any_attribute(ctx),
        };
        match outcome {
            Ok(found) => Ok(found.into()),
            Err(e) if e.is_recoverable() => {
                warn!(rule = %self.id, matcher = self.matcher.id(), error = %e, "matcher failed, rule is FAIL");
                Ok(Tristate::Fail)
            }
            Err(e) => Err(e),
        }
    }
}

/// A requirement rule used as a matcher: all values on TRUE, none on FALSE,
/// and an evaluation failure on FAIL.
#[derive(Debug)]
pub struct PolicyMatcher {
    id: String,
    lifecycle: Lifecycle,
    rule: SharedPolicyRule,
}

impl PolicyMatcher {
    pub fn new(id: impl Into<String>, rule: SharedPolicyRule) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            rule,
        }
    }

    pub fn rule(&self) -> &SharedPolicyRule {
        &self.rule
    }
}

impl Component for PolicyMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.rule.initialize()
    }
}

impl Matcher for PolicyMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        match self.rule.matches(ctx)? {
            Tristate::True => Ok(attribute.value_set()),
            Tristate::False => Ok(ValueSet::new()),
            Tristate::Fail => Err(FilterError::evaluation(
                &self.id,
                format!("requirement rule '{}' returned FAIL", self.rule.id()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::matcher::testing::fixed;
    use crate::filter::matcher::{matcher_fails, matches_all};
    use crate::filter::policy_rule::{matches_none, rule_fails};

    fn context() -> FilterContext {
        FilterContext::new()
            .with_attribute(Attribute::with_values("uid", ["jdoe"]))
            .with_attribute(Attribute::with_values("affiliation", ["staff", "member"]))
    }

    fn rule(m: MatcherRule) -> MatcherRule {
        m.initialize().unwrap();
        m
    }

    #[test]
    fn targeted_matcher_rule() {
        let ctx = context();
        let staff = rule(MatcherRule::new("r", fixed("staff", &["staff"])).with_attribute_id("affiliation"));
        assert_eq!(staff.matches(&ctx).unwrap(), Tristate::True);

        let faculty = rule(MatcherRule::new("r", fixed("faculty", &["faculty"])).with_attribute_id("affiliation"));
        assert_eq!(faculty.matches(&ctx).unwrap(), Tristate::False);

        let absent = rule(MatcherRule::new("r", matches_all()).with_attribute_id("mail"));
        assert_eq!(absent.matches(&ctx).unwrap(), Tristate::False);
    }

    #[test]
    fn untargeted_matcher_rule_scans_all_attributes() {
        let ctx = context();
        let r = rule(MatcherRule::new("r", fixed("jdoe", &["jdoe"])));
        assert_eq!(r.matches(&ctx).unwrap(), Tristate::True);
        let r = rule(MatcherRule::new("r", fixed("nobody", &["nobody"])));
        assert_eq!(r.matches(&ctx).unwrap(), Tristate::False);
    }

    #[test]
    fn failing_matcher_is_fail() {
        let ctx = context();
        let r = rule(MatcherRule::new("r", matcher_fails()).with_attribute_id("uid"));
        assert_eq!(r.matches(&ctx).unwrap(), Tristate::Fail);
    }

    #[test]
    fn policy_matcher_maps_tristate() {
        let ctx = context();
        let uid = Attribute::with_values("uid", ["jdoe"]);

        let all = PolicyMatcher::new("pm", crate::filter::policy_rule::matches_all());
        all.initialize().unwrap();
        assert_eq!(all.matching_values(&uid, &ctx).unwrap().len(), 1);

        let none = PolicyMatcher::new("pm", matches_none());
        none.initialize().unwrap();
        assert!(none.matching_values(&uid, &ctx).unwrap().is_empty());

        let fails = PolicyMatcher::new("pm", rule_fails());
        fails.initialize().unwrap();
        assert!(fails.matching_values(&uid, &ctx).unwrap_err().is_recoverable());
    }

    #[test]
    fn initialization_reaches_wrapped_component() {
        let inner = Arc::new(crate::filter::policy_rule::PredicateRule::new("p", |_| Tristate::True));
        let pm = PolicyMatcher::new("pm", inner.clone());
        pm.initialize().unwrap();
        assert!(inner.is_initialized());
    }
}
