use tracing::{debug, warn};

use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::matcher::SharedMatcher;
use crate::model::attribute::ValueSet;

/// Binds a matcher to one attribute and records its selection as permitted
/// or denied values.
#[derive(Debug)]
pub struct AttributeRule {
    id: String,
    lifecycle: Lifecycle,
    attribute_id: String,
    matcher: SharedMatcher,
    is_deny_rule: bool,
}

impl AttributeRule {
    pub fn new(
        id: impl Into<String>,
        attribute_id: impl Into<String>,
        matcher: SharedMatcher,
        is_deny_rule: bool,
    ) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            attribute_id: attribute_id.into(),
            matcher,
            is_deny_rule,
        }
    }

    pub fn permit(id: impl Into<String>, attribute_id: impl Into<String>, matcher: SharedMatcher) -> Self {
        Self::new(id, attribute_id, matcher, false)
    }

    pub fn deny(id: impl Into<String>, attribute_id: impl Into<String>, matcher: SharedMatcher) -> Self {
        Self::new(id, attribute_id, matcher, true)
    }

    pub fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    pub fn matcher(&self) -> &SharedMatcher {
        &self.matcher
    }

    pub fn is_deny_rule(&self) -> bool {
        self.is_deny_rule
    }

    /// Evaluates the matcher against the rule's attribute and records the
    /// result in the context's work context.
    ///
    /// A missing attribute contributes nothing. A recoverable matcher failure
    /// contributes nothing to a permit rule and denies every value for a deny
    /// rule. Other errors propagate.
    pub fn apply(&self, ctx: &mut FilterContext) -> FilterResult<()> {
        self.ensure_active()?;

        let selected: ValueSet = {
            let Some(attribute) = ctx.prefiltered_attribute(&self.attribute_id) else {
                debug!(rule = %self.id, attribute = %self.attribute_id, "attribute not present, nothing to do");
                return Ok(());
            };
            match self.matcher.matching_values(attribute, ctx) {
                Ok(values) => values,
                Err(e) if e.is_recoverable() && self.is_deny_rule => {
                    warn!(rule = %self.id, attribute = %self.attribute_id, error = %e,
                        "deny matcher failed, denying all values");
                    attribute.value_set()
                }
                Err(e) if e.is_recoverable() => {
                    warn!(rule = %self.id, attribute = %self.attribute_id, error = %e,
                        "permit matcher failed, permitting nothing");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        };

        debug!(
            rule = %self.id,
            attribute = %self.attribute_id,
            count = selected.len(),
            "{} values",
            if self.is_deny_rule { "denying" } else { "permitting" }
        );
        if self.is_deny_rule {
            ctx.add_denied_values(&self.attribute_id, selected)
        } else {
            ctx.add_permitted_values(&self.attribute_id, selected)
        }
    }
}

impl Component for AttributeRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        if self.attribute_id.trim().is_empty() {
            return Err(FilterError::configuration(&self.id, "no attribute ID supplied"));
        }
        self.matcher.initialize()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::matcher::testing::{fixed, set};
    use crate::filter::matcher::{matcher_fails, matches_all, Matcher};
    use crate::model::attribute::{Attribute, AttributeValue};

    fn context() -> FilterContext {
        FilterContext::new().with_attribute(Attribute::with_values("attribute1", ["one", "two"]))
    }

    fn active(rule: AttributeRule) -> AttributeRule {
        rule.initialize().unwrap();
        rule
    }

    #[test]
    fn permit_rule_records_permitted_values() {
        let mut ctx = context();
        active(AttributeRule::permit("r", "attribute1", fixed("one", &["one"]))).apply(&mut ctx).unwrap();
        let work = ctx.work_context().unwrap();
        assert_eq!(work.permitted_values()["attribute1"], set(&["one"]));
        assert!(work.denied_values().is_empty());
    }

    #[test]
    fn deny_rule_records_denied_values() {
        let mut ctx = context();
        active(AttributeRule::deny("r", "attribute1", matches_all())).apply(&mut ctx).unwrap();
        assert_eq!(ctx.work_context().unwrap().denied_values()["attribute1"], set(&["one", "two"]));
    }

    #[test]
    fn results_are_merged() {
        let mut ctx = context();
        active(AttributeRule::permit("a", "attribute1", fixed("one", &["one"]))).apply(&mut ctx).unwrap();
        active(AttributeRule::permit("b", "attribute1", fixed("two", &["two"]))).apply(&mut ctx).unwrap();
        assert_eq!(
            ctx.work_context().unwrap().permitted_values()["attribute1"],
            set(&["one", "two"])
        );
    }

    #[test]
    fn absent_attribute_contributes_nothing() {
        let mut ctx = context();
        active(AttributeRule::permit("r", "attribute2", matches_all())).apply(&mut ctx).unwrap();
        assert!(ctx.work_context().is_none());
    }

    #[test]
    fn failed_permit_records_nothing() {
        let mut ctx = context();
        active(AttributeRule::permit("r", "attribute1", matcher_fails())).apply(&mut ctx).unwrap();
        assert!(ctx.work_context().is_none());
    }

    #[test]
    fn failed_deny_denies_everything() {
        let mut ctx = context();
        active(AttributeRule::deny("r", "attribute1", matcher_fails())).apply(&mut ctx).unwrap();
        assert_eq!(ctx.work_context().unwrap().denied_values()["attribute1"], set(&["one", "two"]));
    }

    #[derive(Debug)]
    struct Rogue(Lifecycle);

    impl Component for Rogue {
        fn id(&self) -> &str {
            "rogue"
        }

        fn lifecycle(&self) -> &Lifecycle {
            &self.0
        }
    }

    impl Matcher for Rogue {
        fn evaluate(&self, _attribute: &Attribute, _ctx: &FilterContext) -> FilterResult<ValueSet> {
            Ok([AttributeValue::string("three")].into_iter().collect())
        }
    }

    #[test]
    fn foreign_values_violate_invariant() {
        let mut ctx = context();
        let rule = active(AttributeRule::permit("r", "attribute1", Arc::new(Rogue(Lifecycle::new()))));
        let err = rule.apply(&mut ctx).unwrap_err();
        assert!(matches!(err, FilterError::InvariantViolation { .. }));
    }

    #[test]
    fn apply_requires_activation() {
        let mut ctx = context();
        let rule = AttributeRule::permit("r", "attribute1", matches_all());
        assert!(matches!(rule.apply(&mut ctx), Err(FilterError::Uninitialized { .. })));
    }

    #[test]
    fn empty_attribute_id_is_rejected() {
        let rule = AttributeRule::permit("r", " ", matches_all());
        assert!(matches!(rule.initialize(), Err(FilterError::Configuration { .. })));
    }
}
