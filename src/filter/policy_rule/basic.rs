use std::fmt;

use tracing::debug;

use super::PolicyRequirementRule;
use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::string_match::StringCondition;
use crate::filter::tristate::Tristate;

/// A request fact a [`FactRule`] can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFact {
    PrincipalName,
    AuthenticationMethod,
    AttributeRequester,
    AttributeIssuer,
}

impl ContextFact {
    fn read(self, ctx: &FilterContext) -> Option<&str> {
        match self {
            ContextFact::PrincipalName => ctx.principal(),
            ContextFact::AuthenticationMethod => ctx.principal_authentication_method(),
            ContextFact::AttributeRequester => ctx.attribute_recipient_id(),
            ContextFact::AttributeIssuer => ctx.attribute_issuer_id(),
        }
    }
}

impl fmt::Display for ContextFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextFact::PrincipalName => "principal name",
            ContextFact::AuthenticationMethod => "authentication method",
            ContextFact::AttributeRequester => "attribute requester",
            ContextFact::AttributeIssuer => "attribute issuer",
        };
        f.write_str(name)
    }
}

/// Compares one request fact against a string condition. FAIL when the
/// context does not carry the fact.
#[derive(Debug)]
pub struct FactRule {
    id: String,
    lifecycle: Lifecycle,
    fact: ContextFact,
    condition: StringCondition,
}

impl FactRule {
    pub fn new(id: impl Into<String>, fact: ContextFact, condition: StringCondition) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            fact,
            condition,
        }
    }

    pub fn fact(&self) -> ContextFact {
        self.fact
    }

    pub fn condition(&self) -> &StringCondition {
        &self.condition
    }
}

impl Component for FactRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.condition.validate(&self.id)
    }
}

impl PolicyRequirementRule for FactRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        match self.fact.read(ctx) {
            Some(value) => Ok(self.condition.matches(value).into()),
            None => {
                debug!(rule = %self.id, "no {} in context", self.fact);
                Ok(Tristate::Fail)
            }
        }
    }
}

/// TRUE when the number of values of a prefiltered attribute lies in
/// `[minimum, maximum]`. An absent attribute has zero values.
#[derive(Debug)]
pub struct NumOfAttributeValuesRule {
    id: String,
    lifecycle: Lifecycle,
    attribute_id: String,
    minimum: usize,
    maximum: usize,
}

impl NumOfAttributeValuesRule {
    pub fn new(id: impl Into<String>, attribute_id: impl Into<String>, minimum: usize, maximum: usize) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            attribute_id: attribute_id.into(),
            minimum,
            maximum,
        }
    }

    pub fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    pub fn bounds(&self) -> (usize, usize) {
        (self.minimum, self.maximum)
    }
}

impl Component for NumOfAttributeValuesRule {
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
        if self.minimum > self.maximum {
            return Err(FilterError::configuration(
                &self.id,
                format!("minimum {} exceeds maximum {}", self.minimum, self.maximum),
            ));
        }
        Ok(())
    }
}

impl PolicyRequirementRule for NumOfAttributeValuesRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        let count = ctx
            .prefiltered_attribute(&self.attribute_id)
            .map_or(0, |a| a.values().len());
        debug!(rule = %self.id, attribute = %self.attribute_id, count, "counted values");
        Ok((self.minimum..=self.maximum).contains(&count).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attribute::Attribute;

    fn rule(fact: ContextFact, condition: StringCondition) -> FactRule {
        let r = FactRule::new("fact", fact, condition);
        r.initialize().unwrap();
        r
    }

    fn context() -> FilterContext {
        FilterContext::new()
            .with_principal("jdoe")
            .with_authentication_method("urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport")
            .with_attribute_recipient_id("https://sp.example.org/shibboleth")
            .with_attribute_issuer_id("https://idp.example.org/idp/shibboleth")
    }

    #[test]
    fn each_fact_is_read_from_context() {
        let ctx = context();
        assert!(rule(ContextFact::PrincipalName, StringCondition::exact("jdoe", true))
            .matches(&ctx)
            .unwrap()
            .is_true());
        assert!(rule(
            ContextFact::AuthenticationMethod,
            StringCondition::regex(".*PasswordProtectedTransport").unwrap()
        )
        .matches(&ctx)
        .unwrap()
        .is_true());
        assert!(rule(
            ContextFact::AttributeRequester,
            StringCondition::exact("https://sp.example.org/shibboleth", true)
        )
        .matches(&ctx)
        .unwrap()
        .is_true());
        assert_eq!(
            rule(ContextFact::AttributeIssuer, StringCondition::exact("https://other.org", true))
                .matches(&ctx)
                .unwrap(),
            Tristate::False
        );
    }

    #[test]
    fn missing_fact_fails() {
        let r = rule(ContextFact::PrincipalName, StringCondition::exact("jdoe", true));
        assert_eq!(r.matches(&FilterContext::new()).unwrap(), Tristate::Fail);
    }

    #[test]
    fn requester_regex_is_anchored() {
        let r = rule(ContextFact::AttributeRequester, StringCondition::regex("https://sp\\.example\\.org").unwrap());
        assert_eq!(r.matches(&context()).unwrap(), Tristate::False);
    }

    #[test]
    fn value_count_bounds() {
        let ctx = FilterContext::new().with_attribute(Attribute::with_values("mail", ["a@x", "b@x"]));
        let one_or_two = NumOfAttributeValuesRule::new("n", "mail", 1, 2);
        one_or_two.initialize().unwrap();
        assert!(one_or_two.matches(&ctx).unwrap().is_true());

        let exactly_one = NumOfAttributeValuesRule::new("n", "mail", 1, 1);
        exactly_one.initialize().unwrap();
        assert_eq!(exactly_one.matches(&ctx).unwrap(), Tristate::False);

        let none = NumOfAttributeValuesRule::new("n", "uid", 0, 0);
        none.initialize().unwrap();
        assert!(none.matches(&ctx).unwrap().is_true());
    }

    #[test]
    fn inverted_bounds_are_a_configuration_error() {
        let r = NumOfAttributeValuesRule::new("n", "mail", 3, 1);
        assert!(matches!(r.initialize(), Err(FilterError::Configuration { .. })));
    }
}
