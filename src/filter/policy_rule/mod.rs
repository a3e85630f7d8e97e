//! Requirement rules decide whether a policy applies to a request.

pub mod basic;
pub mod logic;
pub mod saml;

use std::fmt;
use std::sync::Arc;

use crate::error::FilterResult;
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle, BUILTIN};
use crate::filter::tristate::Tristate;

pub use basic::{ContextFact, FactRule, NumOfAttributeValuesRule};
pub use logic::{AndRule, NotRule, OrRule};
pub use saml::{EntityAttributeRule, InEntityGroupRule, NameIdFormatRule, RegistrationAuthorityRule};

/// A tri-state predicate over a request.
///
/// `Err` is reserved for calls outside the component's lifetime and for
/// evaluation failures a caller-supplied rule chooses to raise; a rule that
/// lacks the data it needs answers [`Tristate::Fail`].
pub trait PolicyRequirementRule: Component + fmt::Debug {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate>;

    /// Lifecycle-checked evaluation.
    fn matches(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        self.ensure_active()?;
        self.evaluate(ctx)
    }
}

pub type SharedPolicyRule = Arc<dyn PolicyRequirementRule>;

macro_rules! constant_rule {
    ($(#[$doc:meta])* $name:ident, $id:literal, $value:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Component for $name {
            fn id(&self) -> &str {
                $id
            }

            fn lifecycle(&self) -> &Lifecycle {
                &BUILTIN
            }
        }

        impl PolicyRequirementRule for $name {
            fn evaluate(&self, _ctx: &FilterContext) -> FilterResult<Tristate> {
                Ok($value)
            }
        }
    };
}

constant_rule!(
    /// Always TRUE.
    MatchesAll,
    "MATCHES_ALL",
    Tristate::True
);
constant_rule!(
    /// Always FALSE.
    MatchesNone,
    "MATCHES_NONE",
    Tristate::False
);
constant_rule!(
    /// Always FAIL.
    RuleFails,
    "REQUIREMENT_FAILS",
    Tristate::Fail
);

pub fn matches_all() -> SharedPolicyRule {
    Arc::new(MatchesAll)
}

pub fn matches_none() -> SharedPolicyRule {
    Arc::new(MatchesNone)
}

pub fn rule_fails() -> SharedPolicyRule {
    Arc::new(RuleFails)
}

type RulePredicate = dyn Fn(&FilterContext) -> Tristate + Send + Sync;

/// A requirement rule backed by a caller-supplied closure.
pub struct PredicateRule {
    id: String,
    lifecycle: Lifecycle,
    predicate: Box<RulePredicate>,
}

impl PredicateRule {
    pub fn new<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FilterContext) -> Tristate + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for PredicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRule")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Component for PredicateRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl PolicyRequirementRule for PredicateRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        Ok((self.predicate)(ctx))
    }
}
