//! The attribute filter engine and its components.

pub mod adapter;
pub mod attribute_rule;
pub mod builder;
pub mod context;
pub mod engine;
pub mod lifecycle;
pub mod matcher;
pub mod policy;
pub mod policy_rule;
pub mod string_match;
pub mod tristate;

pub use attribute_rule::AttributeRule;
pub use context::{FilterContext, WorkContext};
pub use engine::{AttributeFilterEngine, PolicyOutcome};
pub use lifecycle::Component;
pub use policy::AttributeFilterPolicy;
pub use tristate::Tristate;
