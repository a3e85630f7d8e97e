use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::policy::AttributeFilterPolicy;
use crate::filter::tristate::Tristate;
use crate::model::attribute::{Attribute, AttributeValue, ValueSet};

/// How one policy fared during a filtering pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyOutcome {
    pub policy: String,
    /// The requirement's verdict, absent when the policy failed.
    pub verdict: Option<Tristate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Applies an ordered list of policies to a request and computes the
/// releasable attributes.
///
/// The engine is immutable once activated and may be shared between threads;
/// each pass works on its own [`FilterContext`].
#[derive(Debug)]
pub struct AttributeFilterEngine {
    id: String,
    lifecycle: Lifecycle,
    policies: Vec<Arc<AttributeFilterPolicy>>,
}

impl AttributeFilterEngine {
    /// Repeated policy instances are kept once, at their first position.
    pub fn new(id: impl Into<String>, policies: Vec<Arc<AttributeFilterPolicy>>) -> Self {
        let mut unique: Vec<Arc<AttributeFilterPolicy>> = Vec::with_capacity(policies.len());
        for policy in policies {
            if !unique.iter().any(|p| Arc::ptr_eq(p, &policy)) {
                unique.push(policy);
            }
        }
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            policies: unique,
        }
    }

    pub fn filter_policies(&self) -> &[Arc<AttributeFilterPolicy>] {
        &self.policies
    }

    /// Runs every policy against `ctx` and fills its filtered attributes.
    ///
    /// A policy whose evaluation fails recoverably contributes nothing and the
    /// pass carries on. Lifecycle and invariant errors abort the pass.
    pub fn filter_attributes(&self, ctx: &mut FilterContext) -> FilterResult<Vec<PolicyOutcome>> {
        self.ensure_active()?;
        ctx.attach_work_context();

        let mut outcomes = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            let outcome = match policy.apply(ctx) {
                Ok(verdict) => PolicyOutcome {
                    policy: policy.id().to_string(),
                    verdict: Some(verdict),
                    error: None,
                },
                Err(e) if e.is_recoverable() => {
                    warn!(engine = %self.id, policy = policy.id(), error = %e, "policy failed, it contributes nothing");
                    PolicyOutcome {
                        policy: policy.id().to_string(),
                        verdict: None,
                        error: Some(e.to_string()),
                    }
                }
                Err(e) => return Err(e),
            };
            outcomes.push(outcome);
        }

        let released = releasable_attributes(ctx);
        info!(
            engine = %self.id,
            prefiltered = ctx.prefiltered_attributes().len(),
            released = released.len(),
            "filtering complete"
        );
        for attribute in released {
            ctx.insert_filtered_attribute(attribute);
        }
        Ok(outcomes)
    }
}

/// Permitted minus denied values of every prefiltered attribute, in the
/// attribute's own value order, leaving out attributes with nothing left.
fn releasable_attributes(ctx: &FilterContext) -> Vec<Attribute> {
    let Some(work) = ctx.work_context() else {
        return Vec::new();
    };
    let mut released = Vec::new();
    for (id, attribute) in ctx.prefiltered_attributes() {
        let releasable = work.releasable_values(id);
        if releasable.is_empty() {
            debug!(attribute = %id, "no values releasable");
            continue;
        }
        let mut seen = ValueSet::new();
        let values: Vec<AttributeValue> = attribute
            .values()
            .iter()
            .filter(|v| releasable.contains(*v) && seen.insert((*v).clone()))
            .cloned()
            .collect();
        debug!(attribute = %id, count = values.len(), "releasing values");
        released.push(Attribute::with_values(id.clone(), values));
    }
    released
}

impl Component for AttributeFilterEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        for policy in &self.policies {
            policy.initialize().map_err(|e| match e {
                FilterError::Configuration { .. } => e,
                other => FilterError::configuration(&self.id, format!("policy '{}': {}", policy.id(), other)),
            })?;
        }
        debug!(engine = %self.id, policies = self.policies.len(), "engine activated");
        Ok(())
    }
}
