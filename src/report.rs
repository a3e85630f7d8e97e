use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::engine::{AttributeFilterEngine, PolicyOutcome};
use crate::model::attribute::{AttributeValue, ValueSet};
use crate::model::attribute_policy::{MatcherConfig, PolicyGroupConfig, RequirementConfig, RuleRef};
use crate::model::request::FilterRequest;

/// Outcome of filtering one request.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub request: String,
    /// Released attributes and their values, in input order.
    pub released: BTreeMap<String, Vec<AttributeValue>>,
    /// Prefiltered attributes that were not released.
    pub withheld: Vec<String>,
    pub policies: Vec<PolicyOutcome>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub permitted: BTreeMap<String, ValueSet>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub denied: BTreeMap<String, ValueSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilterReport {
    /// Filters `request` through `engine`. Engine errors end up in
    /// [`FilterReport::error`] with nothing released.
    pub fn run(engine: &AttributeFilterEngine, label: impl Into<String>, request: &FilterRequest) -> Self {
        let mut ctx = request.to_context();
        let outcome = engine.filter_attributes(&mut ctx);

        let mut report = FilterReport {
            request: label.into(),
            released: BTreeMap::new(),
            withheld: Vec::new(),
            policies: Vec::new(),
            permitted: BTreeMap::new(),
            denied: BTreeMap::new(),
            error: None,
        };
        match outcome {
            Ok(policies) => {
                report.policies = policies;
                report.released = ctx
                    .filtered_attributes()
                    .iter()
                    .map(|(id, a)| (id.clone(), a.values().to_vec()))
                    .collect();
                if let Some(work) = ctx.work_context() {
                    report.permitted = work.permitted_values().clone();
                    report.denied = work.denied_values().clone();
                }
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        report.withheld = ctx
            .prefiltered_attributes()
            .keys()
            .filter(|id| !report.released.contains_key(*id))
            .cloned()
            .collect();
        report
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub requests: usize,
    pub released: usize,
    pub withheld: usize,
    pub errors: usize,
}

impl ReportSummary {
    pub fn from_reports(reports: &[FilterReport]) -> Self {
        Self {
            requests: reports.len(),
            released: reports.iter().map(|r| r.released.len()).sum(),
            withheld: reports.iter().map(|r| r.withheld.len()).sum(),
            errors: reports.iter().filter(|r| r.is_error()).count(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Human readable shape of a policy group, printed by `check`.
#[derive(Debug, Serialize)]
pub struct PolicyOutline {
    pub group: String,
    pub policies: Vec<PolicySummary>,
    pub shared_requirement_rules: usize,
    pub shared_value_rules: usize,
    pub shared_attribute_rules: usize,
}

#[derive(Debug, Serialize)]
pub struct PolicySummary {
    pub id: String,
    pub requirement: String,
    pub rules: Vec<String>,
}

impl PolicyOutline {
    pub fn from_config(config: &PolicyGroupConfig) -> Self {
        let policies = config
            .policies
            .iter()
            .map(|p| PolicySummary {
                id: p.id.clone(),
                requirement: p.requirement.describe(RequirementConfig::kind),
                rules: p
                    .attribute_rules
                    .iter()
                    .map(|r| match r {
                        RuleRef::Reference(id) => match config.shared_attribute_rules.get(id) {
                            Some(rule) => format!("{} (ref {})", describe_rule(rule), id),
                            None => format!("ref {} (unresolved)", id),
                        },
                        RuleRef::Inline(rule) => describe_rule(rule),
                    })
                    .collect(),
            })
            .collect();
        Self {
            group: config.id.clone(),
            policies,
            shared_requirement_rules: config.shared_requirement_rules.len(),
            shared_value_rules: config.shared_matchers.len(),
            shared_attribute_rules: config.shared_attribute_rules.len(),
        }
    }
}

fn describe_rule(rule: &crate::model::attribute_policy::AttributeRuleConfig) -> String {
    let verb = if rule.is_deny() { "deny" } else { "permit" };
    let what = rule
        .value_rule()
        .map(|m| m.describe(MatcherConfig::kind))
        .unwrap_or_default();
    format!("{} {}: {}", verb, rule.attribute_id, what)
}
