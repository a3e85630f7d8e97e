//! Wires a [`PolicyGroupConfig`] into live filter components.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use crate::error::FilterError;
use crate::filter::adapter::{MatcherRule, PolicyMatcher};
use crate::filter::attribute_rule::AttributeRule;
use crate::filter::engine::AttributeFilterEngine;
use crate::filter::lifecycle::Component;
use crate::filter::matcher::{
    self, AndMatcher, AttributeInMetadataMatcher, NotMatcher, OrMatcher, SharedMatcher, ValueMatcher,
};
use crate::filter::policy::AttributeFilterPolicy;
use crate::filter::policy_rule::{
    self, AndRule, EntityAttributeRule, FactRule, InEntityGroupRule, NameIdFormatRule, NotRule,
    NumOfAttributeValuesRule, OrRule, RegistrationAuthorityRule, SharedPolicyRule,
};
use crate::filter::string_match::StringCondition;
use crate::model::attribute_policy::{
    AttributeRuleConfig, MatcherConfig, PolicyConfig, PolicyGroupConfig, RequirementConfig, RuleRef,
    StringTest,
};

/// Builds and activates the engine for a policy group.
pub fn build_engine(config: &PolicyGroupConfig) -> Result<AttributeFilterEngine> {
    let mut builder = Builder::new(config);
    let policies = config
        .policies
        .iter()
        .map(|p| builder.policy(p))
        .collect::<Result<Vec<_>>>()?;

    let engine = AttributeFilterEngine::new(config.id.clone(), policies);
    engine
        .initialize()
        .with_context(|| format!("Failed to activate policy group '{}'", config.id))?;
    debug!(engine = %config.id, policies = engine.filter_policies().len(), "engine built");
    Ok(engine)
}

/// Group level definitions are built once and shared by every reference.
struct Builder<'a> {
    config: &'a PolicyGroupConfig,
    rules: HashMap<String, SharedPolicyRule>,
    matchers: HashMap<String, SharedMatcher>,
    attribute_rules: HashMap<String, Arc<AttributeRule>>,
    resolving: Vec<String>,
}

impl<'a> Builder<'a> {
    fn new(config: &'a PolicyGroupConfig) -> Self {
        Self {
            config,
            rules: HashMap::new(),
            matchers: HashMap::new(),
            attribute_rules: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    fn policy(&mut self, config: &PolicyConfig) -> Result<Arc<AttributeFilterPolicy>> {
        let requirement = self
            .requirement_ref(&config.requirement, &format!("{}/requirement", config.id))
            .with_context(|| format!("in AttributeFilterPolicy '{}'", config.id))?;
        let rules = config
            .attribute_rules
            .iter()
            .enumerate()
            .map(|(i, r)| self.attribute_rule_ref(r, &config.id, i))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in AttributeFilterPolicy '{}'", config.id))?;
        Ok(Arc::new(AttributeFilterPolicy::new(config.id.clone(), requirement, rules)))
    }

    fn enter(&mut self, key: String) -> Result<()> {
        if self.resolving.contains(&key) {
            bail!(
                "circular reference: {} -> {}",
                self.resolving.join(" -> "),
                key
            );
        }
        self.resolving.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.resolving.pop();
    }

    fn attribute_rule_ref(
        &mut self,
        rule: &RuleRef<AttributeRuleConfig>,
        policy_id: &str,
        index: usize,
    ) -> Result<Arc<AttributeRule>> {
        match rule {
            RuleRef::Inline(config) => {
                let id = config
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}[{}]", policy_id, config.attribute_id, index));
                self.attribute_rule(config, &id)
            }
            RuleRef::Reference(name) => {
                if let Some(shared) = self.attribute_rules.get(name) {
                    return Ok(Arc::clone(shared));
                }
                let config = self
                    .config
                    .shared_attribute_rules
                    .get(name)
                    .ok_or_else(|| anyhow!("reference to unknown AttributeRule '{}'", name))?;
                let built = self.attribute_rule(config, name)?;
                self.attribute_rules.insert(name.clone(), Arc::clone(&built));
                Ok(built)
            }
        }
    }

    fn attribute_rule(&mut self, config: &AttributeRuleConfig, id: &str) -> Result<Arc<AttributeRule>> {
        if config.permit.is_some() && config.deny.is_some() {
            bail!("AttributeRule '{}' has both a permit and a deny value rule", id);
        }
        let value_rule = config
            .value_rule()
            .ok_or_else(|| anyhow!("AttributeRule '{}' has no value rule", id))?;
        let suffix = if config.is_deny() { "deny" } else { "permit" };
        let matcher = self.matcher_ref(value_rule, &format!("{}/{}", id, suffix))?;
        Ok(Arc::new(AttributeRule::new(
            id,
            config.attribute_id.clone(),
            matcher,
            config.is_deny(),
        )))
    }

    fn requirement_ref(&mut self, rule: &RuleRef<RequirementConfig>, id: &str) -> Result<SharedPolicyRule> {
        match rule {
            RuleRef::Inline(config) => self.requirement(config, id),
            RuleRef::Reference(name) => {
                if let Some(shared) = self.rules.get(name) {
                    return Ok(Arc::clone(shared));
                }
                let config = self
                    .config
                    .shared_requirement_rules
                    .get(name)
                    .ok_or_else(|| anyhow!("reference to unknown PolicyRequirementRule '{}'", name))?;
                self.enter(format!("PolicyRequirementRule '{}'", name))?;
                let built = self.requirement(config, name)?;
                self.leave();
                self.rules.insert(name.clone(), Arc::clone(&built));
                Ok(built)
            }
        }
    }

    fn requirement(&mut self, config: &RequirementConfig, id: &str) -> Result<SharedPolicyRule> {
        let rule: SharedPolicyRule = match config {
            RequirementConfig::Any => policy_rule::matches_all(),
            RequirementConfig::And(children) => Arc::new(AndRule::new(id, self.requirement_children(children, id)?)),
            RequirementConfig::Or(children) => Arc::new(OrRule::new(id, self.requirement_children(children, id)?)),
            RequirementConfig::Not(child) => {
                Arc::new(NotRule::new(id, self.requirement_ref(child, &format!("{}/0", id))?))
            }
            RequirementConfig::Fact { fact, test } => Arc::new(FactRule::new(id, *fact, condition(test, id)?)),
            RequirementConfig::NumOfAttributeValues {
                attribute_id,
                minimum,
                maximum,
            } => Arc::new(NumOfAttributeValuesRule::new(id, attribute_id.clone(), *minimum, *maximum)),
            RequirementConfig::EntityAttribute {
                name,
                name_format,
                test,
            } => {
                let mut rule = EntityAttributeRule::new(id, name.clone(), condition(test, id)?);
                if let Some(format) = name_format {
                    rule = rule.with_name_format(format.clone());
                }
                Arc::new(rule)
            }
            RequirementConfig::InEntityGroup { group } => Arc::new(InEntityGroupRule::new(id, group.clone())),
            RequirementConfig::NameIdFormat { format } => Arc::new(NameIdFormatRule::new(id, format.clone())),
            RequirementConfig::RegistrationAuthority {
                issuers,
                match_if_metadata_silent,
            } => Arc::new(
                RegistrationAuthorityRule::new(id, issuers.iter().cloned())
                    .match_if_metadata_silent(*match_if_metadata_silent),
            ),
            RequirementConfig::Matcher { matcher, attribute_id } => {
                let matcher = self.matcher(matcher, &format!("{}/matcher", id))?;
                let mut rule = MatcherRule::new(id, matcher);
                if let Some(attribute_id) = attribute_id {
                    rule = rule.with_attribute_id(attribute_id.clone());
                }
                Arc::new(rule)
            }
        };
        Ok(rule)
    }

    fn requirement_children(
        &mut self,
        children: &[RuleRef<RequirementConfig>],
        id: &str,
    ) -> Result<Vec<SharedPolicyRule>> {
        children
            .iter()
            .enumerate()
            .map(|(i, child)| self.requirement_ref(child, &format!("{}/{}", id, i)))
            .collect()
    }

    fn matcher_ref(&mut self, matcher: &RuleRef<MatcherConfig>, id: &str) -> Result<SharedMatcher> {
        match matcher {
            RuleRef::Inline(config) => self.matcher(config, id),
            RuleRef::Reference(name) => {
                if let Some(shared) = self.matchers.get(name) {
                    return Ok(Arc::clone(shared));
                }
                let config = self
                    .config
                    .shared_matchers
                    .get(name)
                    .ok_or_else(|| anyhow!("reference to unknown value rule '{}'", name))?;
                self.enter(format!("value rule '{}'", name))?;
                let built = self.matcher(config, name)?;
                self.leave();
                self.matchers.insert(name.clone(), Arc::clone(&built));
                Ok(built)
            }
        }
    }

    fn matcher(&mut self, config: &MatcherConfig, id: &str) -> Result<SharedMatcher> {
        let matcher: SharedMatcher = match config {
            MatcherConfig::Any => matcher::matches_all(),
            MatcherConfig::And(children) => Arc::new(AndMatcher::new(id, self.matcher_children(children, id)?)),
            MatcherConfig::Or(children) => Arc::new(OrMatcher::new(id, self.matcher_children(children, id)?)),
            MatcherConfig::Not(child) => Arc::new(NotMatcher::new(id, self.matcher_ref(child, &format!("{}/0", id))?)),
            MatcherConfig::Value {
                target,
                test,
                attribute_id,
            } => {
                let mut matcher = ValueMatcher::new(id, *target, condition(test, id)?);
                if let Some(attribute_id) = attribute_id {
                    matcher = matcher.with_attribute_id(attribute_id.clone());
                }
                Arc::new(matcher)
            }
            MatcherConfig::InMetadata {
                only_if_required,
                match_if_metadata_silent,
                attribute_name,
                attribute_name_format,
            } => {
                let mut matcher = AttributeInMetadataMatcher::new(id)
                    .only_if_required(*only_if_required)
                    .match_if_metadata_silent(*match_if_metadata_silent);
                if let Some(name) = attribute_name {
                    matcher = matcher.attribute_name(name.clone());
                }
                if let Some(format) = attribute_name_format {
                    matcher = matcher.attribute_name_format(format.clone());
                }
                Arc::new(matcher)
            }
            MatcherConfig::Requirement(rule) => {
                let rule = self.requirement(rule, &format!("{}/rule", id))?;
                Arc::new(PolicyMatcher::new(id, rule))
            }
        };
        Ok(matcher)
    }

    fn matcher_children(&mut self, children: &[RuleRef<MatcherConfig>], id: &str) -> Result<Vec<SharedMatcher>> {
        children
            .iter()
            .enumerate()
            .map(|(i, child)| self.matcher_ref(child, &format!("{}/{}", id, i)))
            .collect()
    }
}

fn condition(test: &StringTest, id: &str) -> Result<StringCondition, FilterError> {
    match test {
        StringTest::Exact {
            value,
            case_sensitive,
        } => Ok(StringCondition::exact(value.clone(), *case_sensitive)),
        StringTest::Regex(pattern) => StringCondition::regex(pattern)
            .map_err(|e| FilterError::configuration(id, format!("invalid regular expression: {}", e))),
    }
}
