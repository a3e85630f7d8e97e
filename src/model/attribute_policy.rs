use std::collections::BTreeMap;

use crate::filter::policy_rule::ContextFact;
use crate::filter::matcher::ValueTarget;

/// Parsed representation of an attribute-filter.xml policy group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyGroupConfig {
    pub id: String,
    pub policies: Vec<PolicyConfig>,
    /// Group level `PolicyRequirementRule` definitions, by ID.
    pub shared_requirement_rules: BTreeMap<String, RequirementConfig>,
    /// Group level `PermitValueRule` and `DenyValueRule` definitions, by ID.
    pub shared_matchers: BTreeMap<String, MatcherConfig>,
    /// Group level `AttributeRule` definitions, by ID.
    pub shared_attribute_rules: BTreeMap<String, AttributeRuleConfig>,
}

/// Either an inline definition or the ID of a group level one.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleRef<T> {
    Inline(T),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub id: String,
    pub requirement: RuleRef<RequirementConfig>,
    pub attribute_rules: Vec<RuleRef<AttributeRuleConfig>>,
}

/// Exactly one of `permit` and `deny` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRuleConfig {
    pub id: Option<String>,
    pub attribute_id: String,
    pub permit: Option<RuleRef<MatcherConfig>>,
    pub deny: Option<RuleRef<MatcherConfig>>,
}

impl AttributeRuleConfig {
    pub fn is_deny(&self) -> bool {
        self.deny.is_some()
    }

    pub fn value_rule(&self) -> Option<&RuleRef<MatcherConfig>> {
        self.permit.as_ref().or(self.deny.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringTest {
    Exact { value: String, case_sensitive: bool },
    Regex(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequirementConfig {
    Any,
    And(Vec<RuleRef<RequirementConfig>>),
    Or(Vec<RuleRef<RequirementConfig>>),
    Not(Box<RuleRef<RequirementConfig>>),
    Fact {
        fact: ContextFact,
        test: StringTest,
    },
    NumOfAttributeValues {
        attribute_id: String,
        minimum: usize,
        maximum: usize,
    },
    EntityAttribute {
        name: String,
        name_format: Option<String>,
        test: StringTest,
    },
    InEntityGroup {
        group: String,
    },
    NameIdFormat {
        format: String,
    },
    RegistrationAuthority {
        issuers: Vec<String>,
        match_if_metadata_silent: bool,
    },
    /// A value matcher evaluated as a requirement.
    Matcher {
        matcher: Box<MatcherConfig>,
        attribute_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatcherConfig {
    Any,
    And(Vec<RuleRef<MatcherConfig>>),
    Or(Vec<RuleRef<MatcherConfig>>),
    Not(Box<RuleRef<MatcherConfig>>),
    Value {
        target: ValueTarget,
        test: StringTest,
        attribute_id: Option<String>,
    },
    InMetadata {
        only_if_required: bool,
        match_if_metadata_silent: bool,
        attribute_name: Option<String>,
        attribute_name_format: Option<String>,
    },
    /// A requirement evaluated as a matcher.
    Requirement(Box<RequirementConfig>),
}

impl RequirementConfig {
    /// Short type name for outlines and messages.
    pub fn kind(&self) -> String {
        match self {
            RequirementConfig::Any => "ANY".into(),
            RequirementConfig::And(c) => format!("AND({})", c.len()),
            RequirementConfig::Or(c) => format!("OR({})", c.len()),
            RequirementConfig::Not(_) => "NOT".into(),
            RequirementConfig::Fact { fact, .. } => format!("{} test", fact),
            RequirementConfig::NumOfAttributeValues {
                attribute_id,
                minimum,
                maximum,
            } => format!("{} has {}..={} values", attribute_id, minimum, maximum),
            RequirementConfig::EntityAttribute { name, .. } => format!("entity attribute {}", name),
            RequirementConfig::InEntityGroup { group } => format!("in group {}", group),
            RequirementConfig::NameIdFormat { format } => format!("NameID format {}", format),
            RequirementConfig::RegistrationAuthority { issuers, .. } => {
                format!("registered by {}", issuers.join(" "))
            }
            RequirementConfig::Matcher { matcher, .. } => format!("matcher {}", matcher.kind()),
        }
    }
}

impl MatcherConfig {
    pub fn kind(&self) -> String {
        match self {
            MatcherConfig::Any => "ANY".into(),
            MatcherConfig::And(c) => format!("AND({})", c.len()),
            MatcherConfig::Or(c) => format!("OR({})", c.len()),
            MatcherConfig::Not(_) => "NOT".into(),
            MatcherConfig::Value { target, test, .. } => match test {
                StringTest::Exact { value, .. } => format!("{} = '{}'", target, value),
                StringTest::Regex(re) => format!("{} ~ /{}/", target, re),
            },
            MatcherConfig::InMetadata { .. } => "in metadata".into(),
            MatcherConfig::Requirement(rule) => format!("requirement {}", rule.kind()),
        }
    }
}

impl<T> RuleRef<T> {
    pub fn describe(&self, kind: impl Fn(&T) -> String) -> String {
        match self {
            RuleRef::Inline(inner) => kind(inner),
            RuleRef::Reference(id) => format!("ref {}", id),
        }
    }
}
