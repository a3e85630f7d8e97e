use std::collections::BTreeSet;

use tracing::debug;

use super::PolicyRequirementRule;
use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::string_match::StringCondition;
use crate::filter::tristate::Tristate;
use crate::model::metadata::RelyingPartyMetadata;

fn metadata<'a>(rule: &str, ctx: &'a FilterContext) -> Option<&'a RelyingPartyMetadata> {
    let md = ctx.requester_metadata();
    if md.is_none() {
        debug!(rule, "no relying party metadata available");
    }
    md
}

/// Checks an entity attribute (such as an entity category) in the relying
/// party's metadata.
#[derive(Debug)]
pub struct EntityAttributeRule {
    id: String,
    lifecycle: Lifecycle,
    name: String,
    name_format: Option<String>,
    condition: StringCondition,
}

impl EntityAttributeRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, condition: StringCondition) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            name: name.into(),
            name_format: None,
            condition,
        }
    }

    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Component for EntityAttributeRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        if self.name.trim().is_empty() {
            return Err(FilterError::configuration(&self.id, "no entity attribute name supplied"));
        }
        self.condition.validate(&self.id)
    }
}

impl PolicyRequirementRule for EntityAttributeRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        let Some(md) = metadata(&self.id, ctx) else {
            return Ok(Tristate::False);
        };
        let found = md
            .entity_attribute_values(&self.name, self.name_format.as_deref())
            .is_some_and(|values| values.iter().any(|v| self.condition.matches(v)));
        Ok(found.into())
    }
}

/// TRUE when the relying party belongs to the named entity group.
#[derive(Debug)]
pub struct InEntityGroupRule {
    id: String,
    lifecycle: Lifecycle,
    group: String,
}

impl InEntityGroupRule {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            group: group.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Component for InEntityGroupRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        if self.group.trim().is_empty() {
            return Err(FilterError::configuration(&self.id, "no group ID supplied"));
        }
        Ok(())
    }
}

impl PolicyRequirementRule for InEntityGroupRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        Ok(metadata(&self.id, ctx)
            .is_some_and(|md| md.is_in_group(&self.group))
            .into())
    }
}

/// TRUE when the relying party supports the given NameID format.
#[derive(Debug)]
pub struct NameIdFormatRule {
    id: String,
    lifecycle: Lifecycle,
    format: String,
}

impl NameIdFormatRule {
    pub fn new(id: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            format: format.into(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Component for NameIdFormatRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        if self.format.trim().is_empty() {
            return Err(FilterError::configuration(&self.id, "no NameID format supplied"));
        }
        Ok(())
    }
}

impl PolicyRequirementRule for NameIdFormatRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        Ok(metadata(&self.id, ctx)
            .is_some_and(|md| md.supports_name_id_format(&self.format))
            .into())
    }
}

/// TRUE when the relying party was registered by one of the given
/// registration authorities.
///
/// Without metadata or registration information the answer is
/// `match_if_metadata_silent`.
#[derive(Debug)]
pub struct RegistrationAuthorityRule {
    id: String,
    lifecycle: Lifecycle,
    issuers: BTreeSet<String>,
    match_if_metadata_silent: bool,
}

impl RegistrationAuthorityRule {
    pub fn new<I, S>(id: impl Into<String>, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            issuers: issuers.into_iter().map(Into::into).collect(),
            match_if_metadata_silent: false,
        }
    }

    pub fn match_if_metadata_silent(mut self, match_if_silent: bool) -> Self {
        self.match_if_metadata_silent = match_if_silent;
        self
    }

    pub fn issuers(&self) -> &BTreeSet<String> {
        &self.issuers
    }
}

impl Component for RegistrationAuthorityRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        if self.issuers.is_empty() {
            return Err(FilterError::configuration(&self.id, "no registration authorities supplied"));
        }
        Ok(())
    }
}

impl PolicyRequirementRule for RegistrationAuthorityRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        match metadata(&self.id, ctx).and_then(RelyingPartyMetadata::effective_registration_authority) {
            Some(authority) => Ok(self.issuers.contains(authority).into()),
            None => Ok(self.match_if_metadata_silent.into()),
        }
    }
}
