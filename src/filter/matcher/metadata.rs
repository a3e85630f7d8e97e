use tracing::debug;

use super::Matcher;
use crate::error::FilterResult;
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::model::attribute::{Attribute, ValueSet};
use crate::model::metadata::NAME_FORMAT_UNSPECIFIED;

/// Selects the values the relying party asks for in its attribute consuming
/// service.
#[derive(Debug)]
pub struct AttributeInMetadataMatcher {
    id: String,
    lifecycle: Lifecycle,
    only_if_required: bool,
    match_if_metadata_silent: bool,
    attribute_name: Option<String>,
    attribute_name_format: Option<String>,
}

impl AttributeInMetadataMatcher {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            only_if_required: true,
            match_if_metadata_silent: false,
            attribute_name: None,
            attribute_name_format: None,
        }
    }

    pub fn only_if_required(mut self, only_if_required: bool) -> Self {
        self.only_if_required = only_if_required;
        self
    }

    pub fn match_if_metadata_silent(mut self, match_if_silent: bool) -> Self {
        self.match_if_metadata_silent = match_if_silent;
        self
    }

    pub fn attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_name = Some(name.into());
        self
    }

    /// The unspecified format is the same as no format.
    pub fn attribute_name_format(mut self, format: impl Into<String>) -> Self {
        let format = format.into();
        self.attribute_name_format = (format != NAME_FORMAT_UNSPECIFIED).then_some(format);
        self
    }
}

impl Component for AttributeInMetadataMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl Matcher for AttributeInMetadataMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        let Some(acs) = ctx
            .requester_metadata()
            .and_then(|md| md.attribute_consuming_service.as_ref())
        else {
            debug!(matcher = %self.id, silent_match = self.match_if_metadata_silent, "no attribute consuming service");
            return Ok(if self.match_if_metadata_silent {
                attribute.value_set()
            } else {
                ValueSet::new()
            });
        };

        let name = self.attribute_name.as_deref().unwrap_or(attribute.id());
        let Some(requested) = acs.find(name, self.attribute_name_format.as_deref()) else {
            debug!(matcher = %self.id, attribute = name, "attribute not requested");
            return Ok(ValueSet::new());
        };

        if self.only_if_required && !requested.is_required {
            debug!(matcher = %self.id, attribute = name, "attribute requested but not required");
            return Ok(ValueSet::new());
        }

        if requested.values.is_empty() {
            return Ok(attribute.value_set());
        }
        Ok(attribute
            .values()
            .iter()
            .filter(|v| {
                v.text()
                    .is_some_and(|text| requested.values.iter().any(|r| r == text))
            })
            .cloned()
            .collect())
    }
}
