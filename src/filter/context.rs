use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FilterError, FilterResult};
use crate::model::attribute::{Attribute, AttributeValue, ValueSet};
use crate::model::metadata::RelyingPartyMetadata;

/// Computes the relying party's metadata for a context.
pub type MetadataLookup = Box<dyn Fn(&FilterContext) -> Option<RelyingPartyMetadata>>;

/// Per-request state of one filtering pass.
///
/// Holds the prefiltered input, the filtered output, the request facts the
/// rules consult, and the [`WorkContext`] accumulating permitted and denied
/// values. A context is used by a single pass and is never shared.
#[derive(Default)]
pub struct FilterContext {
    prefiltered: BTreeMap<String, Attribute>,
    filtered: BTreeMap<String, Attribute>,
    principal: Option<String>,
    principal_authentication_method: Option<String>,
    attribute_issuer_id: Option<String>,
    attribute_recipient_id: Option<String>,
    metadata_lookup: Option<MetadataLookup>,
    metadata: OnceCell<Option<RelyingPartyMetadata>>,
    work: Option<WorkContext>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_authentication_method(mut self, method: impl Into<String>) -> Self {
        self.principal_authentication_method = Some(method.into());
        self
    }

    pub fn with_attribute_issuer_id(mut self, issuer: impl Into<String>) -> Self {
        self.attribute_issuer_id = Some(issuer.into());
        self
    }

    pub fn with_attribute_recipient_id(mut self, recipient: impl Into<String>) -> Self {
        self.attribute_recipient_id = Some(recipient.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.add_prefiltered_attribute(attribute);
        self
    }

    pub fn with_metadata_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&FilterContext) -> Option<RelyingPartyMetadata> + 'static,
    {
        self.set_metadata_lookup(lookup);
        self
    }

    pub fn prefiltered_attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.prefiltered
    }

    pub fn prefiltered_attribute(&self, id: &str) -> Option<&Attribute> {
        self.prefiltered.get(id)
    }

    pub fn add_prefiltered_attribute(&mut self, attribute: Attribute) {
        self.prefiltered.insert(attribute.id().to_string(), attribute);
    }

    /// Replaces the prefiltered attributes. Later duplicates of an ID win.
    pub fn set_prefiltered_attributes<I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = Attribute>,
    {
        self.prefiltered = attributes
            .into_iter()
            .map(|a| (a.id().to_string(), a))
            .collect();
    }

    pub fn filtered_attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.filtered
    }

    pub fn filtered_attribute(&self, id: &str) -> Option<&Attribute> {
        self.filtered.get(id)
    }

    pub(crate) fn insert_filtered_attribute(&mut self, attribute: Attribute) {
        self.filtered.insert(attribute.id().to_string(), attribute);
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn set_principal(&mut self, principal: Option<String>) {
        self.principal = principal;
    }

    pub fn principal_authentication_method(&self) -> Option<&str> {
        self.principal_authentication_method.as_deref()
    }

    pub fn set_principal_authentication_method(&mut self, method: Option<String>) {
        self.principal_authentication_method = method;
    }

    pub fn attribute_issuer_id(&self) -> Option<&str> {
        self.attribute_issuer_id.as_deref()
    }

    pub fn set_attribute_issuer_id(&mut self, issuer: Option<String>) {
        self.attribute_issuer_id = issuer;
    }

    pub fn attribute_recipient_id(&self) -> Option<&str> {
        self.attribute_recipient_id.as_deref()
    }

    pub fn set_attribute_recipient_id(&mut self, recipient: Option<String>) {
        self.attribute_recipient_id = recipient;
    }

    /// Installs the metadata lookup and forgets any cached result.
    pub fn set_metadata_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&FilterContext) -> Option<RelyingPartyMetadata> + 'static,
    {
        self.metadata_lookup = Some(Box::new(lookup));
        self.metadata = OnceCell::new();
    }

    /// The requester's metadata, computed by the lookup on first access and
    /// cached for the rest of the context's life.
    ///
    /// The lookup must not call back into this method.
    pub fn requester_metadata(&self) -> Option<&RelyingPartyMetadata> {
        self.metadata
            .get_or_init(|| self.metadata_lookup.as_ref().and_then(|lookup| lookup(self)))
            .as_ref()
    }

    pub fn work_context(&self) -> Option<&WorkContext> {
        self.work.as_ref()
    }

    /// Attaches an empty work context unless one is already present.
    pub fn attach_work_context(&mut self) -> &mut WorkContext {
        self.work.get_or_insert_with(WorkContext::default)
    }

    pub fn add_permitted_values<I>(&mut self, attribute_id: &str, values: I) -> FilterResult<()>
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        self.record(ValueDisposition::Permitted, attribute_id, values)
    }

    pub fn add_denied_values<I>(&mut self, attribute_id: &str, values: I) -> FilterResult<()>
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        self.record(ValueDisposition::Denied, attribute_id, values)
    }

    fn record<I>(&mut self, disposition: ValueDisposition, attribute_id: &str, values: I) -> FilterResult<()>
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        let id = attribute_id.trim();
        if id.is_empty() {
            return Err(FilterError::invariant(attribute_id, "attribute ID must not be empty"));
        }
        let attribute = self.prefiltered.get(id).ok_or_else(|| {
            FilterError::invariant(id, "no attribute with this ID exists in the prefiltered set")
        })?;

        let mut checked = ValueSet::new();
        for value in values {
            if !attribute.contains(&value) {
                return Err(FilterError::invariant(
                    id,
                    format!("{} value '{}' is not a current value of the attribute", disposition, value),
                ));
            }
            checked.insert(value);
        }
        if checked.is_empty() {
            return Ok(());
        }

        let work = self.work.get_or_insert_with(WorkContext::default);
        let target = match disposition {
            ValueDisposition::Permitted => &mut work.permitted,
            ValueDisposition::Denied => &mut work.denied,
        };
        target.entry(id.to_string()).or_default().extend(checked);
        Ok(())
    }
}

impl fmt::Debug for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterContext")
            .field("prefiltered", &self.prefiltered)
            .field("filtered", &self.filtered)
            .field("principal", &self.principal)
            .field("principal_authentication_method", &self.principal_authentication_method)
            .field("attribute_issuer_id", &self.attribute_issuer_id)
            .field("attribute_recipient_id", &self.attribute_recipient_id)
            .field("has_metadata_lookup", &self.metadata_lookup.is_some())
            .field("work", &self.work)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueDisposition {
    Permitted,
    Denied,
}

impl fmt::Display for ValueDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDisposition::Permitted => write!(f, "permitted"),
            ValueDisposition::Denied => write!(f, "denied"),
        }
    }
}

/// Permitted and denied values per attribute, accumulated over all policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkContext {
    permitted: BTreeMap<String, ValueSet>,
    denied: BTreeMap<String, ValueSet>,
}

impl WorkContext {
    pub fn permitted_values(&self) -> &BTreeMap<String, ValueSet> {
        &self.permitted
    }

    pub fn denied_values(&self) -> &BTreeMap<String, ValueSet> {
        &self.denied
    }

    /// Permitted minus denied values for one attribute.
    pub fn releasable_values(&self, attribute_id: &str) -> ValueSet {
        let Some(permitted) = self.permitted.get(attribute_id) else {
            return ValueSet::new();
        };
        match self.denied.get(attribute_id) {
            Some(denied) => permitted.difference(denied).cloned().collect(),
            None => permitted.clone(),
        }
    }
}
