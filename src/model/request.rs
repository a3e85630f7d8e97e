use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::filter::context::FilterContext;
use crate::model::attribute::{Attribute, AttributeValue};
use crate::model::metadata::RelyingPartyMetadata;

/// One filtering request, as stored in a JSON request file.
///
/// ```json
/// {
///   "principal": "jdoe",
///   "requester": "https://sp.example.org/shibboleth",
///   "attributes": { "uid": ["jdoe"], "mail": ["jdoe@example.org"] },
///   "metadata": { "entity_id": "https://sp.example.org/shibboleth" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterRequest {
    pub principal: Option<String>,
    pub authentication_method: Option<String>,
    pub issuer: Option<String>,
    pub requester: Option<String>,
    pub attributes: BTreeMap<String, Vec<AttributeValue>>,
    pub metadata: Option<RelyingPartyMetadata>,
}

impl FilterRequest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid request file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A fresh context for one filtering pass. The metadata, when present, is
    /// served through the context's metadata lookup.
    pub fn to_context(&self) -> FilterContext {
        let mut ctx = FilterContext::new();
        ctx.set_principal(self.principal.clone());
        ctx.set_principal_authentication_method(self.authentication_method.clone());
        ctx.set_attribute_issuer_id(self.issuer.clone());
        ctx.set_attribute_recipient_id(self.requester.clone());
        ctx.set_prefiltered_attributes(
            self.attributes
                .iter()
                .map(|(id, values)| Attribute::with_values(id.clone(), values.clone())),
        );
        if let Some(metadata) = self.metadata.clone() {
            ctx.set_metadata_lookup(move |_| Some(metadata.clone()));
        }
        ctx
    }
}
