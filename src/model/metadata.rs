use serde::{Deserialize, Serialize};

/// SAML 2 attribute name format meaning "no format given".
pub const NAME_FORMAT_UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";

/// Pre-computed facts about the relying party, as SAML metadata would
/// describe it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelyingPartyMetadata {
    pub entity_id: String,
    pub entity_attributes: Vec<EntityAttribute>,
    pub registration_authority: Option<String>,
    /// Enclosing entity groups, innermost first.
    pub groups: Vec<EntityGroup>,
    pub name_id_formats: Vec<String>,
    pub attribute_consuming_service: Option<AttributeConsumingService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityGroup {
    pub name: String,
    pub registration_authority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityAttribute {
    pub name: String,
    pub name_format: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeConsumingService {
    pub requested_attributes: Vec<RequestedAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestedAttribute {
    pub name: String,
    pub name_format: Option<String>,
    pub is_required: bool,
    pub values: Vec<String>,
}

impl RelyingPartyMetadata {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Values of every entity attribute with this name (and format, when one
    /// is given). `None` when no such entity attribute carries a value.
    pub fn entity_attribute_values(&self, name: &str, name_format: Option<&str>) -> Option<Vec<&str>> {
        let values: Vec<&str> = self
            .entity_attributes
            .iter()
            .filter(|a| a.name == name)
            .filter(|a| name_format.is_none() || a.name_format.as_deref() == name_format)
            .flat_map(|a| a.values.iter().map(String::as_str))
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// The entity's own registration authority, else the nearest group's.
    pub fn effective_registration_authority(&self) -> Option<&str> {
        self.registration_authority
            .as_deref()
            .or_else(|| self.groups.iter().find_map(|g| g.registration_authority.as_deref()))
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g.name == group)
    }

    pub fn supports_name_id_format(&self, format: &str) -> bool {
        self.name_id_formats.iter().any(|f| f == format)
    }
}

impl AttributeConsumingService {
    /// First requested attribute with this name whose format is compatible.
    ///
    /// Formats are compatible when either side is absent or unspecified, or
    /// when they are equal.
    pub fn find(&self, name: &str, name_format: Option<&str>) -> Option<&RequestedAttribute> {
        self.requested_attributes.iter().find(|ra| {
            if ra.name != name {
                return false;
            }
            match (name_format, ra.name_format.as_deref()) {
                (None, _) | (_, None) => true,
                (_, Some(NAME_FORMAT_UNSPECIFIED)) => true,
                (Some(wanted), Some(have)) => wanted == have,
            }
        })
    }
}
