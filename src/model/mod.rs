pub mod attribute;
pub mod attribute_policy;
pub mod metadata;
pub mod request;
