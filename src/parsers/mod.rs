pub mod attribute_policy;
