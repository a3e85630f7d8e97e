//! Shibboleth style attribute release filtering.
//!
//! An [`AttributeFilterEngine`](filter::AttributeFilterEngine) applies an
//! ordered list of policies to the attributes of one request and keeps only
//! the values some policy permits and no policy denies.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod parsers;
pub mod report;
