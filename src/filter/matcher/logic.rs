use tracing::debug;

use super::{Matcher, SharedMatcher};
use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::model::attribute::{Attribute, ValueSet};

fn initialize_children(id: &str, children: &[SharedMatcher]) -> FilterResult<()> {
    if children.is_empty() {
        return Err(FilterError::configuration(id, "no child matchers supplied"));
    }
    children.iter().try_for_each(|c| c.initialize())
}

/// Values selected by every child (intersection).
#[derive(Debug)]
pub struct AndMatcher {
    id: String,
    lifecycle: Lifecycle,
    children: Vec<SharedMatcher>,
}

impl AndMatcher {
    pub fn new(id: impl Into<String>, children: Vec<SharedMatcher>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children,
        }
    }

    pub fn children(&self) -> &[SharedMatcher] {
        &self.children
    }
}

impl Component for AndMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        initialize_children(&self.id, &self.children)
    }
}

impl Matcher for AndMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        let mut result: Option<ValueSet> = None;
        for child in &self.children {
            let values = child.matching_values(attribute, ctx)?;
            let next = match result {
                None => values,
                Some(acc) => acc.intersection(&values).cloned().collect(),
            };
            if next.is_empty() {
                debug!(matcher = %self.id, child = child.id(), "intersection became empty");
                return Ok(next);
            }
            result = Some(next);
        }
        Ok(result.unwrap_or_default())
    }
}

/// Values selected by any child (union).
#[derive(Debug)]
pub struct OrMatcher {
    id: String,
    lifecycle: Lifecycle,
    children: Vec<SharedMatcher>,
}

impl OrMatcher {
    pub fn new(id: impl Into<String>, children: Vec<SharedMatcher>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children,
        }
    }

    pub fn children(&self) -> &[SharedMatcher] {
        &self.children
    }
}

impl Component for OrMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        initialize_children(&self.id, &self.children)
    }
}

impl Matcher for OrMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        let mut result = ValueSet::new();
        for child in &self.children {
            result.extend(child.matching_values(attribute, ctx)?);
        }
        Ok(result)
    }
}

/// Values the child does not select.
#[derive(Debug)]
pub struct NotMatcher {
    id: String,
    lifecycle: Lifecycle,
    child: SharedMatcher,
}

impl NotMatcher {
    pub fn new(id: impl Into<String>, child: SharedMatcher) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            child,
        }
    }

    pub fn child(&self) -> &SharedMatcher {
        &self.child
    }
}

impl Component for NotMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.child.initialize()
    }
}

impl Matcher for NotMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        let selected = self.child.matching_values(attribute, ctx)?;
        Ok(attribute
            .values()
            .iter()
            .filter(|v| !selected.contains(*v))
            .cloned()
            .collect())
    }
}
