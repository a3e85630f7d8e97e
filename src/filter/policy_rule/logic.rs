use super::{PolicyRequirementRule, SharedPolicyRule};
use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::tristate::Tristate;

fn initialize_children(id: &str, children: &[SharedPolicyRule]) -> FilterResult<()> {
    if children.is_empty() {
        return Err(FilterError::configuration(id, "no child rules supplied"));
    }
    children.iter().try_for_each(|c| c.initialize())
}

/// TRUE when every child is TRUE. Children run in order and evaluation
/// stops at the first FALSE or FAIL.
#[derive(Debug)]
pub struct AndRule {
    id: String,
    lifecycle: Lifecycle,
    children: Vec<SharedPolicyRule>,
}

impl AndRule {
    pub fn new(id: impl Into<String>, children: Vec<SharedPolicyRule>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children,
        }
    }

    pub fn children(&self) -> &[SharedPolicyRule] {
        &self.children
    }
}

impl Component for AndRule {
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

impl PolicyRequirementRule for AndRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        for child in &self.children {
            match child.matches(ctx)? {
                Tristate::True => {}
                decided => return Ok(decided),
            }
        }
        Ok(Tristate::True)
    }
}

/// TRUE when some child is TRUE. Children run in order and evaluation stops
/// at the first TRUE or FAIL.
#[derive(Debug)]
pub struct OrRule {
    id: String,
    lifecycle: Lifecycle,
    children: Vec<SharedPolicyRule>,
}

impl OrRule {
    pub fn new(id: impl Into<String>, children: Vec<SharedPolicyRule>) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            children,
        }
    }

    pub fn children(&self) -> &[SharedPolicyRule] {
        &self.children
    }
}

impl Component for OrRule {
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

impl PolicyRequirementRule for OrRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        for child in &self.children {
            match child.matches(ctx)? {
                Tristate::False => {}
                decided => return Ok(decided),
            }
        }
        Ok(Tristate::False)
    }
}

#[derive(Debug)]
pub struct NotRule {
    id: String,
    lifecycle: Lifecycle,
    child: SharedPolicyRule,
}

impl NotRule {
    pub fn new(id: impl Into<String>, child: SharedPolicyRule) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            child,
        }
    }

    pub fn child(&self) -> &SharedPolicyRule {
        &self.child
    }
}

impl Component for NotRule {
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

impl PolicyRequirementRule for NotRule {
    fn evaluate(&self, ctx: &FilterContext) -> FilterResult<Tristate> {
        Ok(self.child.matches(ctx)?.negate())
    }
}
