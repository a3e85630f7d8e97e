use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{FilterError, FilterResult};

/// Activation state shared by every filter component.
///
/// Components are configured at construction, activated once through
/// [`Component::initialize`], and may later be destroyed. Evaluation is only
/// allowed in between.
#[derive(Debug)]
pub struct Lifecycle {
    initialized: AtomicBool,
    destroyed: AtomicBool,
    pinned: bool,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            pinned: false,
        }
    }

    /// Always active and never destroyed. Used by the built-in constants.
    pub const fn pinned() -> Self {
        Self {
            initialized: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
            pinned: true,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    fn mark_destroyed(&self) {
        if !self.pinned {
            self.destroyed.store(true, Ordering::Release);
        }
    }

    pub fn ensure_active(&self, component: &str) -> FilterResult<()> {
        if self.is_destroyed() {
            return Err(FilterError::Destroyed {
                component: component.to_string(),
            });
        }
        if !self.is_initialized() {
            return Err(FilterError::Uninitialized {
                component: component.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// An identified, lifecycle-managed filter component.
pub trait Component: Send + Sync {
    fn id(&self) -> &str;

    fn lifecycle(&self) -> &Lifecycle;

    /// Component specific validation, and activation of owned children.
    fn do_initialize(&self) -> FilterResult<()> {
        Ok(())
    }

    /// Validates the configuration and activates the component.
    ///
    /// Calling this on an active component is a no-op; calling it on a
    /// destroyed one is an error.
    fn initialize(&self) -> FilterResult<()> {
        let lifecycle = self.lifecycle();
        if lifecycle.is_destroyed() {
            return Err(FilterError::Destroyed {
                component: self.id().to_string(),
            });
        }
        if lifecycle.is_initialized() {
            return Ok(());
        }
        if self.id().trim().is_empty() {
            return Err(FilterError::configuration(
                "<unnamed>",
                "component ID must not be empty",
            ));
        }
        self.do_initialize()?;
        lifecycle.mark_initialized();
        Ok(())
    }

    /// Tears the component down. Children are left alone since they may be
    /// shared with other components.
    fn destroy(&self) {
        self.lifecycle().mark_destroyed();
    }

    fn is_initialized(&self) -> bool {
        self.lifecycle().is_initialized()
    }

    fn is_destroyed(&self) -> bool {
        self.lifecycle().is_destroyed()
    }

    fn ensure_active(&self) -> FilterResult<()> {
        self.lifecycle().ensure_active(self.id())
    }
}

/// Lifecycle shared by the built-in constant rules and matchers.
pub(crate) static BUILTIN: Lifecycle = Lifecycle::pinned();
