use std::fmt;

use serde::Serialize;

/// Three-valued result of a requirement rule.
///
/// `Fail` means the rule could not be evaluated. It propagates through the
/// combinators and is never folded into `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tristate {
    True,
    False,
    Fail,
}

impl Tristate {
    /// Conjunction in order: stops at the first `Fail` or `False`.
    pub fn all<I>(results: I) -> Tristate
    where
        I: IntoIterator<Item = Tristate>,
    {
        for r in results {
            match r {
                Tristate::True => continue,
                other => return other,
            }
        }
        Tristate::True
    }

    /// Disjunction in order: stops at the first `Fail` or `True`.
    pub fn any<I>(results: I) -> Tristate
    where
        I: IntoIterator<Item = Tristate>,
    {
        for r in results {
            match r {
                Tristate::False => continue,
                other => return other,
            }
        }
        Tristate::False
    }

    pub fn negate(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Fail => Tristate::Fail,
        }
    }

    pub fn is_true(self) -> bool {
        self == Tristate::True
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tristate::True => write!(f, "TRUE"),
            Tristate::False => write!(f, "FALSE"),
            Tristate::Fail => write!(f, "FAIL"),
        }
    }
}
