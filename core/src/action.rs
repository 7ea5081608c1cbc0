//! Action tags and tag classes.
//!
//! Every slice action enum has a closed set of variants. Each variant carries
//! a string tag (`SEARCH_PRODUCTS_SUCCESS`) used for logging and metrics, and
//! belongs to one tag class that describes what kind of transition it drives.
//!
//! `#[derive(Action)]` from `storefront-state-macros` implements [`Action`]
//! from the variant names and `#[start]`/`#[success]`/`#[fail]`/`#[reset]`
//! attributes.

/// The class of an action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Begins an asynchronous operation (`*_START`, `SEARCH_PRODUCTS`)
    Start,
    /// Completes an asynchronous operation with a payload
    Success,
    /// Completes an asynchronous operation without a usable payload
    Fail,
    /// Returns the slice to its initial value (`*_CLEAN`)
    Reset,
    /// Anything else (synchronous intents such as selecting a delivery mode)
    Command,
}

impl ActionKind {
    /// Whether this class completes an asynchronous operation.
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }

    /// Lowercase label for metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Reset => "reset",
            Self::Command => "command",
        }
    }
}

/// An action with a stable tag.
pub trait Action {
    /// The SCREAMING_SNAKE tag of this action, unique within its slice.
    fn kind(&self) -> &'static str;

    /// The tag class of this action.
    fn tag_class(&self) -> ActionKind;
}
