use std::error::Error as StdError;
use std::fmt;

mod dom;
mod guard;
mod html;
mod page;
mod selector;

use dom::*;
use html::*;
use selector::*;

pub use dom::NodeId;
pub use guard::{
    DEFAULT_FORM_SELECTOR, DEFAULT_SUBMIT_BUTTONS_SELECTOR, DEFAULT_SUBMIT_CLASS, FormGuard,
    GuardConfig, GuardOptions,
};
pub use page::{EventHandler, EventState, Page};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    Runtime(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}
