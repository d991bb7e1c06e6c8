//! Attribute Bag
//!
//! The data handed to a template renderer: an island's props, its children
//! resolved into [`ChildSlot`]s, and its hydration payload.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::node::Island;

/// String-keyed mapping of dynamically typed values.
///
/// Used for both static props and hydration payloads.
pub type Props = Map<String, Value>;

/// A child as seen from its parent's template.
#[derive(Debug, Clone)]
pub enum ChildSlot {
    /// An eager child, already rendered to HTML.
    Eager(String),

    /// A lazy child, passed through as a live handle. The template decides
    /// whether and when to call its `Render`.
    Lazy(Island),
}

impl ChildSlot {
    /// The pre-rendered HTML, if this is an eager child.
    pub fn as_html(&self) -> Option<&str> {
        match self {
            ChildSlot::Eager(html) => Some(html),
            ChildSlot::Lazy(_) => None,
        }
    }

    /// The island handle, if this is a lazy child.
    pub fn as_island(&self) -> Option<&Island> {
        match self {
            ChildSlot::Eager(_) => None,
            ChildSlot::Lazy(island) => Some(island),
        }
    }
}

/// `{props, children, payload}` as consumed by a
/// [`TemplateRenderer`](crate::template::TemplateRenderer).
///
/// Templates reach these as `.props.*`, `.children.*` and `.payload.*`.
#[derive(Debug, Clone, Default)]
pub struct AttributeBag {
    /// Static props of the island.
    pub props: Props,

    /// Children keyed by name, in the order they were attached.
    pub children: IndexMap<String, ChildSlot>,

    /// Hydration payload; empty if the island was never hydrated.
    pub payload: Props,
}

impl AttributeBag {
    /// A bag with the given props and nothing else.
    pub fn with_props(props: Props) -> Self {
        Self {
            props,
            ..Self::default()
        }
    }
}
