//! Island Nodes
//!
//! This module defines the island tree unit and its composition logic.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use super::bag::{AttributeBag, ChildSlot, Props};
use crate::error::{DecodeError, RenderError};
use crate::template::{self, TemplateRenderer};

/// How a child is handed to its parent's template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMode {
    /// Render the child first and pass its HTML.
    Eager,

    /// Pass the child handle; the template calls `.Render` if it wants it.
    Lazy,
}

impl From<bool> for ChildMode {
    /// `true` means eager.
    fn from(eager: bool) -> Self {
        if eager {
            ChildMode::Eager
        } else {
            ChildMode::Lazy
        }
    }
}

#[derive(Debug, Clone)]
struct ChildEntry {
    island: Island,
    mode: ChildMode,
}

/// Mutable part of an island.
#[derive(Debug, Clone, Default)]
struct IslandState {
    props: Props,
    children: IndexMap<String, ChildEntry>,
    payload: Option<Props>,
}

struct IslandInner {
    name: Arc<str>,
    template: Arc<str>,
    renderer: Arc<dyn TemplateRenderer>,
    state: RwLock<IslandState>,
}

/// A named, template-backed, composable rendering unit.
///
/// `Island` is a handle: cloning it yields another handle to the same node,
/// which is how one child can be attached to several parents. Mutating
/// methods take `&self` and return `&Self` so calls can be chained:
///
/// ```rust
/// use oasis_core::island::{ChildMode, Island};
///
/// let card = Island::new("card", "<div>{{.props.title}}</div>");
/// card.add_prop("title", "Hi");
///
/// let page = Island::new("page", "<section>{{.children.card}}</section>");
/// page.add_child(&card, ChildMode::Eager);
///
/// assert_eq!(page.render().unwrap(), "<section><div>Hi</div></section>");
/// ```
#[derive(Clone)]
pub struct Island {
    inner: Arc<IslandInner>,
}

impl Island {
    /// Create an island rendered by the shared [`TextRenderer`](crate::template::TextRenderer).
    pub fn new(name: impl Into<Arc<str>>, template: impl Into<Arc<str>>) -> Self {
        Self::with_renderer(name, template, template::shared_renderer())
    }

    /// Create an island rendered by `renderer`.
    pub fn with_renderer(
        name: impl Into<Arc<str>>,
        template: impl Into<Arc<str>>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            inner: Arc::new(IslandInner {
                name: name.into(),
                template: template.into(),
                renderer,
                state: RwLock::new(IslandState::default()),
            }),
        }
    }

    /// The island's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The island's template source.
    pub fn template(&self) -> &str {
        &self.inner.template
    }

    /// A copy of the island's props.
    pub fn props(&self) -> Props {
        self.inner.state.read().props.clone()
    }

    /// A copy of the current payload, or `None` if never hydrated.
    pub fn payload(&self) -> Option<Props> {
        self.inner.state.read().payload.clone()
    }

    /// Look up a child by name.
    pub fn child(&self, name: &str) -> Option<(Island, ChildMode)> {
        self.inner
            .state
            .read()
            .children
            .get(name)
            .map(|entry| (entry.island.clone(), entry.mode))
    }

    /// Names of all children, in attach order.
    pub fn child_names(&self) -> Vec<String> {
        self.inner.state.read().children.keys().cloned().collect()
    }

    /// Set one prop, overwriting any previous value under `name`.
    pub fn add_prop(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner
            .state
            .write()
            .props
            .insert(name.into(), value.into());
        self
    }

    /// Merge `props` into the island's props, last write wins.
    ///
    /// If the island has no props yet, `props` is taken over as-is.
    pub fn add_props(&self, props: Props) -> &Self {
        let mut state = self.inner.state.write();
        if state.props.is_empty() {
            state.props = props;
        } else {
            state.props.extend(props);
        }
        drop(state);
        self
    }

    /// Attach `child` under its own name, replacing any child of that name.
    pub fn add_child(&self, child: &Island, mode: impl Into<ChildMode>) -> &Self {
        let entry = ChildEntry {
            island: child.clone(),
            mode: mode.into(),
        };
        self.inner
            .state
            .write()
            .children
            .insert(child.name().to_string(), entry);
        self
    }

    /// Replace the payload.
    pub fn hydrate(&self, payload: Props) -> &Self {
        self.inner.state.write().payload = Some(payload);
        self
    }

    /// Decode `payload` as a JSON object and hydrate with it.
    ///
    /// On failure the current payload is left untouched.
    pub fn hydrate_bytes(&self, payload: &[u8]) -> Result<&Self, DecodeError> {
        let payload = decode_payload(payload)?;
        Ok(self.hydrate(payload))
    }

    /// Build the attribute bag this island would hand to its renderer.
    ///
    /// Eager children are rendered here; the first failure aborts and is
    /// reported against that child's name.
    pub fn attribute_bag(&self) -> Result<AttributeBag, RenderError> {
        // Snapshot so no lock is held while children render.
        let state = self.inner.state.read().clone();

        let mut children = IndexMap::with_capacity(state.children.len());
        for (name, entry) in state.children {
            let slot = match entry.mode {
                ChildMode::Eager => {
                    let html = entry.island.render().map_err(|source| RenderError::Child {
                        child: name.clone(),
                        source: Box::new(source),
                    })?;
                    ChildSlot::Eager(html)
                }
                ChildMode::Lazy => ChildSlot::Lazy(entry.island),
            };
            children.insert(name, slot);
        }

        Ok(AttributeBag {
            props: state.props,
            children,
            payload: state.payload.unwrap_or_default(),
        })
    }

    /// Render the island and, eagerly, its children.
    pub fn render(&self) -> Result<String, RenderError> {
        let bag = self.attribute_bag()?;
        debug!(
            island = self.name(),
            children = bag.children.len(),
            "rendering island"
        );

        self.inner
            .renderer
            .render(&self.inner.template, &bag)
            .map_err(|source| {
                warn!(island = self.name(), error = %source, "island template failed");
                RenderError::Template {
                    island: self.name().to_string(),
                    source,
                }
            })
    }

    /// A request-scoped copy of this island.
    ///
    /// The copy shares name, template and renderer, starts with the same
    /// props and child handles, and has no payload. Hydrating the copy never
    /// affects the original.
    pub fn fork(&self) -> Self {
        let state = self.inner.state.read();
        Self {
            inner: Arc::new(IslandInner {
                name: Arc::clone(&self.inner.name),
                template: Arc::clone(&self.inner.template),
                renderer: Arc::clone(&self.inner.renderer),
                state: RwLock::new(IslandState {
                    props: state.props.clone(),
                    children: state.children.clone(),
                    payload: None,
                }),
            }),
        }
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(a: &Island, b: &Island) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Island")
            .field("name", &self.inner.name)
            .field("props", &state.props)
            .field("children", &state.children.keys().collect::<Vec<_>>())
            .field("hydrated", &state.payload.is_some())
            .finish()
    }
}

/// Render `island`, panicking on failure.
///
/// # Panics
///
/// Panics if rendering fails. This turns a recoverable [`RenderError`] into
/// a crash of the calling thread (or of the whole process under
/// `panic = "abort"`). Only use it where the template is known not to fail,
/// such as static markup rendered once at startup. Request paths should call
/// [`Island::render`] and handle the error.
pub fn must_render(island: &Island) -> String {
    match island.render() {
        Ok(html) => html,
        Err(err) => panic!("island `{}` failed to render: {err}", island.name()),
    }
}

fn decode_payload(bytes: &[u8]) -> Result<Props, DecodeError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(template::json_kind(&other))),
    }
}
