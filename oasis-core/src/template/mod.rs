//! Template Rendering
//!
//! Islands do not interpret their template text themselves. They build an
//! [`AttributeBag`] and hand `(template, bag)` to a [`TemplateRenderer`].
//!
//! # The default engine
//!
//! [`TextRenderer`] understands a small action language in the style of Go
//! templates, enough to compose islands:
//!
//! ```text
//! <h1>{{ .props.title }}</h1>
//! {{ .children.header }}                  eager child: pre-rendered HTML
//! {{ if .payload.user }}
//!   {{ .children.profile.Render }}        lazy child: rendered right here
//! {{ else }}
//!   <a href="/login">Sign in</a>
//! {{ end }}
//! <ul>{{ range .payload.items }}<li>{{ . }}</li>{{ end }}</ul>
//! ```
//!
//! Supported forms:
//!
//! - `.`, `.a.b` (relative to the current context) and `$`, `$.a.b`
//!   (relative to the bag); the bag exposes `props`, `children`, `payload`.
//! - JSON literals: `"text"`, `42`, `true`, `null`.
//! - `if` / `else if` / `else`, `range` (arrays and maps), `with`, `end`.
//! - `{{/* comments */}}` and `{{-` / `-}}` whitespace trimming.
//!
//! Strings coming from props or payload are HTML-escaped on output. Child
//! HTML, eager or produced by `.Render`, is inserted verbatim. Missing map
//! keys print nothing; reading a field of a string or number is an error.
//!
//! Parsed templates are cached by source text, so a template shared by many
//! islands (or many forks of one island) is parsed once per renderer.

mod exec;
mod parse;

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use crate::error::TemplateError;
use crate::island::AttributeBag;

pub(crate) use exec::json_kind;

/// Executes template source against an attribute bag.
///
/// Implemented for plain closures, which is handy for wrapping another
/// engine.
pub trait TemplateRenderer: Send + Sync {
    /// Render `source` with `bag` as its data.
    fn render(&self, source: &str, bag: &AttributeBag) -> Result<String, TemplateError>;
}

impl<F> TemplateRenderer for F
where
    F: Fn(&str, &AttributeBag) -> Result<String, TemplateError> + Send + Sync,
{
    fn render(&self, source: &str, bag: &AttributeBag) -> Result<String, TemplateError> {
        self(source, bag)
    }
}

/// A parsed template, ready to execute any number of times.
#[derive(Debug)]
pub struct Template {
    nodes: Vec<parse::Node>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parse::parse(source)?,
        })
    }

    /// Execute the template against `bag`.
    pub fn execute(&self, bag: &AttributeBag) -> Result<String, TemplateError> {
        let mut executor = exec::Executor::new(bag);
        executor.run(&self.nodes)?;
        Ok(executor.finish())
    }
}

/// The default [`TemplateRenderer`], with a cache of parsed templates.
#[derive(Debug, Default)]
pub struct TextRenderer {
    cache: DashMap<Arc<str>, Arc<Template>>,
}

impl TextRenderer {
    /// Create a renderer with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source`, or fetch it from the cache.
    pub fn compile(&self, source: &str) -> Result<Arc<Template>, TemplateError> {
        if let Some(template) = self.cache.get(source) {
            return Ok(Arc::clone(template.value()));
        }

        let template = Arc::new(Template::parse(source)?);
        trace!(bytes = source.len(), "caching parsed template");
        self.cache.insert(Arc::from(source), Arc::clone(&template));
        Ok(template)
    }

    /// Number of templates currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached template.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl TemplateRenderer for TextRenderer {
    fn render(&self, source: &str, bag: &AttributeBag) -> Result<String, TemplateError> {
        self.compile(source)?.execute(bag)
    }
}

static SHARED_RENDERER: OnceLock<Arc<TextRenderer>> = OnceLock::new();

/// The process-wide [`TextRenderer`] used by [`Island::new`](crate::island::Island::new).
pub fn shared_renderer() -> Arc<dyn TemplateRenderer> {
    SHARED_RENDERER
        .get_or_init(|| Arc::new(TextRenderer::new()))
        .clone()
}
