//! Template Execution
//!
//! Walks a parsed node tree against an [`AttributeBag`], writing output into
//! a single `String`.
//!
//! Values are resolved into a [`Scope`], a borrowed view of whatever a field
//! path currently points at: the bag itself, a props/payload map, a JSON
//! value, or a child slot. `.Render` on a child slot is the only operation
//! with side effects: it renders a lazy child on the spot.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::TemplateError;
use crate::island::{AttributeBag, ChildSlot};

use super::parse::{Expr, Node};

/// Method name that renders a child slot.
const RENDER_METHOD: &str = "Render";

#[derive(Debug, Clone)]
enum Scope<'a> {
    Bag(&'a AttributeBag),
    Children(&'a IndexMap<String, ChildSlot>),
    Map(&'a Map<String, Value>),
    Json(&'a Value),
    Child(&'a ChildSlot),
    /// Output of `.Render`; trusted HTML.
    Rendered(String),
    /// A key that does not exist. Prints nothing and is falsy.
    Missing,
}

impl Scope<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Scope::Bag(_) => "attribute bag",
            Scope::Children(_) => "children map",
            Scope::Map(_) => "map",
            Scope::Json(value) => json_kind(value),
            Scope::Child(ChildSlot::Eager(_)) => "eager child",
            Scope::Child(ChildSlot::Lazy(_)) => "lazy child",
            Scope::Rendered(_) => "rendered html",
            Scope::Missing => "missing value",
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Scope::Bag(_) | Scope::Child(_) => true,
            Scope::Children(children) => !children.is_empty(),
            Scope::Map(map) => !map.is_empty(),
            Scope::Json(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
            },
            Scope::Rendered(html) => !html.is_empty(),
            Scope::Missing => false,
        }
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn exec_error(message: impl Into<String>) -> TemplateError {
    TemplateError::Exec(message.into())
}

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

pub(crate) struct Executor<'a> {
    root: &'a AttributeBag,
    out: String,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(root: &'a AttributeBag) -> Self {
        Self {
            root,
            out: String::new(),
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn run(&mut self, nodes: &'a [Node]) -> Result<(), TemplateError> {
        self.walk_nodes(nodes, &Scope::Bag(self.root))
    }

    fn walk_nodes(&mut self, nodes: &'a [Node], dot: &Scope<'a>) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Print(expr) => {
                    let value = self.eval(expr, dot)?;
                    self.print(&value)?;
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    if self.eval(cond, dot)?.is_truthy() {
                        self.walk_nodes(then, dot)?;
                    } else {
                        self.walk_nodes(otherwise, dot)?;
                    }
                }
                Node::With {
                    value,
                    body,
                    otherwise,
                } => {
                    let value = self.eval(value, dot)?;
                    if value.is_truthy() {
                        self.walk_nodes(body, &value)?;
                    } else {
                        self.walk_nodes(otherwise, dot)?;
                    }
                }
                Node::Range {
                    over,
                    body,
                    otherwise,
                } => {
                    let items = items(self.eval(over, dot)?)?;
                    if items.is_empty() {
                        self.walk_nodes(otherwise, dot)?;
                    }
                    for item in &items {
                        self.walk_nodes(body, item)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &'a Expr, dot: &Scope<'a>) -> Result<Scope<'a>, TemplateError> {
        let (mut scope, path) = match expr {
            Expr::Dot(path) => (dot.clone(), path),
            Expr::Root(path) => (Scope::Bag(self.root), path),
            Expr::Literal(value) => return Ok(Scope::Json(value)),
        };
        for field in path {
            scope = field_of(scope, field)?;
        }
        Ok(scope)
    }

    fn print(&mut self, scope: &Scope<'a>) -> Result<(), TemplateError> {
        match scope {
            Scope::Json(value) => print_json(value, &mut self.out),
            Scope::Map(map) => {
                let json = serde_json::to_string(map).map_err(|e| exec_error(e.to_string()))?;
                escape_html(&json, &mut self.out);
            }
            Scope::Child(ChildSlot::Eager(html)) => self.out.push_str(html),
            Scope::Child(ChildSlot::Lazy(island)) => {
                return Err(exec_error(format!(
                    "lazy child `{}` must be rendered with .{RENDER_METHOD}",
                    island.name()
                )));
            }
            Scope::Rendered(html) => self.out.push_str(html),
            Scope::Missing => {}
            Scope::Bag(_) | Scope::Children(_) => {
                return Err(exec_error(format!("can't print the {}", scope.kind())));
            }
        }
        Ok(())
    }
}

fn print_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => print_number(n, out),
        Value::String(s) => escape_html(s, out),
        Value::Array(_) | Value::Object(_) => escape_html(&value.to_string(), out),
    }
}

/// Integral floats print without a fraction, so `1.0` and `1` look alike.
fn print_number(n: &serde_json::Number, out: &mut String) {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            out.push_str(&format!("{f:.0}"));
        }
        _ => out.push_str(&n.to_string()),
    }
}

fn field_of<'a>(scope: Scope<'a>, field: &str) -> Result<Scope<'a>, TemplateError> {
    let found = match scope {
        Scope::Bag(bag) => match field {
            "props" => Scope::Map(&bag.props),
            "children" => Scope::Children(&bag.children),
            "payload" => Scope::Map(&bag.payload),
            other => {
                return Err(exec_error(format!(
                    "can't evaluate field `{other}` on the attribute bag"
                )))
            }
        },
        Scope::Children(children) => children.get(field).map_or(Scope::Missing, Scope::Child),
        Scope::Map(map) | Scope::Json(Value::Object(map)) => {
            map.get(field).map_or(Scope::Missing, Scope::Json)
        }
        Scope::Json(Value::Null) | Scope::Missing => Scope::Missing,
        Scope::Child(slot) if field == RENDER_METHOD => match slot {
            ChildSlot::Eager(html) => Scope::Rendered(html.clone()),
            ChildSlot::Lazy(island) => {
                let html = island.render().map_err(|source| TemplateError::Island {
                    name: island.name().to_string(),
                    source: Box::new(source),
                })?;
                Scope::Rendered(html)
            }
        },
        other => {
            return Err(exec_error(format!(
                "can't evaluate field `{field}` in type {}",
                other.kind()
            )))
        }
    };
    Ok(found)
}

fn items(scope: Scope<'_>) -> Result<Vec<Scope<'_>>, TemplateError> {
    let items = match scope {
        Scope::Json(Value::Array(values)) => values.iter().map(Scope::Json).collect(),
        Scope::Map(map) | Scope::Json(Value::Object(map)) => map.values().map(Scope::Json).collect(),
        Scope::Children(children) => children.values().map(Scope::Child).collect(),
        Scope::Json(Value::Null) | Scope::Missing => Vec::new(),
        other => {
            return Err(exec_error(format!(
                "range can't iterate over {}",
                other.kind()
            )))
        }
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup_characters() {
        let mut out = String::new();
        escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#, &mut out);
        assert_eq!(
            out,
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!Scope::Json(&json!(0)).is_truthy());
        assert!(!Scope::Json(&json!("")).is_truthy());
        assert!(!Scope::Json(&json!([])).is_truthy());
        assert!(!Scope::Missing.is_truthy());
        assert!(Scope::Json(&json!(0.5)).is_truthy());
        assert!(Scope::Json(&json!({"a": 1})).is_truthy());
    }

    #[test]
    fn integral_floats_print_like_integers() {
        let mut out = String::new();
        for value in [json!(1.0), json!(1), json!(-3.0), json!(2.5), json!(1e300)] {
            print_json(&value, &mut out);
            out.push(' ');
        }
        assert_eq!(out, "1 1 -3 2.5 1e300 ");
    }

    #[test]
    fn missing_keys_stay_missing() {
        let value = json!({"a": null});
        let scope = field_of(Scope::Json(&value), "a").unwrap();
        let scope = field_of(scope, "b").unwrap();
        assert!(matches!(scope, Scope::Missing));
    }

    #[test]
    fn field_on_scalar_is_an_error() {
        let value = json!("text");
        let err = field_of(Scope::Json(&value), "len").unwrap_err();
        assert!(err.to_string().contains("in type string"));
    }
}
