//! Template Parsing
//!
//! Turns template source into a tree of [`Node`]s in two passes:
//!
//! 1. `lex` splits the source into literal text and `{{ ... }}` actions,
//!    applying `{{-` / `-}}` whitespace trimming and dropping comments.
//! 2. [`Parser`] folds the action stream into nested control blocks.

use serde_json::Value;
use smallvec::SmallVec;

use crate::error::TemplateError;

/// A dotted field path such as `.props.title`, stored without the dots.
pub(crate) type FieldPath = SmallVec<[Box<str>; 4]>;

/// A single operand inside an action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    /// `.` or `.a.b`, relative to the current context.
    Dot(FieldPath),

    /// `$` or `$.a.b`, relative to the attribute bag.
    Root(FieldPath),

    /// A JSON literal: string, number, bool or null.
    Literal(Value),
}

/// A node of the parsed template tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Print(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        over: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        value: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Action { body: String, line: usize },
}

fn parse_error(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Parse {
        line,
        message: message.into(),
    }
}

/// Offset of the `}}` closing an action, skipping over quoted string
/// literals and comments.
fn action_end(body: &str) -> Option<usize> {
    let trimmed = body.trim_start_matches('-').trim_start();
    if trimmed.starts_with("/*") {
        let offset = body.len() - trimmed.len();
        let comment_end = offset + trimmed.find("*/")?;
        return body[comment_end..].find("}}").map(|end| comment_end + end);
    }

    let bytes = body.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn lex(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next = false;

    while let Some(start) = rest.find("{{") {
        let action_line = line + rest[..start].matches('\n').count();
        let after_open = &rest[start + 2..];
        let end = action_end(after_open)
            .ok_or_else(|| parse_error(action_line, "unclosed action"))?;
        let mut body = &after_open[..end];

        let trim_prev = body.starts_with('-') && body[1..].starts_with(char::is_whitespace);
        if trim_prev {
            body = &body[1..];
        }
        let trim_after = body.ends_with('-') && body[..body.len() - 1].ends_with(char::is_whitespace);
        if trim_after {
            body = &body[..body.len() - 1];
        }

        let mut text = &rest[..start];
        if trim_next {
            text = text.trim_start();
        }
        if trim_prev {
            text = text.trim_end();
        }
        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }

        let body = body.trim();
        let is_comment = body.starts_with("/*") && body.ends_with("*/") && body.len() >= 4;
        if !is_comment {
            tokens.push(Token::Action {
                body: body.to_string(),
                line: action_line,
            });
        }

        line = action_line + after_open[..end].matches('\n').count();
        trim_next = trim_after;
        rest = &after_open[end + 2..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }

    Ok(tokens)
}

fn parse_path(text: &str, line: usize) -> Result<FieldPath, TemplateError> {
    let mut path = FieldPath::new();
    if text.is_empty() {
        return Ok(path);
    }
    let Some(fields) = text.strip_prefix('.') else {
        return Err(parse_error(line, format!("malformed field path `{text}`")));
    };
    for field in fields.split('.') {
        let valid = !field.is_empty()
            && field.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(parse_error(line, format!("malformed field path `{text}`")));
        }
        path.push(field.into());
    }
    Ok(path)
}

/// Parse a single operand. Pipelines and function calls are not supported.
pub(crate) fn parse_expr(text: &str, line: usize) -> Result<Expr, TemplateError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(parse_error(line, "missing value"));
    }

    if text.starts_with('.') {
        if text == "." {
            return Ok(Expr::Dot(FieldPath::new()));
        }
        return parse_path(text, line).map(Expr::Dot);
    }

    if let Some(rest) = text.strip_prefix('$') {
        return parse_path(rest, line).map(Expr::Root);
    }

    serde_json::from_str::<Value>(text)
        .map(Expr::Literal)
        .map_err(|_| parse_error(line, format!("unknown function or value `{text}`")))
}

/// Why a block stopped.
enum Stop {
    End(usize),
    Else(usize),
    ElseIf(Expr, usize),
    Eof,
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            let (body, line) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Token::Action { body, line } => (body, line),
            };

            let (keyword, rest) = match body.split_once(char::is_whitespace) {
                Some((keyword, rest)) => (keyword, rest.trim()),
                None => (body.as_str(), ""),
            };

            match keyword {
                "end" if rest.is_empty() => return Ok((nodes, Stop::End(line))),
                "else" if rest.is_empty() => return Ok((nodes, Stop::Else(line))),
                "else" => {
                    let Some(cond) = rest.strip_prefix("if ") else {
                        return Err(parse_error(line, format!("unexpected `{body}`")));
                    };
                    return Ok((nodes, Stop::ElseIf(parse_expr(cond, line)?, line)));
                }
                "if" => {
                    let cond = parse_expr(rest, line)?;
                    nodes.push(self.parse_if(cond, line)?);
                }
                "range" => {
                    let over = parse_expr(rest, line)?;
                    let (body, otherwise) = self.parse_block("range", line)?;
                    nodes.push(Node::Range {
                        over,
                        body,
                        otherwise,
                    });
                }
                "with" => {
                    let value = parse_expr(rest, line)?;
                    let (body, otherwise) = self.parse_block("with", line)?;
                    nodes.push(Node::With {
                        value,
                        body,
                        otherwise,
                    });
                }
                "end" => return Err(parse_error(line, "unexpected arguments to `end`")),
                _ => nodes.push(Node::Print(parse_expr(&body, line)?)),
            }
        }

        Ok((nodes, Stop::Eof))
    }

    fn parse_if(&mut self, cond: Expr, line: usize) -> Result<Node, TemplateError> {
        let (then, stop) = self.parse_list()?;
        let otherwise = match stop {
            Stop::End(_) => Vec::new(),
            Stop::Else(_) => self.parse_tail("if", line)?,
            // The nested `if` consumes the `end` shared with this one.
            Stop::ElseIf(cond, line) => vec![self.parse_if(cond, line)?],
            Stop::Eof => return Err(parse_error(line, "unclosed `if`")),
        };
        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_block(
        &mut self,
        keyword: &str,
        line: usize,
    ) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        let (body, stop) = self.parse_list()?;
        match stop {
            Stop::End(_) => Ok((body, Vec::new())),
            Stop::Else(_) => Ok((body, self.parse_tail(keyword, line)?)),
            Stop::ElseIf(_, line) => Err(parse_error(line, format!("`else if` inside `{keyword}`"))),
            Stop::Eof => Err(parse_error(line, format!("unclosed `{keyword}`"))),
        }
    }

    /// The `else` branch of a block, which must run up to `end`.
    fn parse_tail(&mut self, keyword: &str, line: usize) -> Result<Vec<Node>, TemplateError> {
        let (nodes, stop) = self.parse_list()?;
        match stop {
            Stop::End(_) => Ok(nodes),
            Stop::Else(line) | Stop::ElseIf(_, line) => {
                Err(parse_error(line, format!("more than one `else` in `{keyword}`")))
            }
            Stop::Eof => Err(parse_error(line, format!("unclosed `{keyword}`"))),
        }
    }
}

/// Parse template source into a node tree.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser {
        tokens: lex(source)?.into_iter(),
    };
    let (nodes, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::End(line) => Err(parse_error(line, "unexpected `end`")),
        Stop::Else(line) | Stop::ElseIf(_, line) => Err(parse_error(line, "unexpected `else`")),
    }
}
