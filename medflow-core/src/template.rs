//! Prompt templates with declarative substitution
//!
//! Supported syntax (a strict subset of Handlebars, substitution only):
//!
//! - `{{field}}`: scalar interpolation, HTML-escaped like Handlebars does
//! - `{{{field}}}`: raw interpolation, for multi-line free text quoted verbatim
//! - `{{#each field}}...{{/each}}`: repeat the body once per array element,
//!   with `{{this}}` bound to the element
//!
//! A block tag alone on its line swallows that line, so
//!
//! ```text
//! {{#each symptoms}}
//! - {{this}}
//! {{/each}}
//! ```
//!
//! renders one `- ...` line per symptom and nothing else. Templates are
//! parsed once, up front; rendering only walks the parsed nodes.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing or rendering a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template '{template}': unclosed tag starting at byte {offset}")]
    UnclosedTag { template: String, offset: usize },

    #[error("Template '{template}': empty tag at byte {offset}")]
    EmptyTag { template: String, offset: usize },

    #[error("Template '{template}': unsupported block '{block}'")]
    UnsupportedBlock { template: String, block: String },

    #[error("Template '{template}': block '{{{{#each {field}}}}}' is never closed")]
    UnclosedBlock { template: String, field: String },

    #[error("Template '{template}': unexpected '{{{{/each}}}}'")]
    UnexpectedClose { template: String },

    #[error("Template '{template}': field '{field}' is missing")]
    MissingField { template: String, field: String },

    #[error("Template '{template}': field '{field}' is not a scalar")]
    NotScalar { template: String, field: String },

    #[error("Template '{template}': field '{field}' is not an array")]
    NotArray { template: String, field: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var { path: String, raw: bool },
    Each { field: String, body: Vec<Node> },
}

#[derive(Debug)]
enum Token {
    Text(String),
    Var { path: String, raw: bool },
    Open(String),
    Close,
}

impl Token {
    fn is_block(&self) -> bool {
        matches!(self, Token::Open(_) | Token::Close)
    }
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    name: String,
    source: String,
    nodes: Vec<Node>,
}

impl PromptTemplate {
    /// Parse a template
    pub fn parse(
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        let source = source.into();
        let mut tokens = tokenize(&name, &source)?;
        strip_standalone_blocks(&mut tokens);
        let nodes = build(&name, &mut tokens.into_iter())?;
        Ok(Self { name, source, nodes })
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level input fields the template reads, with whether each is
    /// iterated (`true`) or interpolated (`false`).
    pub fn referenced_fields(&self) -> Vec<(String, bool)> {
        let mut fields = Vec::new();
        collect_fields(&self.nodes, &mut fields);
        fields
    }

    /// Render against an input object
    pub fn render(&self, input: &Value) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        self.render_nodes(&self.nodes, input, None, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        root: &Value,
        this: Option<&Value>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var { path, raw } => {
                    let value = self.resolve(path, root, this)?;
                    let text = self.scalar(path, value)?;
                    if *raw {
                        out.push_str(&text);
                    } else {
                        escape_into(&text, out);
                    }
                }
                Node::Each { field, body } => {
                    let value = self.resolve(field, root, this)?;
                    let items = value.as_array().ok_or_else(|| TemplateError::NotArray {
                        template: self.name.clone(),
                        field: field.clone(),
                    })?;
                    for item in items {
                        self.render_nodes(body, root, Some(item), out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve<'a>(
        &self,
        path: &str,
        root: &'a Value,
        this: Option<&'a Value>,
    ) -> Result<&'a Value, TemplateError> {
        let missing = || TemplateError::MissingField {
            template: self.name.clone(),
            field: path.to_string(),
        };

        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = if first == "this" {
            this.ok_or_else(missing)?
        } else {
            root.get(first).ok_or_else(missing)?
        };

        for segment in segments {
            current = current.get(segment).ok_or_else(missing)?;
        }
        Ok(current)
    }

    fn scalar(&self, path: &str, value: &Value) -> Result<String, TemplateError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Array(_) | Value::Object(_) => Err(TemplateError::NotScalar {
                template: self.name.clone(),
                field: path.to_string(),
            }),
        }
    }
}

fn collect_fields(nodes: &[Node], fields: &mut Vec<(String, bool)>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var { path, .. } => {
                let head = path.split('.').next().unwrap_or_default();
                if head != "this" {
                    push_unique(fields, head, false);
                }
            }
            Node::Each { field, body } => {
                let head = field.split('.').next().unwrap_or_default();
                if head != "this" {
                    push_unique(fields, head, true);
                }
                collect_fields(body, fields);
            }
        }
    }
}

fn push_unique(fields: &mut Vec<(String, bool)>, name: &str, iterated: bool) {
    match fields.iter_mut().find(|(f, _)| f == name) {
        Some(entry) => entry.1 |= iterated,
        None => fields.push((name.to_string(), iterated)),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
}

fn tokenize(name: &str, source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }

        let raw = rest[start..].starts_with("{{{");
        let (open_len, close) = if raw { (3, "}}}") } else { (2, "}}") };
        let inner_start = start + open_len;
        let end = rest[inner_start..]
            .find(close)
            .ok_or(TemplateError::UnclosedTag {
                template: name.to_string(),
                offset: offset + start,
            })?;

        let inner = rest[inner_start..inner_start + end].trim();
        if inner.is_empty() {
            return Err(TemplateError::EmptyTag {
                template: name.to_string(),
                offset: offset + start,
            });
        }

        if raw {
            tokens.push(Token::Var { path: inner.to_string(), raw: true });
        } else if let Some(block) = inner.strip_prefix('#') {
            match block.split_once(char::is_whitespace) {
                Some(("each", field)) if !field.trim().is_empty() => {
                    tokens.push(Token::Open(field.trim().to_string()))
                }
                _ => {
                    return Err(TemplateError::UnsupportedBlock {
                        template: name.to_string(),
                        block: block.to_string(),
                    });
                }
            }
        } else if let Some(block) = inner.strip_prefix('/') {
            if block.trim() != "each" {
                return Err(TemplateError::UnsupportedBlock {
                    template: name.to_string(),
                    block: block.to_string(),
                });
            }
            tokens.push(Token::Close);
        } else if !inner.starts_with('!') {
            tokens.push(Token::Var { path: inner.to_string(), raw: false });
        }

        let consumed = inner_start + end + close.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

/// Remove the line of a block tag that stands alone on it.
fn strip_standalone_blocks(tokens: &mut [Token]) {
    let view: &[Token] = tokens;
    let standalone: Vec<bool> = (0..view.len())
        .map(|i| view[i].is_block() && is_standalone(view, i))
        .collect();

    for (i, _) in standalone.iter().enumerate().filter(|(_, s)| **s) {
        if let Some(Token::Text(text)) = i.checked_sub(1).map(|p| &mut tokens[p]) {
            let keep = text.trim_end_matches([' ', '\t']).len();
            text.truncate(keep);
        }
        if let Some(Token::Text(text)) = tokens.get_mut(i + 1) {
            let head = text.trim_start_matches([' ', '\t']);
            let head = head
                .strip_prefix("\r\n")
                .or_else(|| head.strip_prefix('\n'))
                .unwrap_or(head);
            *text = head.to_string();
        }
    }
}

fn is_standalone(tokens: &[Token], i: usize) -> bool {
    let left_clear = match i.checked_sub(1).map(|p| &tokens[p]) {
        None => true,
        Some(Token::Text(text)) => {
            let tail = text.rsplit('\n').next().unwrap_or_default();
            tail.chars().all(|c| c == ' ' || c == '\t') && (text.contains('\n') || i == 1)
        }
        Some(_) => false,
    };
    let right_clear = match tokens.get(i + 1) {
        None => true,
        Some(Token::Text(text)) => {
            let head = text.trim_start_matches([' ', '\t']);
            head.is_empty() || head.starts_with('\n') || head.starts_with("\r\n")
        }
        Some(_) => false,
    };
    left_clear && right_clear
}

fn build(name: &str, tokens: &mut impl Iterator<Item = Token>) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    build_until(name, tokens, &mut nodes, None)?;
    Ok(nodes)
}

fn build_until(
    name: &str,
    tokens: &mut impl Iterator<Item = Token>,
    nodes: &mut Vec<Node>,
    open: Option<&str>,
) -> Result<(), TemplateError> {
    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) if text.is_empty() => {}
            Token::Text(text) => nodes.push(Node::Text(text)),
            Token::Var { path, raw } => nodes.push(Node::Var { path, raw }),
            Token::Open(field) => {
                let mut body = Vec::new();
                build_until(name, tokens, &mut body, Some(&field))?;
                nodes.push(Node::Each { field, body });
            }
            Token::Close => {
                return match open {
                    Some(_) => Ok(()),
                    None => Err(TemplateError::UnexpectedClose {
                        template: name.to_string(),
                    }),
                };
            }
        }
    }

    match open {
        Some(field) => Err(TemplateError::UnclosedBlock {
            template: name.to_string(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}
