// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! FQDN templates for resources that do not name themselves.
//!
//! Templates use the `{{ ... }}` action syntax familiar from Go templates, over a
//! small fixed set of resource fields and helper functions. Templates are compiled
//! once at startup; anything outside the supported subset is a [`ConfigError`],
//! so rendering itself cannot fail.
//!
//! # Fields
//!
//! - `.Name`, `.Namespace`, `.Kind`
//! - `.Labels`, `.Annotations` (maps, only usable with `index`)
//! - `.Labels.<key>`, `.Annotations.<key>` (missing keys render as an empty string)
//!
//! # Functions
//!
//! - `trimPrefix <s> <prefix>`, `trimSuffix <s> <suffix>`
//! - `toLower <s>`
//! - `index <map> <key>`
//!
//! Arguments are fields, double-quoted or back-quoted strings, or a parenthesized call.
//!
//! # Example
//!
//! ```rust
//! use dnsbridge::template::{FqdnTemplate, TemplateData};
//! use std::collections::BTreeMap;
//!
//! let tmpl =
//!     FqdnTemplate::parse(r#"{{trimPrefix .Name "web-"}}.{{.Namespace}}.example.com"#).unwrap();
//! let empty = BTreeMap::new();
//! let data = TemplateData {
//!     kind: "service",
//!     name: "web-frontend",
//!     namespace: "prod",
//!     labels: &empty,
//!     annotations: &empty,
//! };
//! assert_eq!(tmpl.hostnames(&data), vec!["frontend.prod.example.com"]);
//! ```

use crate::errors::ConfigError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;

static EMPTY_MAP: BTreeMap<String, String> = BTreeMap::new();

/// The resource fields a template can read.
#[derive(Clone, Copy, Debug)]
pub struct TemplateData<'a> {
    /// Resource kind (`service`, `ingress`, `gateway`)
    pub kind: &'a str,
    /// `metadata.name`
    pub name: &'a str,
    /// `metadata.namespace`
    pub namespace: &'a str,
    /// `metadata.labels`
    pub labels: &'a BTreeMap<String, String>,
    /// `metadata.annotations`
    pub annotations: &'a BTreeMap<String, String>,
}

impl<'a> TemplateData<'a> {
    /// Template view of a resource's metadata.
    #[must_use]
    pub fn from_meta(kind: &'a str, meta: &'a ObjectMeta) -> Self {
        Self {
            kind,
            name: meta.name.as_deref().unwrap_or_default(),
            namespace: meta.namespace.as_deref().unwrap_or_default(),
            labels: meta.labels.as_ref().unwrap_or(&EMPTY_MAP),
            annotations: meta.annotations.as_ref().unwrap_or(&EMPTY_MAP),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MapField {
    Labels,
    Annotations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Func {
    TrimPrefix,
    TrimSuffix,
    ToLower,
    Index,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "trimPrefix" => Some(Self::TrimPrefix),
            "trimSuffix" => Some(Self::TrimSuffix),
            "toLower" => Some(Self::ToLower),
            "index" => Some(Self::Index),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::ToLower => 1,
            Self::TrimPrefix | Self::TrimSuffix | Self::Index => 2,
        }
    }
}

/// A string-valued expression.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Expr {
    Name,
    Namespace,
    Kind,
    MapEntry(MapField, String),
    Literal(String),
    Index(MapField, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Text(String),
    Action(Expr),
}

/// Operand as parsed, before type checking.
#[derive(Clone, Debug)]
enum Operand {
    Map(MapField),
    Value(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Field(String),
    Str(String),
    Ident(String),
    Open,
    Close,
}

/// A compiled FQDN template.
#[derive(Clone, PartialEq, Eq)]
pub struct FqdnTemplate {
    source: String,
    nodes: Vec<Node>,
}

impl fmt::Debug for FqdnTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FqdnTemplate").field(&self.source).finish()
    }
}

impl fmt::Display for FqdnTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FqdnTemplate {
    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTemplate`] for unclosed actions, unknown fields or
    /// functions, wrong argument counts, and map fields used where a string is needed.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            template: source.to_string(),
            reason,
        };

        let mut nodes = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                nodes.push(Node::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| invalid("unclosed action".to_string()))?;
            let tokens = tokenize(&after[..end]).map_err(invalid)?;
            nodes.push(Node::Action(parse_action(&tokens).map_err(invalid)?));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            nodes.push(Node::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            nodes,
        })
    }

    /// Render the template against one resource.
    #[must_use]
    pub fn render(&self, data: &TemplateData<'_>) -> String {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => text.clone(),
                Node::Action(expr) => eval(expr, data),
            })
            .collect()
    }

    /// Render and split into hostnames.
    ///
    /// Spaces are removed, the result is split on commas, trailing dots are stripped
    /// and empty entries are dropped.
    #[must_use]
    pub fn hostnames(&self, data: &TemplateData<'_>) -> Vec<String> {
        self.render(data)
            .replace(' ', "")
            .split(',')
            .map(|h| h.trim_end_matches('.'))
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn tokenize(action: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = action.char_indices().peekable();

    while let Some(&(idx, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err("unterminated string".to_string());
                }
                tokens.push(Token::Str(value));
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err("unterminated raw string".to_string());
                }
                tokens.push(Token::Str(value));
            }
            _ => {
                let mut end = action.len();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '`') {
                        end = i;
                        break;
                    }
                    chars.next();
                }
                let word = &action[idx..end];
                if let Some(path) = word.strip_prefix('.') {
                    tokens.push(Token::Field(path.to_string()));
                } else if word
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    tokens.push(Token::Ident(word.to_string()));
                } else {
                    return Err(format!("unexpected '{word}'"));
                }
            }
        }
    }

    Ok(tokens)
}

fn parse_action(tokens: &[Token]) -> Result<Expr, String> {
    if tokens.is_empty() {
        return Err("empty action".to_string());
    }
    let mut pos = 0;
    let operand = parse_command(tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err("unexpected tokens after expression".to_string());
    }
    into_value(operand)
}

fn parse_command(tokens: &[Token], pos: &mut usize) -> Result<Operand, String> {
    match tokens.get(*pos) {
        Some(Token::Ident(name)) => {
            let Some(func) = Func::lookup(name) else {
                return Err(format!("function \"{name}\" not defined"));
            };
            *pos += 1;
            let mut args = Vec::new();
            while let Some(token) = tokens.get(*pos) {
                if *token == Token::Close {
                    break;
                }
                args.push(parse_operand(tokens, pos)?);
            }
            build_call(func, args, name).map(Operand::Value)
        }
        _ => parse_operand(tokens, pos),
    }
}

fn parse_operand(tokens: &[Token], pos: &mut usize) -> Result<Operand, String> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| "unexpected end of action".to_string())?;
    *pos += 1;
    match token {
        Token::Field(path) => parse_field(path),
        Token::Str(value) => Ok(Operand::Value(Expr::Literal(value.clone()))),
        Token::Open => {
            let inner = parse_command(tokens, pos)?;
            match tokens.get(*pos) {
                Some(Token::Close) => {
                    *pos += 1;
                    Ok(inner)
                }
                _ => Err("missing ')'".to_string()),
            }
        }
        Token::Close => Err("unexpected ')'".to_string()),
        Token::Ident(name) => Err(format!(
            "function \"{name}\" must be parenthesized when used as an argument"
        )),
    }
}

fn parse_field(path: &str) -> Result<Operand, String> {
    let (head, key) = match path.split_once('.') {
        Some((head, key)) => (head, Some(key)),
        None => (path, None),
    };

    let map = match head {
        "Name" | "Namespace" | "Kind" if key.is_some() => {
            return Err(format!("field .{head} has no sub-fields"));
        }
        "Name" => return Ok(Operand::Value(Expr::Name)),
        "Namespace" => return Ok(Operand::Value(Expr::Namespace)),
        "Kind" => return Ok(Operand::Value(Expr::Kind)),
        "Labels" => MapField::Labels,
        "Annotations" => MapField::Annotations,
        other => return Err(format!("unknown field .{other}")),
    };

    match key {
        Some(key) if !key.is_empty() => Ok(Operand::Value(Expr::MapEntry(map, key.to_string()))),
        Some(_) => Err(format!("empty key after .{head}")),
        None => Ok(Operand::Map(map)),
    }
}

fn build_call(func: Func, args: Vec<Operand>, name: &str) -> Result<Expr, String> {
    if args.len() != func.arity() {
        return Err(format!(
            "wrong number of args for {name}: want {} got {}",
            func.arity(),
            args.len()
        ));
    }

    let mut args = args.into_iter();
    if func == Func::Index {
        let map = match args.next() {
            Some(Operand::Map(map)) => map,
            _ => return Err("index expects .Labels or .Annotations as first argument".to_string()),
        };
        let key = args
            .next()
            .ok_or_else(|| "index expects a key".to_string())
            .and_then(into_value)?;
        return Ok(Expr::Index(map, Box::new(key)));
    }

    let values = args.map(into_value).collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Call(func, values))
}

fn into_value(operand: Operand) -> Result<Expr, String> {
    match operand {
        Operand::Value(expr) => Ok(expr),
        Operand::Map(MapField::Labels) => Err(".Labels is a map; use index".to_string()),
        Operand::Map(MapField::Annotations) => Err(".Annotations is a map; use index".to_string()),
    }
}

fn map_of<'a>(map: MapField, data: &TemplateData<'a>) -> &'a BTreeMap<String, String> {
    match map {
        MapField::Labels => data.labels,
        MapField::Annotations => data.annotations,
    }
}

fn eval(expr: &Expr, data: &TemplateData<'_>) -> String {
    match expr {
        Expr::Name => data.name.to_string(),
        Expr::Namespace => data.namespace.to_string(),
        Expr::Kind => data.kind.to_string(),
        Expr::Literal(value) => value.clone(),
        Expr::MapEntry(map, key) => map_of(*map, data).get(key).cloned().unwrap_or_default(),
        Expr::Index(map, key) => map_of(*map, data)
            .get(&eval(key, data))
            .cloned()
            .unwrap_or_default(),
        Expr::Call(func, args) => {
            let values: Vec<String> = args.iter().map(|a| eval(a, data)).collect();
            match (func, values.as_slice()) {
                (Func::TrimPrefix, [s, prefix]) => {
                    s.strip_prefix(prefix.as_str()).unwrap_or(s).to_string()
                }
                (Func::TrimSuffix, [s, suffix]) => {
                    s.strip_suffix(suffix.as_str()).unwrap_or(s).to_string()
                }
                (Func::ToLower, [s]) => s.to_lowercase(),
                // Arity is checked when the template is compiled.
                _ => String::new(),
            }
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod template_tests;
