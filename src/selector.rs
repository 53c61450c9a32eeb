// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation filters using Kubernetes label selector syntax.
//!
//! Sources can be limited to resources whose *annotations* match a selector
//! expression such as `kubernetes.io/ingress.class=nginx` or
//! `team in (web, api),!skip-dns`. The expression is parsed once at startup;
//! a malformed expression is a [`ConfigError`].
//!
//! # Supported Requirements
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `key=value`, `key==value` | key present with that value |
//! | `key!=value` | key absent or with another value |
//! | `key in (a, b)` | key present with one of the values |
//! | `key notin (a, b)` | key absent or with none of the values |
//! | `key` | key present |
//! | `!key` | key absent |
//!
//! Requirements are separated by commas and must all match.
//!
//! # Example
//!
//! ```rust
//! use dnsbridge::selector::AnnotationFilter;
//! use std::collections::BTreeMap;
//!
//! let filter: AnnotationFilter = "kubernetes.io/ingress.class in (nginx, alb)".parse().unwrap();
//! let annotations = BTreeMap::from([(
//!     "kubernetes.io/ingress.class".to_string(),
//!     "nginx".to_string(),
//! )]);
//! assert!(filter.matches(&annotations));
//! ```

use crate::constants::MAX_LABEL_VALUE_LEN;
use crate::errors::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Relationship between a key and its values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// `key=value`
    Equals,
    /// `key!=value`
    NotEquals,
    /// `key in (...)`
    In,
    /// `key notin (...)`
    NotIn,
    /// `key`
    Exists,
    /// `!key`
    DoesNotExist,
}

/// One requirement of a selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    /// Annotation key the requirement applies to
    pub key: String,
    /// How the key relates to `values`
    pub operator: Operator,
    /// Values for `Equals`/`NotEquals` (exactly one) and `In`/`NotIn` (one or more)
    pub values: Vec<String>,
}

impl Requirement {
    fn matches(&self, annotations: &BTreeMap<String, String>) -> bool {
        let value = annotations.get(&self.key);
        match self.operator {
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
            Operator::Equals | Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => {
                !value.is_some_and(|v| self.values.contains(v))
            }
        }
    }
}

/// A parsed annotation filter. The empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    source: String,
    requirements: Vec<Requirement>,
}

impl AnnotationFilter {
    /// Parse a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAnnotationFilter`] if the expression is malformed.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidAnnotationFilter {
            filter: expression.to_string(),
            reason,
        };

        if expression.trim().is_empty() {
            return Ok(Self::default());
        }

        let requirements = split_requirements(expression)
            .map_err(invalid)?
            .into_iter()
            .map(|part| parse_requirement(part).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: expression.to_string(),
            requirements,
        })
    }

    /// Whether the filter has no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Parsed requirements, in expression order.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether an annotation set satisfies every requirement.
    #[must_use]
    pub fn matches(&self, annotations: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(annotations))
    }
}

impl FromStr for AnnotationFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AnnotationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split on commas that are not inside a value set.
fn split_requirements(expression: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in expression.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?;
            }
            ',' if depth == 0 => {
                parts.push(&expression[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    parts.push(&expression[start..]);

    Ok(parts)
}

fn parse_requirement(part: &str) -> Result<Requirement, String> {
    let part = part.trim();
    if part.is_empty() {
        return Err("empty requirement".to_string());
    }

    if let Some(key) = part.strip_prefix('!') {
        let key = validate_key(key.trim())?;
        return Ok(Requirement {
            key,
            operator: Operator::DoesNotExist,
            values: Vec::new(),
        });
    }

    if part.contains('(') {
        return parse_set_requirement(part);
    }

    for (token, operator) in [
        ("!=", Operator::NotEquals),
        ("==", Operator::Equals),
        ("=", Operator::Equals),
    ] {
        if let Some((key, value)) = part.split_once(token) {
            return Ok(Requirement {
                key: validate_key(key.trim())?,
                operator,
                values: vec![validate_value(value.trim())?],
            });
        }
    }

    if part.contains(char::is_whitespace) {
        return Err(format!("unexpected requirement '{part}'"));
    }

    Ok(Requirement {
        key: validate_key(part)?,
        operator: Operator::Exists,
        values: Vec::new(),
    })
}

fn parse_set_requirement(part: &str) -> Result<Requirement, String> {
    let (head, set) = part
        .split_once('(')
        .ok_or_else(|| format!("missing value set in '{part}'"))?;
    let set = set
        .trim_end()
        .strip_suffix(')')
        .ok_or_else(|| format!("value set in '{part}' must end with ')'"))?;

    let mut words = head.split_whitespace();
    let key = words
        .next()
        .ok_or_else(|| format!("missing key in '{part}'"))?;
    let operator = match words.next() {
        Some("in") => Operator::In,
        Some("notin") => Operator::NotIn,
        Some(other) => return Err(format!("unknown operator '{other}' in '{part}'")),
        None => return Err(format!("missing operator in '{part}'")),
    };
    if words.next().is_some() {
        return Err(format!("unexpected token before value set in '{part}'"));
    }

    let values = set
        .split(',')
        .map(|v| validate_value(v.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    if values.iter().all(String::is_empty) {
        return Err(format!("empty value set in '{part}'"));
    }

    Ok(Requirement {
        key: validate_key(key)?,
        operator,
        values,
    })
}

fn validate_key(key: &str) -> Result<String, String> {
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return Err(format!("invalid key '{key}'"));
    }
    Ok(key.to_string())
}

fn validate_value(value: &str) -> Result<String, String> {
    if value.len() > MAX_LABEL_VALUE_LEN {
        return Err(format!(
            "value '{value}' is longer than {MAX_LABEL_VALUE_LEN} characters"
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(format!("invalid value '{value}'"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
