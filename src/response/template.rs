//! Placeholder templates such as `"There were [COUNT] invoices in 2024."`.
//!
//! A placeholder is a bracketed identifier, optionally followed by one
//! parenthesised argument (`[SUM(total_amount)]`). Anything else in brackets
//! is literal text.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*(?:\([A-Za-z0-9_*]*\))?)\]").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(text[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            cursor = whole.end();
        }
        if cursor < text.len() {
            segments.push(Segment::Literal(text[cursor..].to_string()));
        }
        Self { segments }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute bound placeholders. Unbound ones stay visible as `[name]`.
    pub fn render(&self, bindings: &Bindings) -> Rendered {
        let mut text = String::new();
        let mut unresolved = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Placeholder(name) => match bindings.get(name) {
                    Some(value) => text.push_str(value),
                    None => {
                        text.push('[');
                        text.push_str(name);
                        text.push(']');
                        if !unresolved.contains(name) {
                            unresolved.push(name.clone());
                        }
                    }
                },
            }
        }
        Rendered { text, unresolved }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub unresolved: Vec<String>,
}

/// Placeholder name → already formatted value.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Bind only if nothing is bound under `name` yet.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
