//! Intent: the structured decision derived from one question.

pub mod fallback;
pub mod prompt;
pub mod translator;

pub use fallback::FallbackEngine;
pub use translator::IntentTranslator;

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_HELP_MESSAGE: &str = "I can help you explore your business data. Try asking things like \
\"How many invoices were issued in 2024?\", \"What were total sales in 2023?\" or \
\"Show me a bar chart of monthly sales\".";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    None,
    Bar,
    Pie,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::None => "none",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
        }
    }

    pub fn is_chart(&self) -> bool {
        !matches!(self, ChartKind::None)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub needs_sql: bool,
    /// Empty when `needs_sql` is false.
    pub sql_query: String,
    /// Reply text; may contain placeholders such as `[COUNT]`.
    pub response_message: String,
    pub suggested_chart: ChartKind,
}

impl Intent {
    /// A direct answer that needs no query.
    pub fn answer(message: impl Into<String>) -> Self {
        Self {
            needs_sql: false,
            sql_query: String::new(),
            response_message: message.into(),
            suggested_chart: ChartKind::None,
        }
    }

    pub fn query(sql: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            needs_sql: true,
            sql_query: sql.into(),
            response_message: template.into(),
            suggested_chart: ChartKind::None,
        }
    }

    pub fn with_chart(mut self, chart: ChartKind) -> Self {
        self.suggested_chart = chart;
        self
    }
}

/// Where an intent came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    Model,
    Fallback,
}

impl fmt::Display for IntentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntentSource::Model => "model",
            IntentSource::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub intent: Intent,
    pub source: IntentSource,
}
