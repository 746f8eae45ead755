//! Chart rendering seam. Rendering itself is delegated to a collaborator;
//! this module decides the title and packages the image.

use crate::execution::QueryResult;
use crate::intent::ChartKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

/// Turns a two-or-more column result into image bytes (PNG or similar).
/// Returning `None` means no chart could be produced.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, data: &QueryResult, kind: ChartKind, title: &str) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub chart_base64: String,
    pub chart_type: ChartKind,
}

impl ChartPayload {
    pub fn from_image(image: &[u8], kind: ChartKind) -> Self {
        Self {
            chart_base64: STANDARD.encode(image),
            chart_type: kind,
        }
    }
}

fn humanize(column: &str) -> String {
    column
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"<value column> by <label column>"`, e.g. "Monthly Total by Month".
pub fn chart_title(columns: &[String]) -> String {
    match (columns.first(), columns.last()) {
        (Some(first), Some(last)) if columns.len() >= 2 => {
            format!("{} by {}", humanize(last), humanize(first))
        }
        _ => String::from("Results"),
    }
}
