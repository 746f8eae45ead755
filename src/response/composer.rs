//! Response composition: fills the intent's template from the query result,
//! decides whether a chart is warranted and trims the rows sent back.

use crate::execution::{QueryResult, NO_ROWS_MESSAGE};
use crate::intent::{ChartKind, Intent};
use crate::response::chart::{chart_title, ChartPayload, ChartRenderer};
use crate::response::format::{format_plain, format_value, is_currency_column, mentions_currency};
use crate::response::template::{Bindings, Template};
use crate::security::policy::Role;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_DISPLAY_ROWS: usize = 50;

/// Tokens bound from a single-cell result.
const SINGLE_VALUE_TOKENS: &[&str] = &["COUNT", "VALUE", "SUM", "SUM(total_amount)", "monthly_average"];

/// Conventional aliases bound from multi-column results.
const ALIAS_TOKENS: &[&str] = &["customer_name", "monthly_total"];

/// What the composer produced for one executed intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub message: String,
    pub data: Vec<Map<String, Value>>,
    pub chart: Option<ChartPayload>,
    pub row_count: usize,
}

/// The structured answer handed back to the caller for every question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<Map<String, Value>>,
    pub chart: Option<ChartPayload>,
    pub query: String,
    pub row_count: usize,
    pub user_role: String,
}

impl UserResponse {
    /// Conversational reply with no query behind it.
    pub fn answer(message: impl Into<String>, role: Role) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Vec::new(),
            chart: None,
            query: String::new(),
            row_count: 0,
            user_role: role.to_string(),
        }
    }

    pub fn failure(message: impl Into<String>, query: impl Into<String>, role: Role) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Vec::new(),
            chart: None,
            query: query.into(),
            row_count: 0,
            user_role: role.to_string(),
        }
    }

    pub fn from_composition(composition: Composition, query: impl Into<String>, role: Role) -> Self {
        Self {
            success: true,
            message: composition.message,
            data: composition.data,
            chart: composition.chart,
            query: query.into(),
            row_count: composition.row_count,
            user_role: role.to_string(),
        }
    }
}

pub struct ResponseComposer {
    max_rows: usize,
    renderer: Option<Arc<dyn ChartRenderer>>,
}

impl ResponseComposer {
    pub fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            renderer: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn compose(&self, intent: &Intent, result: &QueryResult) -> Composition {
        let message = if result.is_empty() {
            NO_ROWS_MESSAGE.to_string()
        } else {
            self.fill_template(&intent.response_message, result)
        };

        Composition {
            message,
            data: result.records(self.max_rows),
            chart: self.chart_for(intent.suggested_chart, result),
            row_count: result.row_count,
        }
    }

    fn fill_template(&self, text: &str, result: &QueryResult) -> String {
        let template = Template::parse(text);
        let bindings = bindings_for(text, result);
        let rendered = template.render(&bindings);

        for name in &rendered.unresolved {
            if is_recognized(name, result) {
                debug!(placeholder = %name, "Placeholder has no value for this result shape");
            } else {
                warn!(placeholder = %name, "Unknown placeholder left in response");
            }
        }
        rendered.text
    }

    fn chart_for(&self, kind: ChartKind, result: &QueryResult) -> Option<ChartPayload> {
        if !wants_chart(kind, result) {
            return None;
        }
        let renderer = self.renderer.as_ref()?;
        let title = chart_title(&result.columns);
        match renderer.render(result, kind, &title) {
            Some(image) => Some(ChartPayload::from_image(&image, kind)),
            None => {
                warn!(chart = %kind, title = %title, "Chart renderer produced no image");
                None
            }
        }
    }
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISPLAY_ROWS)
    }
}

/// A chart is only drawn for bar/pie suggestions over label + value rows.
pub fn wants_chart(kind: ChartKind, result: &QueryResult) -> bool {
    kind.is_chart() && result.column_count() >= 2 && !result.is_empty()
}

fn is_recognized(name: &str, result: &QueryResult) -> bool {
    SINGLE_VALUE_TOKENS.contains(&name)
        || ALIAS_TOKENS.contains(&name)
        || result.columns.iter().any(|c| c == name)
}

/// Values for every placeholder the result can satisfy.
pub fn bindings_for(template: &str, result: &QueryResult) -> Bindings {
    let mut bindings = Bindings::default();
    let Some(first) = result.first_row() else {
        return bindings;
    };

    if result.is_single_value() {
        let column = &result.columns[0];
        // Single cells are money only when the wording says so; column
        // keywords such as `total` are too broad here (`total_customers`).
        let currency = mentions_currency(template) || mentions_currency(column);
        let text = format_value(&first[0], currency);
        for token in SINGLE_VALUE_TOKENS {
            bindings.insert(*token, text.clone());
        }
        bindings.insert(column.clone(), text);
        return bindings;
    }

    for (column, value) in result.columns.iter().zip(first.iter()) {
        bindings.insert(column.clone(), format_value(value, is_currency_column(column)));
    }
    if result.column_count() >= 2 {
        if let (Some(label), Some(total)) = (first.first(), first.last()) {
            bindings.insert_if_absent("customer_name", format_plain(label));
            bindings.insert_if_absent("monthly_total", format_value(total, true));
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl ChartRenderer for CountingRenderer {
        fn render(&self, _data: &QueryResult, _kind: ChartKind, title: &str) -> Option<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(title.as_bytes().to_vec())
        }
    }

    fn composer_with_renderer() -> (ResponseComposer, Arc<CountingRenderer>) {
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        (ResponseComposer::default().with_renderer(renderer.clone()), renderer)
    }

    #[test]
    fn single_sales_value_is_currency() {
        let intent = Intent::query("SELECT SUM(total_amount) FROM invoices", "Total sales: [VALUE]");
        let composed = ResponseComposer::default().compose(&intent, &result(&["sum"], vec![vec![json!(1234567.8)]]));
        assert_eq!(composed.message, "Total sales: $1,234,567.80");
        assert_eq!(composed.row_count, 1);
    }

    #[test]
    fn single_count_is_plain_integer() {
        let intent = Intent::query("SELECT COUNT(*) FROM invoices", "There were [COUNT] invoices in 2024.");
        let composed = ResponseComposer::default().compose(&intent, &result(&["count"], vec![vec![json!(1204)]]));
        assert_eq!(composed.message, "There were 1,204 invoices in 2024.");
    }

    #[test]
    fn monthly_average_column_is_currency() {
        let intent = Intent::query("SELECT ...", "Average monthly sales were [monthly_average].");
        let composed = ResponseComposer::default().compose(
            &intent,
            &result(&["monthly_average"], vec![vec![json!("10250.50")]]),
        );
        assert_eq!(composed.message, "Average monthly sales were $10,250.50.");
    }

    #[test]
    fn single_total_count_is_not_currency() {
        let intent = Intent::query("SELECT COUNT(*) AS total_customers FROM customers", "You have [COUNT] customers.");
        let composed = ResponseComposer::default().compose(
            &intent,
            &result(&["total_customers"], vec![vec![json!(1204)]]),
        );
        assert_eq!(composed.message, "You have 1,204 customers.");
    }

    #[test]
    fn single_value_column_naming_revenue_is_currency() {
        let intent = Intent::query("SELECT ...", "Last year brought in [VALUE].");
        let composed = ResponseComposer::default().compose(
            &intent,
            &result(&["revenue"], vec![vec![json!(98000)]]),
        );
        assert_eq!(composed.message, "Last year brought in $98,000.00.");
    }

    #[test]
    fn multi_column_binds_columns_and_aliases() {
        let intent = Intent::query("SELECT ...", "Top customer: [customer_name] with [total].");
        let composed = ResponseComposer::default().compose(
            &intent,
            &result(&["name", "total"], vec![vec![json!("Acme"), json!(5000)]]),
        );
        assert_eq!(composed.message, "Top customer: Acme with $5,000.00.");
    }

    #[test]
    fn column_binding_wins_over_alias() {
        let intent = Intent::query("SELECT ...", "[customer_name]: [monthly_total]");
        let composed = ResponseComposer::default().compose(
            &intent,
            &result(
                &["customer_name", "month", "monthly_total"],
                vec![vec![json!("Globex"), json!("2024-03"), json!(12.5)]],
            ),
        );
        assert_eq!(composed.message, "Globex: $12.50");
    }

    #[test]
    fn unknown_placeholders_stay_visible() {
        let intent = Intent::query("SELECT ...", "There were [COUNT] invoices in [region].");
        let composed = ResponseComposer::default().compose(&intent, &result(&["count"], vec![vec![json!(3)]]));
        assert_eq!(composed.message, "There were 3 invoices in [region].");
    }

    #[test]
    fn empty_result_uses_no_rows_message() {
        let intent = Intent::query("SELECT ...", "There were [COUNT] invoices.");
        let composed = ResponseComposer::default().compose(&intent, &QueryResult::default());
        assert_eq!(composed.message, NO_ROWS_MESSAGE);
        assert!(composed.data.is_empty());
        assert_eq!(composed.row_count, 0);
    }

    #[test]
    fn rows_are_truncated_but_count_is_kept() {
        let rows = (0..120).map(|i| vec![json!(i), json!(i * 10)]).collect();
        let intent = Intent::query("SELECT ...", "Here are the invoices.");
        let composed = ResponseComposer::default().compose(&intent, &result(&["invoice_id", "total_amount"], rows));
        assert_eq!(composed.data.len(), 50);
        assert_eq!(composed.row_count, 120);
        assert_eq!(composed.data[0].get("invoice_id"), Some(&json!(0)));
    }

    #[test]
    fn chart_requested_for_bar_over_two_columns() {
        let (composer, renderer) = composer_with_renderer();
        let intent = Intent::query("SELECT ...", "Here are sales by month.").with_chart(ChartKind::Bar);
        let composed = composer.compose(
            &intent,
            &result(&["month", "monthly_total"], vec![vec![json!("2024-01"), json!(100)]]),
        );
        let chart = composed.chart.expect("chart");
        assert_eq!(chart.chart_type, ChartKind::Bar);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_chart_for_single_column_or_none_kind() {
        let (composer, renderer) = composer_with_renderer();
        let pie = Intent::query("SELECT ...", "[COUNT]").with_chart(ChartKind::Pie);
        assert!(composer.compose(&pie, &result(&["count"], vec![vec![json!(1)]])).chart.is_none());

        let plain = Intent::query("SELECT ...", "rows");
        let two_columns = result(&["a", "b"], vec![vec![json!(1), json!(2)]]);
        assert!(composer.compose(&plain, &two_columns).chart.is_none());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn user_response_carries_query_and_role() {
        let composition = Composition {
            message: "ok".into(),
            data: Vec::new(),
            chart: None,
            row_count: 0,
        };
        let response = UserResponse::from_composition(composition, "SELECT 1", Role::Viewer);
        assert!(response.success);
        assert_eq!(response.query, "SELECT 1");
        assert_eq!(response.user_role, "viewer");

        let refused = UserResponse::failure("denied", "DELETE FROM invoices", Role::Visitor);
        assert!(!refused.success);
        assert_eq!(refused.user_role, "visitor");
    }
}
