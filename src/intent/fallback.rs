//! Rule-based intent derivation used when the language model is unavailable
//! or its reply is unusable.
//!
//! Rules are checked in a fixed priority order and the first match wins.
//! Everything here is a pure function of the question, role and history.

use crate::intent::{ChartKind, Intent, DEFAULT_HELP_MESSAGE};
use crate::memory::ConversationTurn;
use crate::security::policy::Role;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_TOPIC_WINDOW: usize = 6;

const VISITOR_PRODUCTS_REFUSAL: &str = "As a visitor, you only have access to sales data. \
Product information is not available for your role.";
const VISITOR_CUSTOMERS_REFUSAL: &str = "As a visitor, you only have access to sales data. \
Customer information is not available for your role.";
const VISITOR_HELP_MESSAGE: &str = "As a visitor you can ask about sales figures, for example \
\"What were total sales in 2024?\" or \"Show me a bar chart of monthly sales\".";
const GREETING_MESSAGE: &str = "Hello! I'm your business data assistant. Ask me about invoices, \
sales, customers or products.";
const VISITOR_GREETING_MESSAGE: &str = "Hello! I'm your business data assistant. Ask me about \
sales totals and trends.";

lazy_static! {
    static ref YEAR_TOKEN: Regex = Regex::new(r"\b(2023|2024|2025)\b").unwrap();
    static ref FOLLOW_UP_CUE: Regex =
        Regex::new(r"\b(what about|and|also|too|that|this|same)\b").unwrap();
    static ref COUNTING_WORD: Regex = Regex::new(r"\b(how many|count|number)\b").unwrap();
    static ref DISPLAY_WORD: Regex = Regex::new(r"\b(show|list|what|display)\b").unwrap();
    static ref GREETING_WORD: Regex = Regex::new(r"\b(hello|hi|hey)\b").unwrap();
}

/// Coarse subject of a conversation, recalled from recent turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Invoices,
    Customers,
    Products,
    Sales,
}

impl Topic {
    /// Keyword scan order inside a single turn.
    const KEYWORDS: [(&'static str, Topic); 4] = [
        ("invoice", Topic::Invoices),
        ("customer", Topic::Customers),
        ("product", Topic::Products),
        ("sales", Topic::Sales),
    ];

    fn mentioned_in(text: &str) -> Option<Topic> {
        let text = text.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, topic)| *topic)
    }
}

/// Deterministic substitute for the model-backed translator.
#[derive(Debug, Clone)]
pub struct FallbackEngine {
    topic_window: usize,
}

impl Default for FallbackEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_WINDOW)
    }
}

impl FallbackEngine {
    pub fn new(topic_window: usize) -> Self {
        Self { topic_window }
    }

    /// Most recent topic among the last `topic_window` turns, newest first.
    pub fn recall_topic(&self, history: &[ConversationTurn]) -> Option<Topic> {
        history
            .iter()
            .rev()
            .take(self.topic_window)
            .find_map(|turn| Topic::mentioned_in(&turn.content))
    }

    pub fn derive(&self, question: &str, role: Role, history: &[ConversationTurn]) -> Intent {
        let q = question.to_lowercase();
        let year = YEAR_TOKEN.find(&q).map(|m| m.as_str().to_string());
        let follow_up = FOLLOW_UP_CUE.is_match(&q);
        // The question's own subject wins over the remembered one.
        let topic = Topic::mentioned_in(&q).or_else(|| self.recall_topic(history));

        // 1. "what about 2023?" after talking about a topic.
        if follow_up {
            if let (Some(topic), Some(year)) = (topic, year.as_deref()) {
                return topic_in_year(topic, year, role);
            }
        }

        // 2. "show that as a chart" after talking about invoices.
        if follow_up && q.contains("chart") && topic == Some(Topic::Invoices) {
            return invoices_per_year();
        }

        // 3. Invoice counts.
        if q.contains("invoice") && COUNTING_WORD.is_match(&q) {
            if let Some(year) = year.as_deref() {
                return invoice_count_in_year(year);
            }
            if q.contains("per year") || q.contains("by year") {
                return invoices_per_year();
            }
            return Intent::query(
                "SELECT COUNT(*) FROM invoices",
                "There are [COUNT] invoices in total.",
            );
        }

        // 4. Customer counts.
        if (q.contains("customer") || q.contains("client")) && COUNTING_WORD.is_match(&q) {
            if role == Role::Visitor {
                return Intent::answer(VISITOR_CUSTOMERS_REFUSAL);
            }
            return Intent::query(
                "SELECT COUNT(*) FROM customers",
                "You have [COUNT] customers in total.",
            );
        }

        // 5. Product listings.
        if (q.contains("product") || q.contains("item")) && DISPLAY_WORD.is_match(&q) {
            if role == Role::Visitor {
                return Intent::answer(VISITOR_PRODUCTS_REFUSAL);
            }
            return Intent::query(
                "SELECT product_id, name, category, unit_price FROM products ORDER BY name LIMIT 20",
                "Here are the products in the catalog (showing up to 20).",
            );
        }

        // 6. Yearly sales figures.
        if q.contains("sales") || q.contains("revenue") {
            if let Some(year) = year.as_deref() {
                if q.contains("average") || q.contains("monthly") {
                    return monthly_average_sales(year);
                }
                if q.contains("total") {
                    return total_sales_in_year(year);
                }
            }
        }

        // 7. Sales charts.
        if q.contains("chart") && q.contains("sales") {
            let chart = if q.contains("pie") {
                ChartKind::Pie
            } else {
                ChartKind::Bar
            };
            if q.contains("month") {
                return Intent::query(
                    "SELECT TO_CHAR(invoice_date, 'YYYY-MM') AS month, SUM(total_amount) AS monthly_total \
                     FROM invoices WHERE EXTRACT(YEAR FROM invoice_date) = EXTRACT(YEAR FROM CURRENT_DATE) \
                     GROUP BY month ORDER BY month",
                    "Here are this year's sales by month.",
                )
                .with_chart(chart);
            }
            if q.contains("year") {
                return Intent::query(
                    "SELECT EXTRACT(YEAR FROM invoice_date)::int AS year, SUM(total_amount) AS yearly_total \
                     FROM invoices GROUP BY year ORDER BY year",
                    "Here are total sales by year.",
                )
                .with_chart(chart);
            }
        }

        // 8. Greetings.
        if GREETING_WORD.is_match(&q) {
            return Intent::answer(match role {
                Role::Visitor => VISITOR_GREETING_MESSAGE,
                _ => GREETING_MESSAGE,
            });
        }

        // 9. Anything else gets capability guidance.
        Intent::answer(match role {
            Role::Visitor => VISITOR_HELP_MESSAGE,
            _ => DEFAULT_HELP_MESSAGE,
        })
    }
}

fn invoice_count_in_year(year: &str) -> Intent {
    Intent::query(
        format!(
            "SELECT COUNT(*) FROM invoices WHERE EXTRACT(YEAR FROM invoice_date) = {}",
            year
        ),
        format!("There were [COUNT] invoices in {}.", year),
    )
}

fn invoices_per_year() -> Intent {
    Intent::query(
        "SELECT EXTRACT(YEAR FROM invoice_date)::int AS year, COUNT(*) AS invoice_count \
         FROM invoices GROUP BY year ORDER BY year",
        "Here is the number of invoices per year.",
    )
    .with_chart(ChartKind::Bar)
}

fn monthly_average_sales(year: &str) -> Intent {
    // Average month, not average invoice: the annual sum spread over 12 months.
    Intent::query(
        format!(
            "SELECT ROUND(SUM(total_amount) / 12, 2) AS monthly_average FROM invoices \
             WHERE EXTRACT(YEAR FROM invoice_date) = {}",
            year
        ),
        format!("The average monthly sales in {} were [monthly_average].", year),
    )
}

fn total_sales_in_year(year: &str) -> Intent {
    Intent::query(
        format!(
            "SELECT SUM(total_amount) AS total_sales FROM invoices \
             WHERE EXTRACT(YEAR FROM invoice_date) = {}",
            year
        ),
        format!("Total sales in {} were [SUM].", year),
    )
}

fn topic_in_year(topic: Topic, year: &str, role: Role) -> Intent {
    match topic {
        Topic::Invoices => invoice_count_in_year(year),
        Topic::Sales => total_sales_in_year(year),
        Topic::Customers if role == Role::Visitor => Intent::answer(VISITOR_CUSTOMERS_REFUSAL),
        Topic::Products if role == Role::Visitor => Intent::answer(VISITOR_PRODUCTS_REFUSAL),
        Topic::Customers => Intent::query(
            format!(
                "SELECT COUNT(*) FROM customers WHERE EXTRACT(YEAR FROM created_at) = {}",
                year
            ),
            format!("[COUNT] customers joined in {}.", year),
        ),
        Topic::Products => Intent::query(
            format!(
                "SELECT COUNT(*) FROM products WHERE EXTRACT(YEAR FROM created_at) = {}",
                year
            ),
            format!("[COUNT] products were added in {}.", year),
        ),
    }
}
