//! Prompt construction for the model-backed translator.

use crate::memory::ConversationTurn;
use crate::security::policy::Role;

const INSTRUCTIONS: &str = r#"Decide whether the question needs a database query and reply with ONE JSON object:
{
  "needs_sql": true | false,
  "sql_query": "PostgreSQL statement (only when needs_sql is true)",
  "response_message": "reply text; use placeholders like [COUNT], [VALUE], [SUM] or [column_name] for values from the result",
  "suggested_chart": "none" | "bar" | "pie"
}

Rules:
- Only use tables and columns listed in the schema above. Never write UPDATE, DELETE, DROP, ALTER or TRUNCATE.
- Generate a single SELECT (or WITH ... SELECT) statement.
- Monthly average for a year = SUM(total_amount) for that year / 12. Never use AVG(total_amount) for this, that is the average invoice, not the average month.
- Use EXTRACT(YEAR FROM invoice_date) for year filters and TO_CHAR(invoice_date, 'YYYY-MM') for months.
- Suggest "bar" or "pie" only when the query returns a label column and a value column.
- Use the conversation to resolve follow-up questions ("what about 2023?", "show that as a chart").
- If the question is a greeting or unrelated to the data, set needs_sql to false and answer directly.

Examples:
Q: "How many invoices were there in 2024?"
{"needs_sql": true, "sql_query": "SELECT COUNT(*) FROM invoices WHERE EXTRACT(YEAR FROM invoice_date) = 2024", "response_message": "There were [COUNT] invoices in 2024.", "suggested_chart": "none"}

Previous: "How many invoices were there in 2024?"  Q: "What about 2023?"
{"needs_sql": true, "sql_query": "SELECT COUNT(*) FROM invoices WHERE EXTRACT(YEAR FROM invoice_date) = 2023", "response_message": "There were [COUNT] invoices in 2023.", "suggested_chart": "none"}

Q: "What were the average monthly sales in 2024?"
{"needs_sql": true, "sql_query": "SELECT ROUND(SUM(total_amount) / 12, 2) AS monthly_average FROM invoices WHERE EXTRACT(YEAR FROM invoice_date) = 2024", "response_message": "Average monthly sales in 2024 were [monthly_average].", "suggested_chart": "none"}

Previous: discussion of monthly sales.  Q: "Can you show that as a chart?"
{"needs_sql": true, "sql_query": "SELECT TO_CHAR(invoice_date, 'YYYY-MM') AS month, SUM(total_amount) AS monthly_total FROM invoices GROUP BY month ORDER BY month", "response_message": "Here are sales by month.", "suggested_chart": "bar"}

Q: "Hi there"
{"needs_sql": false, "response_message": "Hello! Ask me about your invoices, customers or sales.", "suggested_chart": "none"}

Return the JSON object only."#;

/// Render the trailing `max_turns` turns as `sender: content` lines.
pub fn render_history(history: &[ConversationTurn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.sender, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(
    question: &str,
    role: Role,
    schema_text: &str,
    history: &[ConversationTurn],
    max_turns: usize,
) -> String {
    let conversation = render_history(history, max_turns);
    let conversation = if conversation.is_empty() {
        "(no previous messages)".to_string()
    } else {
        conversation
    };

    format!(
        "You translate business questions into SQL for a user with role '{}'.\n\n\
         Database schema:\n{}\n\n\
         Conversation so far:\n{}\n\n\
         Current question: \"{}\"\n\n{}",
        role, schema_text, conversation, question, INSTRUCTIONS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_last_ten_turns_are_rendered() {
        let history: Vec<ConversationTurn> = (0..14)
            .map(|i| ConversationTurn::user(format!("turn {}", i)))
            .collect();
        let rendered = render_history(&history, 10);
        assert_eq!(rendered.lines().count(), 10);
        assert!(rendered.starts_with("user: turn 4"));
        assert!(!rendered.contains("turn 3\n"));
    }

    #[test]
    fn prompt_contains_schema_role_history_and_question() {
        let history = vec![
            ConversationTurn::user("how many invoices in 2024?"),
            ConversationTurn::assistant("There were 310 invoices in 2024."),
        ];
        let prompt = build_prompt("what about 2023?", Role::Viewer, "SCHEMA-TEXT", &history, 10);
        assert!(prompt.contains("role 'viewer'"));
        assert!(prompt.contains("SCHEMA-TEXT"));
        assert!(prompt.contains("assistant: There were 310 invoices in 2024."));
        assert!(prompt.contains("Current question: \"what about 2023?\""));
        assert!(prompt.contains("SUM(total_amount) for that year / 12"));
    }

    #[test]
    fn empty_history_is_marked() {
        let prompt = build_prompt("hi", Role::Admin, "S", &[], 10);
        assert!(prompt.contains("(no previous messages)"));
    }
}
