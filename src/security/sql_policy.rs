//! SQL Policy Filter
//!
//! Validates candidate SQL against the caller's role and rewrites it so a
//! viewer never sees raw customer names.
//!
//! The rewrite is textual: it matches identifiers with patterns rather than
//! parsing the statement. Unusual phrasing (nested subqueries re-aliasing
//! the customers table, quoted identifiers) can slip through, so treat it as
//! a redaction heuristic layered on top of the role schema, not a guarantee.

use crate::error::{EngineError, Result};
use crate::security::policy::Role;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;
use tracing::{debug, warn};

const READ_ONLY_FORBIDDEN: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
];
const MANAGER_FORBIDDEN: &[&str] = &["UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE"];

/// Words that can follow a table name but are never an alias.
const NON_ALIAS_KEYWORDS: &[&str] = &[
    "where", "join", "on", "left", "right", "inner", "outer", "full", "cross", "natural",
    "group", "order", "limit", "offset", "having", "union", "except", "intersect", "using",
    "window", "fetch", "set", "values", "as",
];

lazy_static! {
    static ref MUTATING_KEYWORD: Regex =
        Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE)\b").unwrap();
    static ref VISITOR_HIDDEN_TABLE: Regex = Regex::new(r"(?i)\b(customers|products)\b").unwrap();
    static ref CUSTOMERS_TABLE: Regex = Regex::new(r"(?i)\bcustomers\b").unwrap();
    static ref PRODUCTS_TABLE: Regex = Regex::new(r"(?i)\bproducts\b").unwrap();
    static ref CUSTOMERS_ALIAS: Regex =
        Regex::new(r"(?i)\bcustomers(?:\s+as)?\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\.name\b").unwrap();
    static ref BARE_NAME: Regex = Regex::new(r"(?i)(\bAS\s+|^|[^.\w'])name\b").unwrap();
    static ref CUSTOMER_NAME_ALIAS: Regex = Regex::new(r"(?i)\bcustomer_name\b").unwrap();
}

/// Role-based SQL validation and rewriting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlPolicyFilter;

impl SqlPolicyFilter {
    pub fn new() -> Self {
        Self
    }

    /// Keywords the role may not use anywhere in a statement.
    pub fn forbidden_keywords(role: Role) -> &'static [&'static str] {
        match role {
            Role::Visitor | Role::Viewer => READ_ONLY_FORBIDDEN,
            Role::Manager => MANAGER_FORBIDDEN,
            Role::Admin => &[],
        }
    }

    /// Check the statement against the role's keyword and table rules.
    ///
    /// Returns the first violation in statement order.
    pub fn validate(&self, sql: &str, role: Role) -> Result<()> {
        let forbidden = Self::forbidden_keywords(role);

        for caps in MUTATING_KEYWORD.captures_iter(sql) {
            let keyword = caps[1].to_uppercase();
            if forbidden.contains(&keyword.as_str()) {
                warn!(role = %role, keyword = %keyword, "Rejected SQL with forbidden keyword");
                return Err(EngineError::Policy(format!(
                    "Your role ({}) is not permitted to run {} statements.",
                    role, keyword
                )));
            }
        }

        if role == Role::Visitor {
            if let Some(m) = VISITOR_HIDDEN_TABLE.find(sql) {
                warn!(table = %m.as_str(), "Rejected visitor SQL touching a hidden table");
                return Err(EngineError::Policy(format!(
                    "As a visitor you only have access to sales data; the {} table is not available to your role.",
                    m.as_str().to_lowercase()
                )));
            }
        }

        Ok(())
    }

    /// Redact customer names for viewers. Other roles pass through untouched.
    ///
    /// Applying this twice yields the same text as applying it once.
    pub fn rewrite(&self, sql: &str, role: Role) -> String {
        if role != Role::Viewer {
            return sql.to_string();
        }

        let aliases = customer_aliases(sql);
        let rewritten = QUALIFIED_NAME.replace_all(sql, |caps: &Captures| {
            let qualifier = &caps[1];
            if aliases.contains(&qualifier.to_lowercase()) {
                format!("CONCAT('Customer #', {}.customer_id)", qualifier)
            } else {
                caps[0].to_string()
            }
        });

        // An unqualified `name` is only attributable to customers when
        // products (the other table with a name column) is absent.
        let rewritten = if CUSTOMERS_TABLE.is_match(&rewritten) && !PRODUCTS_TABLE.is_match(&rewritten) {
            BARE_NAME
                .replace_all(&rewritten, |caps: &Captures| {
                    let lead = &caps[1];
                    // `AS name` declares an output alias, not a column read.
                    if lead.trim().eq_ignore_ascii_case("as") {
                        caps[0].to_string()
                    } else {
                        format!("{}CONCAT('Customer #', customer_id)", lead)
                    }
                })
                .into_owned()
        } else {
            rewritten.into_owned()
        };

        let rewritten = CUSTOMER_NAME_ALIAS.replace_all(&rewritten, "customer_id").into_owned();

        if rewritten != sql {
            debug!(original = %sql, rewritten = %rewritten, "Redacted customer names for viewer");
        }
        rewritten
    }

    /// Every executed statement must be a single read, whatever the role.
    pub fn ensure_read_only(&self, sql: &str) -> Result<()> {
        let head = sql.trim_start().to_uppercase();
        if head.is_empty() {
            return Err(EngineError::Policy(
                "No SQL statement was produced for this question.".to_string(),
            ));
        }

        match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
            Ok(statements) => {
                if statements.len() > 1 {
                    return Err(EngineError::Policy(
                        "Only one statement can be executed per question.".to_string(),
                    ));
                }
                match statements.first() {
                    Some(Statement::Query(_)) => Ok(()),
                    _ => Err(not_a_read()),
                }
            }
            Err(e) => {
                // The store reports the syntax error; only the statement kind matters here.
                debug!(error = %e, "SQL parsing failed, checking statement prefix instead");
                if head.starts_with("SELECT") || head.starts_with("WITH") {
                    Ok(())
                } else {
                    Err(not_a_read())
                }
            }
        }
    }

    /// Validate, rewrite, then require a read statement. Returns the SQL to run.
    pub fn apply(&self, sql: &str, role: Role) -> Result<String> {
        self.validate(sql, role)?;
        let filtered = self.rewrite(sql, role);
        self.ensure_read_only(&filtered)?;
        Ok(filtered.trim().trim_end_matches(';').trim_end().to_string())
    }
}

fn not_a_read() -> EngineError {
    EngineError::Policy("Only SELECT or WITH queries can be executed.".to_string())
}

fn customer_aliases(sql: &str) -> HashSet<String> {
    let mut aliases: HashSet<String> = HashSet::new();
    aliases.insert("customers".to_string());
    for caps in CUSTOMERS_ALIAS.captures_iter(sql) {
        let alias = caps[1].to_lowercase();
        if !NON_ALIAS_KEYWORDS.contains(&alias.as_str()) {
            aliases.insert(alias);
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> SqlPolicyFilter {
        SqlPolicyFilter::new()
    }

    #[test]
    fn read_only_roles_reject_every_mutation() {
        for role in [Role::Visitor, Role::Viewer] {
            for sql in [
                "INSERT INTO invoices (total_amount) VALUES (10)",
                "update invoices set total_amount = 0",
                "DELETE FROM invoices",
                "DROP TABLE invoices",
                "CREATE TABLE t (id int)",
                "ALTER TABLE invoices ADD COLUMN x int",
                "TRUNCATE invoices",
            ] {
                let err = filter().validate(sql, role).unwrap_err();
                assert!(matches!(err, EngineError::Policy(_)), "{} should fail for {}", sql, role);
            }
        }
    }

    #[test]
    fn manager_may_insert_but_not_update() {
        assert!(filter()
            .validate("INSERT INTO invoices (customer_id, total_amount) VALUES (1, 99.5)", Role::Manager)
            .is_ok());

        let err = filter()
            .validate("UPDATE invoices SET status = 'paid'", Role::Manager)
            .unwrap_err();
        assert!(err.detail().contains("UPDATE"));
    }

    #[test]
    fn admin_is_unrestricted_by_validate() {
        assert!(filter().validate("DELETE FROM invoices WHERE invoice_id = 3", Role::Admin).is_ok());
    }

    #[test]
    fn first_violation_in_statement_order_is_reported() {
        let err = filter()
            .validate("DELETE FROM invoices; DROP TABLE customers", Role::Viewer)
            .unwrap_err();
        assert!(err.detail().contains("DELETE"));
    }

    #[test]
    fn column_names_containing_keywords_are_not_mutations() {
        let sql = "SELECT updated_at, created_by FROM invoices WHERE status = 'created'";
        assert!(filter().validate(sql, Role::Viewer).is_ok());
    }

    #[test]
    fn visitor_cannot_reference_customers_or_products() {
        let err = filter()
            .validate("SELECT COUNT(*) FROM customers", Role::Visitor)
            .unwrap_err();
        assert!(err.detail().contains("visitor"));
        assert!(filter()
            .validate("SELECT * FROM products", Role::Visitor)
            .is_err());
        assert!(filter()
            .validate("SELECT SUM(total_amount) FROM invoices", Role::Visitor)
            .is_ok());
    }

    #[test]
    fn read_statement_is_required_for_every_role() {
        for role in Role::ALL {
            assert!(filter().apply("  select 1", role).is_ok());
            assert!(filter().apply("WITH t AS (SELECT 1) SELECT * FROM t", role).is_ok());
        }
        let err = filter()
            .apply("INSERT INTO invoices (total_amount) VALUES (1)", Role::Manager)
            .unwrap_err();
        assert!(matches!(err, EngineError::Policy(_)));
        assert!(filter().apply("   ", Role::Admin).is_err());
    }

    #[test]
    fn viewer_rewrite_replaces_aliased_name_column() {
        let out = filter().rewrite("SELECT c.name FROM customers c", Role::Viewer);
        assert!(out.contains("CONCAT('Customer #', c.customer_id)"));
        assert!(!out.contains("c.name"));
    }

    #[test]
    fn viewer_rewrite_handles_table_qualifier_and_as_alias() {
        let out = filter().rewrite(
            "SELECT cu.name AS customer_name, SUM(i.total_amount) AS total FROM invoices i JOIN customers AS cu ON cu.customer_id = i.customer_id GROUP BY cu.name",
            Role::Viewer,
        );
        assert!(!out.contains("cu.name"));
        assert!(!out.contains("customer_name"));
        assert!(out.contains("AS customer_id"));

        let out = filter().rewrite("SELECT customers.name FROM customers", Role::Viewer);
        assert_eq!(out, "SELECT CONCAT('Customer #', customers.customer_id) FROM customers");
    }

    #[test]
    fn viewer_rewrite_replaces_bare_name_only_without_products() {
        let out = filter().rewrite("SELECT name FROM customers ORDER BY name", Role::Viewer);
        assert_eq!(
            out,
            "SELECT CONCAT('Customer #', customer_id) FROM customers ORDER BY CONCAT('Customer #', customer_id)"
        );

        let products = "SELECT p.name FROM products p";
        assert_eq!(filter().rewrite(products, Role::Viewer), products);
    }

    #[test]
    fn viewer_rewrite_keeps_name_alias() {
        let sql = "SELECT c.name AS name FROM customers c";
        assert_eq!(
            filter().apply(sql, Role::Viewer).unwrap(),
            "SELECT CONCAT('Customer #', c.customer_id) AS name FROM customers c"
        );
        assert_eq!(
            filter().rewrite("SELECT name AS name FROM customers", Role::Viewer),
            "SELECT CONCAT('Customer #', customer_id) AS name FROM customers"
        );
    }

    #[test]
    fn viewer_rewrite_is_idempotent() {
        for sql in [
            "SELECT c.name FROM customers c",
            "SELECT c.name AS name FROM customers c",
            "SELECT name, email FROM customers",
            "SELECT c.name AS customer_name FROM customers c JOIN invoices i ON i.customer_id = c.customer_id",
        ] {
            filter().validate(sql, Role::Viewer).unwrap();
            let once = filter().rewrite(sql, Role::Viewer);
            let twice = filter().rewrite(&once, Role::Viewer);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn other_roles_are_not_rewritten() {
        let sql = "SELECT c.name FROM customers c";
        for role in [Role::Visitor, Role::Manager, Role::Admin] {
            assert_eq!(filter().rewrite(sql, role), sql);
        }
    }

    #[test]
    fn stacked_statements_are_rejected() {
        let err = filter()
            .apply("SELECT 1; SELECT 2", Role::Admin)
            .unwrap_err();
        assert!(err.detail().contains("one statement"));
    }

    #[test]
    fn admin_delete_is_never_executed() {
        let err = filter()
            .apply("DELETE FROM invoices WHERE invoice_id = 3", Role::Admin)
            .unwrap_err();
        assert_eq!(err.detail(), "Only SELECT or WITH queries can be executed.");
    }

    #[test]
    fn generated_postgres_reads_pass() {
        for sql in [
            "SELECT TO_CHAR(invoice_date, 'YYYY-MM') AS month, SUM(total_amount) AS monthly_total FROM invoices GROUP BY month ORDER BY month",
            "SELECT EXTRACT(YEAR FROM invoice_date)::int AS year, COUNT(*) AS invoice_count FROM invoices GROUP BY year ORDER BY year",
            "SELECT CONCAT('Customer #', c.customer_id) FROM customers c",
        ] {
            assert!(filter().ensure_read_only(sql).is_ok(), "{}", sql);
        }
    }

    #[test]
    fn apply_strips_trailing_semicolon() {
        let out = filter().apply("SELECT COUNT(*) FROM invoices;", Role::Viewer).unwrap();
        assert_eq!(out, "SELECT COUNT(*) FROM invoices");
    }
}
