//! Role-scoped schema descriptions fed to the translator.
//!
//! These texts are hand-maintained and must track the real tables.

use crate::error::Result;
use crate::security::policy::Role;

const VISITOR_SCHEMA: &str = r#"Accessible tables (visitor: sales data only):

invoices
  - invoice_id     INTEGER  primary key
  - invoice_date   DATE     date the sale was made
  - total_amount   NUMERIC  invoice total in dollars
  - status         TEXT     draft | pending | paid | cancelled

Customer and product data are NOT available to this role. Never reference
the customers or products tables, and never expose customer_id."#;

const VIEWER_SCHEMA: &str = r#"Accessible tables (viewer: read-only, customers are anonymised):

customers
  - customer_id    INTEGER  primary key
  - created_at     TIMESTAMP
  (customer names and contact details are hidden; refer to customers as
   'Customer #<customer_id>')

invoices
  - invoice_id     INTEGER  primary key
  - customer_id    INTEGER  references customers.customer_id
  - invoice_date   DATE
  - total_amount   NUMERIC  invoice total in dollars
  - status         TEXT     draft | pending | paid | cancelled

products
  - product_id     INTEGER  primary key
  - name           TEXT
  - category       TEXT
  - unit_price     NUMERIC
  - stock_quantity INTEGER
  - created_at     TIMESTAMP

Only SELECT statements are allowed."#;

const MANAGER_SCHEMA: &str = r#"Accessible tables (manager: read all, may create invoices):

customers
  - customer_id    INTEGER  primary key
  - name           TEXT
  - email          TEXT
  - phone          TEXT
  - address        TEXT
  - created_at     TIMESTAMP

invoices
  - invoice_id     INTEGER  primary key
  - customer_id    INTEGER  references customers.customer_id
  - invoice_date   DATE
  - total_amount   NUMERIC  invoice total in dollars
  - status         TEXT     draft | pending | paid | cancelled
  - created_by     INTEGER  user who created the invoice

products
  - product_id     INTEGER  primary key
  - name           TEXT
  - category       TEXT
  - unit_price     NUMERIC
  - stock_quantity INTEGER
  - created_at     TIMESTAMP

SELECT and INSERT are allowed. UPDATE, DELETE and schema changes are not."#;

const ADMIN_SCHEMA: &str = r#"Accessible tables (admin: full access):

customers
  - customer_id    INTEGER  primary key
  - name           TEXT
  - email          TEXT
  - phone          TEXT
  - address        TEXT
  - created_at     TIMESTAMP

invoices
  - invoice_id     INTEGER  primary key
  - customer_id    INTEGER  references customers.customer_id
  - invoice_date   DATE
  - total_amount   NUMERIC  invoice total in dollars
  - status         TEXT     draft | pending | paid | cancelled
  - created_by     INTEGER  user who created the invoice

products
  - product_id     INTEGER  primary key
  - name           TEXT
  - category       TEXT
  - unit_price     NUMERIC
  - stock_quantity INTEGER
  - created_at     TIMESTAMP

users
  - user_id        INTEGER  primary key
  - username       TEXT
  - role           TEXT     visitor | viewer | manager | admin
  - full_name      TEXT

activity_logs
  - log_id         INTEGER  primary key
  - user_id        INTEGER  references users.user_id
  - action         TEXT
  - created_at     TIMESTAMP"#;

/// Static per-role view of the queryable schema.
pub struct SchemaProvider;

impl SchemaProvider {
    pub fn schema_for(role: Role) -> &'static str {
        match role {
            Role::Visitor => VISITOR_SCHEMA,
            Role::Viewer => VIEWER_SCHEMA,
            Role::Manager => MANAGER_SCHEMA,
            Role::Admin => ADMIN_SCHEMA,
        }
    }

    /// Look up by role name; unknown names are a configuration error.
    pub fn schema_for_name(role: &str) -> Result<&'static str> {
        Ok(Self::schema_for(Role::parse(role)?))
    }
}
