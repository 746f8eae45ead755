pub mod executor;
pub mod postgres;
pub mod result;

pub use executor::{ExecutionOutcome, QueryExecutor, QueryStore, NO_ROWS_MESSAGE};
pub use postgres::PgQueryStore;
pub use result::QueryResult;
