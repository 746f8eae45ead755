//! Database module for PostgreSQL connectivity

pub mod connection;

pub use connection::init_pool;
