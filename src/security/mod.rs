pub mod policy;
pub mod sql_policy;

pub use policy::*;
pub use sql_policy::*;
