//! SQL construction from table metadata and correlation maps.
//!
//! Every builder takes metadata that has already been discovered and
//! returns a [`Statement`]: placeholder SQL, the bound values and an inline
//! rendering for logs and cache keys.

mod aggregate;
mod ddl;
mod select;
mod statement;
mod write;

pub use aggregate::{aggregate, Aggregate, AggregateOp};
pub use ddl::{create_table, drop_table, table_exists};
pub use select::{select, select_joined, validate_joins, Join, JoinedTables};
pub use statement::Statement;
pub use write::{delete, insert, update};
