//! Persistence layer — libSQL-backed storage for connections, leads,
//! threads, and messages.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::Database;
