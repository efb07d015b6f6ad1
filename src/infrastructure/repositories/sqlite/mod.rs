pub mod connection;
pub mod ddl;
pub mod error;
pub mod reorder;
pub mod repository;
pub mod schema;
