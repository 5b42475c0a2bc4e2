pub mod config;
pub mod equal;
pub mod error;
pub mod lazy;
pub mod printer;
pub mod reader;
pub mod reindex;
pub mod scott;
pub mod store;
pub mod stream;
pub mod sugar;
pub mod term;
