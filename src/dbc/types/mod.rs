pub mod attributes;
pub mod comment;
pub mod database;
pub mod errors;
pub mod message;
pub mod node;
pub mod object;
pub mod signal;
pub mod value_table;
