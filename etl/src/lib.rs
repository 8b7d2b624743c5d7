//! Batch ETL from object storage into a songplay star-schema warehouse.

pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
