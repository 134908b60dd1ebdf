//! Repository layer for draft pages and data tables

pub mod data_rows;
pub mod page_repo;

pub use data_rows::SqliteDataGateway;
pub use page_repo::{NewSection, PageRepo};
