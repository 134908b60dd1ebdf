//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_pages_and_sections",
            sql: include_str!("../../migrations/001_pages_and_sections.sql"),
        },
        Migration {
            id: "002_page_versions",
            sql: include_str!("../../migrations/002_page_versions.sql"),
        },
        Migration {
            id: "003_data_rows",
            sql: include_str!("../../migrations/003_data_rows.sql"),
        },
    ]
}
