use serde::{Deserialize, Serialize};

/// Kind of entity a cache entry depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Page,
    Section,
    User,
    Language,
    DataTable,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Page => "page",
            ScopeKind::Section => "section",
            ScopeKind::User => "user",
            ScopeKind::Language => "language",
            ScopeKind::DataTable => "data_table",
        }
    }
}

/// A `(kind, id)` pair used as a unit of cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityScope {
    pub kind: ScopeKind,
    pub id: String,
}

impl EntityScope {
    pub fn new(kind: ScopeKind, id: impl ToString) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for EntityScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
