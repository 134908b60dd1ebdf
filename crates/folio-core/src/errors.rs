use folio_core_types::{PageId, VersionId};
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on and that
/// the engine maps onto an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,

    // Mutation
    /// Version-number race or another write that lost to a concurrent writer
    Conflict,
    /// Attempt to delete the version a page currently publishes
    PublishedVersionProtected,

    // Validation
    InvalidInput,
    /// Unknown diff format requested
    InvalidDiffFormat,
    /// Document JSON does not match the stored snapshot shape
    InvalidDocument,

    // Hydration (degraded, never surfaced to render callers)
    DataSource,
    Condition,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Concurrency,

    // Auth
    Forbidden,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::PublishedVersionProtected => "ERR_PUBLISHED_VERSION_PROTECTED",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDiffFormat => "ERR_INVALID_DIFF_FORMAT",
            ExErrorKind::InvalidDocument => "ERR_INVALID_DOCUMENT",
            ExErrorKind::DataSource => "ERR_DATA_SOURCE",
            ExErrorKind::Condition => "ERR_CONDITION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Forbidden => "ERR_FORBIDDEN",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds caused by the request rather than by the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::NotFound
                | ExErrorKind::Conflict
                | ExErrorKind::PublishedVersionProtected
                | ExErrorKind::InvalidInput
                | ExErrorKind::InvalidDiffFormat
                | ExErrorKind::InvalidDocument
                | ExErrorKind::Forbidden
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the page/version/section the failure relates
/// to, so logs and API responses can be built without string parsing.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    page_id: Option<PageId>,
    version_id: Option<VersionId>,
    section_id: Option<i64>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            page_id: None,
            version_id: None,
            section_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add page context
    pub fn with_page_id(mut self, page_id: PageId) -> Self {
        self.page_id = Some(page_id);
        self
    }

    /// Add version context
    pub fn with_version_id(mut self, version_id: VersionId) -> Self {
        self.version_id = Some(version_id);
        self
    }

    /// Add section context
    pub fn with_section_id(mut self, section_id: i64) -> Self {
        self.section_id = Some(section_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    pub fn version_id(&self) -> Option<VersionId> {
        self.version_id
    }

    pub fn section_id(&self) -> Option<i64> {
        self.section_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(page_id) = self.page_id {
            write!(f, " (page_id: {})", page_id)?;
        }
        if let Some(version_id) = self.version_id {
            write!(f, " (version_id: {})", version_id)?;
        }
        if let Some(section_id) = self.section_id {
            write!(f, " (section_id: {})", section_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

// ========== End Error Facility ==========

/// Failures isolated to a single section during hydration.
///
/// These never abort a render. The pipeline logs them and records them in
/// the output's degraded list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydrationError {
    /// A configured data source could not be fetched
    #[error("Data source '{table}' failed for section {section_id}: {reason}")]
    DataSourceFailed {
        section_id: i64,
        table: String,
        reason: String,
    },

    /// The condition evaluator reported an error
    #[error("Condition evaluation failed for section {section_id}: {reason}")]
    ConditionFailed { section_id: i64, reason: String },

    /// The condition expression could not be parsed
    #[error("Invalid condition expression: {reason}")]
    InvalidCondition { reason: String },
}

impl HydrationError {
    /// Section the failure belongs to, if known
    pub fn section_id(&self) -> Option<i64> {
        match self {
            HydrationError::DataSourceFailed { section_id, .. }
            | HydrationError::ConditionFailed { section_id, .. } => Some(*section_id),
            HydrationError::InvalidCondition { .. } => None,
        }
    }

    /// Attribute the failure to `section_id`.
    ///
    /// Collaborators do not know which section they serve; the pipeline
    /// stamps it. An unparsable condition becomes a failure of that section.
    pub fn for_section(self, section_id: i64) -> Self {
        match self {
            HydrationError::DataSourceFailed { table, reason, .. } => {
                HydrationError::DataSourceFailed {
                    section_id,
                    table,
                    reason,
                }
            }
            HydrationError::ConditionFailed { reason, .. }
            | HydrationError::InvalidCondition { reason } => {
                HydrationError::ConditionFailed { section_id, reason }
            }
        }
    }
}

impl From<HydrationError> for ExError {
    fn from(err: HydrationError) -> Self {
        let kind = match &err {
            HydrationError::DataSourceFailed { .. } => ExErrorKind::DataSource,
            HydrationError::ConditionFailed { .. } | HydrationError::InvalidCondition { .. } => {
                ExErrorKind::Condition
            }
        };
        let mut ex = ExError::new(kind)
            .with_op("hydrate")
            .with_message(err.to_string());
        if let Some(section_id) = err.section_id() {
            ex = ex.with_section_id(section_id);
        }
        ex
    }
}
