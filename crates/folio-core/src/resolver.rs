//! Draft vs. published-version source selection.

use folio_core_types::schema::EVENT_FALLBACK;
use folio_core_types::{PageId, UserId, VersionId};

use crate::errors::Result;
use crate::model::{Document, Version};

/// Read access to stored versions and the published pointer
pub trait VersionSource {
    /// The version a page currently publishes, if any
    ///
    /// # Errors
    ///
    /// Storage failures; a page without a pointer is `Ok(None)`.
    fn published_version_id(&self, page_id: PageId) -> Result<Option<VersionId>>;

    /// # Errors
    ///
    /// `NotFound` for a missing row, `InvalidDocument` for a corrupt snapshot.
    fn load_version(&self, version_id: VersionId) -> Result<Version>;
}

/// Read access to the live draft
pub trait DraftSource {
    /// # Errors
    ///
    /// `NotFound` when the page does not exist.
    fn load_draft(&self, page_id: PageId) -> Result<Document>;
}

/// Decides whether a user may see a page's unpublished draft.
///
/// Consulted by the caller before resolving; the resolver itself only sees
/// the resulting preview flag.
pub trait AccessControl {
    fn check_read_access(&self, page_keyword: &str, user_id: Option<UserId>) -> bool;
}

/// Grants draft access to a fixed set of users; anonymous callers never
/// qualify
#[derive(Debug, Clone, Default)]
pub struct EditorList {
    editors: Vec<UserId>,
}

impl EditorList {
    pub fn new(editors: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            editors: editors.into_iter().collect(),
        }
    }
}

impl AccessControl for EditorList {
    fn check_read_access(&self, _page_keyword: &str, user_id: Option<UserId>) -> bool {
        user_id.is_some_and(|u| self.editors.contains(&u))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Draft,
    Version(VersionId),
}

/// Why a source was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveReason {
    /// Preview requested
    Preview,
    /// Page has no published version
    Unpublished,
    /// Published version could not be loaded
    Fallback,
    Published,
}

impl ResolveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveReason::Preview => "preview",
            ResolveReason::Unpublished => "unpublished",
            ResolveReason::Fallback => "fallback",
            ResolveReason::Published => "published",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    pub reason: ResolveReason,
    pub document: Document,
}

impl ResolvedSource {
    pub fn is_draft(&self) -> bool {
        self.kind == SourceKind::Draft
    }
}

/// Decide which document a render request hydrates.
///
/// Published-side failures (pointer lookup, missing or corrupt row) fall
/// back to the draft and are logged; only a failing draft load is returned
/// as an error.
pub struct SourceResolver<'a, V: ?Sized, D: ?Sized> {
    versions: &'a V,
    drafts: &'a D,
}

impl<'a, V, D> SourceResolver<'a, V, D>
where
    V: VersionSource + ?Sized,
    D: DraftSource + ?Sized,
{
    pub fn new(versions: &'a V, drafts: &'a D) -> Self {
        Self { versions, drafts }
    }

    /// # Errors
    ///
    /// Only errors from loading the draft.
    pub fn resolve(&self, page_id: PageId, preview: bool) -> Result<ResolvedSource> {
        if preview {
            return self.draft(page_id, ResolveReason::Preview);
        }

        let version_id = match self.versions.published_version_id(page_id) {
            Ok(Some(id)) => id,
            Ok(None) => return self.draft(page_id, ResolveReason::Unpublished),
            Err(err) => {
                tracing::warn!(
                    event = EVENT_FALLBACK,
                    page_id = page_id.get(),
                    err_code = err.code(),
                    "Published pointer lookup failed, serving draft: {}",
                    err
                );
                return self.draft(page_id, ResolveReason::Fallback);
            }
        };

        match self.versions.load_version(version_id) {
            Ok(version) if version.page_id == page_id => Ok(ResolvedSource {
                kind: SourceKind::Version(version_id),
                reason: ResolveReason::Published,
                document: version.document,
            }),
            Ok(version) => {
                tracing::warn!(
                    event = EVENT_FALLBACK,
                    page_id = page_id.get(),
                    version_id = version_id.get(),
                    "Published version belongs to page {}, serving draft",
                    version.page_id
                );
                self.draft(page_id, ResolveReason::Fallback)
            }
            Err(err) => {
                tracing::warn!(
                    event = EVENT_FALLBACK,
                    page_id = page_id.get(),
                    version_id = version_id.get(),
                    err_code = err.code(),
                    "Published version unavailable, serving draft: {}",
                    err
                );
                self.draft(page_id, ResolveReason::Fallback)
            }
        }
    }

    fn draft(&self, page_id: PageId, reason: ResolveReason) -> Result<ResolvedSource> {
        Ok(ResolvedSource {
            kind: SourceKind::Draft,
            reason,
            document: self.drafts.load_draft(page_id)?,
        })
    }
}
