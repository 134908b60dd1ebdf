//! Page render orchestration.
//!
//! ## Steps (in order):
//! 1. Effective preview = `preview && can_preview`
//! 2. Resolve the source (draft, published version, or draft fallback)
//! 3. Refuse an unpublished page to callers without preview rights
//! 4. Hydrate; published renders go through the `page_render` cache

use std::sync::Arc;
use std::time::Instant;

use folio_core::cache::{EntityScope, ScopeKind};
use folio_core::errors::{ExError, ExErrorKind, Result};
use folio_core::hydration::{HydrationPipeline, HydrationRequest, TreeSource};
use folio_core::model::HydratedDocument;
use folio_core::resolver::{AccessControl, ResolveReason, SourceKind, SourceResolver};
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::{LanguageId, PageId, UserId, VersionId};
use folio_store::{PageRepo, SqliteDataGateway, SqlitePageSource};
use rusqlite::Connection;
use serde::Serialize;

use crate::context::{EngineContext, CATEGORY_PAGE_RENDER};

/// Scope id used for renders without a user
const ANONYMOUS: &str = "anonymous";

/// One render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub page_id: PageId,
    /// Falls back to the configured default language
    pub language_id: Option<LanguageId>,
    pub user_id: Option<UserId>,
    pub preview: bool,
    /// Outcome of the caller's access check
    pub can_preview: bool,
}

impl RenderRequest {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            language_id: None,
            user_id: None,
            preview: false,
            can_preview: false,
        }
    }

    pub fn with_language(mut self, language_id: LanguageId) -> Self {
        self.language_id = Some(language_id);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_preview(mut self, preview: bool, can_preview: bool) -> Self {
        self.preview = preview;
        self.can_preview = can_preview;
        self
    }

    /// Set `can_preview` from an access check on the page's keyword
    ///
    /// # Errors
    ///
    /// - `NotFound` if the page does not exist
    pub fn authorize(mut self, access: &dyn AccessControl, conn: &Connection) -> Result<Self> {
        let keyword = PageRepo::load_metadata(conn, self.page_id)?.keyword;
        self.can_preview = access.check_read_access(&keyword, self.user_id);
        Ok(self)
    }
}

/// Which tree a render was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedFrom {
    Draft,
    Version { version_id: VersionId },
}

/// A section that was degraded during hydration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedSection {
    pub section_id: i64,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    pub page_id: PageId,
    pub language_id: LanguageId,
    pub source: RenderedFrom,
    pub reason: &'static str,
    pub document: HydratedDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedSection>,
    pub cache_hit: bool,
}

impl RenderResult {
    pub fn is_draft(&self) -> bool {
        self.source == RenderedFrom::Draft
    }
}

/// Cached part of a render
#[derive(Debug, Clone)]
struct RenderedPage {
    document: HydratedDocument,
    degraded: Vec<DegradedSection>,
}

/// Render a page for one language and user
///
/// # Errors
///
/// - `NotFound` if the page does not exist, or is unpublished and the
///   caller may not preview
pub fn render_page(
    request: &RenderRequest,
    conn: &Connection,
    ctx: &EngineContext,
) -> Result<RenderResult> {
    let page_id = request.page_id;
    log_op_start!("render_page", page_id = page_id.get());
    let start = Instant::now();

    let result = render_inner(request, conn, ctx);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(r) => log_op_end!(
            "render_page",
            duration_ms = elapsed,
            page_id = page_id.get(),
            reason = r.reason,
            cache_hit = r.cache_hit
        ),
        Err(e) => {
            let e_clone = e.clone();
            log_op_error!("render_page", e_clone, duration_ms = elapsed);
        }
    }
    result
}

fn render_inner(
    request: &RenderRequest,
    conn: &Connection,
    ctx: &EngineContext,
) -> Result<RenderResult> {
    let page_id = request.page_id;
    let language_id = request
        .language_id
        .unwrap_or_else(|| ctx.config.default_language());
    let preview = request.preview && request.can_preview;

    let source = SqlitePageSource::new(conn, language_id);
    let resolved = SourceResolver::new(&source, &source).resolve(page_id, preview)?;

    if resolved.reason == ResolveReason::Unpublished && !request.can_preview {
        return Err(ExError::new(ExErrorKind::NotFound)
            .with_op("render_page")
            .with_page_id(page_id)
            .with_message("page is not published"));
    }

    let gateway = SqliteDataGateway::new(conn);
    let pipeline = HydrationPipeline::new(&gateway);
    let hydrate = |tree: TreeSource| {
        let output = pipeline.hydrate(
            &resolved.document,
            &HydrationRequest {
                language_id,
                user_id: request.user_id,
                source: tree,
            },
        );
        let degraded = output
            .degraded
            .into_iter()
            .map(|node| {
                let ex: ExError = node.error.into();
                DegradedSection {
                    section_id: node.section_id,
                    code: ex.code().to_string(),
                    message: ex.message().to_string(),
                }
            })
            .collect();
        let page = Arc::new(RenderedPage {
            document: output.document,
            degraded,
        });
        (page, output.tables)
    };

    let mut cache_hit = false;
    let (source, rendered) = match resolved.kind {
        SourceKind::Draft => (RenderedFrom::Draft, hydrate(TreeSource::Draft).0),
        SourceKind::Version(version_id) => {
            let rendered = match ctx.cache() {
                Some(cache) => {
                    let user_scope = request
                        .user_id
                        .map(|u| u.get().to_string())
                        .unwrap_or_else(|| ANONYMOUS.to_string());
                    let handle = cache
                        .with_category(CATEGORY_PAGE_RENDER)
                        .with_entity_scope(ScopeKind::Page, page_id.get())
                        .with_entity_scope(ScopeKind::Language, language_id.get())
                        .with_entity_scope(ScopeKind::User, &user_scope);
                    let key = format!("{}:{}:{}", version_id, language_id, user_scope);
                    cache_hit = true;
                    // table names are only known once interpolated
                    handle.get_with_dependencies(&key, || {
                        cache_hit = false;
                        let (page, tables) = hydrate(TreeSource::Stored);
                        let scopes = tables
                            .into_iter()
                            .map(|table| EntityScope::new(ScopeKind::DataTable, table))
                            .collect();
                        (page, scopes)
                    })
                }
                None => hydrate(TreeSource::Stored).0,
            };
            (RenderedFrom::Version { version_id }, rendered)
        }
    };

    Ok(RenderResult {
        page_id,
        language_id,
        source,
        reason: resolved.reason.as_str(),
        document: rendered.document.clone(),
        degraded: rendered.degraded.clone(),
        cache_hit,
    })
}
