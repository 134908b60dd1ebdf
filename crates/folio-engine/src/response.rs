//! HTTP response contract.
//!
//! The engine does not own an HTTP server; these helpers turn engine results
//! into the status, headers and JSON body a route handler must send.

use std::collections::BTreeMap;

use folio_core::errors::{ExError, ExErrorKind, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::engine_command::EngineCommandResult;
use crate::commands::engine_query::EngineQueryResult;
use crate::commands::render::RenderResult;

pub const HEADER_CACHE_CONTROL: &str = "Cache-Control";
pub const HEADER_ROBOTS: &str = "X-Robots-Tag";

pub const CACHE_NO_STORE: &str = "no-store";
pub const CACHE_PUBLISHED: &str = "public, max-age=0, must-revalidate";
pub const ROBOTS_NOINDEX: &str = "noindex";

/// Status, headers and JSON body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl HttpResponse {
    fn json(status: u16, body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status,
                headers: BTreeMap::new(),
                body,
            },
            Err(e) => error_response(&ExError::from(e).with_op("response")),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ExErrorKind) -> u16 {
    match kind {
        ExErrorKind::NotFound => 404,
        ExErrorKind::Conflict => 409,
        ExErrorKind::PublishedVersionProtected
        | ExErrorKind::InvalidInput
        | ExErrorKind::InvalidDiffFormat
        | ExErrorKind::InvalidDocument => 400,
        ExErrorKind::Forbidden => 403,
        _ => 500,
    }
}

/// `{ "error": { "code", "message" } }`; server errors get a generic message
pub fn error_response(err: &ExError) -> HttpResponse {
    let status = status_for(err.kind());
    let message = if status >= 500 {
        tracing::error!(err_code = err.code(), "Internal error: {}", err);
        "An internal error occurred".to_string()
    } else {
        err.message().to_string()
    };
    HttpResponse {
        status,
        headers: BTreeMap::new(),
        body: json!({ "error": { "code": err.code(), "message": message } }),
    }
}

/// Render response; drafts are never cacheable or indexable
pub fn render_response(result: &Result<RenderResult>) -> HttpResponse {
    match result {
        Ok(render) if render.is_draft() => HttpResponse::json(200, render)
            .with_header(HEADER_CACHE_CONTROL, CACHE_NO_STORE)
            .with_header(HEADER_ROBOTS, ROBOTS_NOINDEX),
        Ok(render) => {
            HttpResponse::json(200, render).with_header(HEADER_CACHE_CONTROL, CACHE_PUBLISHED)
        }
        Err(e) => error_response(e),
    }
}

/// Write command response; a publish is `201 Created`
pub fn command_response(result: &Result<EngineCommandResult>) -> HttpResponse {
    match result {
        Ok(EngineCommandResult::Published(publish)) => HttpResponse::json(
            201,
            json!({
                "version_id": publish.version_id,
                "version_number": publish.version_number,
                "published_at": publish.published_at,
            }),
        ),
        Ok(other) => HttpResponse::json(200, other),
        Err(e) => error_response(e),
    }
}

/// Query response
pub fn query_response(result: &Result<EngineQueryResult>) -> HttpResponse {
    match result {
        Ok(EngineQueryResult::Comparison(compare)) => HttpResponse::json(
            200,
            json!({
                "version1": compare.version1,
                "version2": compare.version2,
                "format": compare.format,
                "diff": compare.diff,
            }),
        ),
        Ok(other) => HttpResponse::json(200, other),
        Err(e) => error_response(e),
    }
}
