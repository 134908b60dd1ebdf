//! Render command

use clap::Args;
use folio_core_types::{LanguageId, UserId};
use folio_engine::response::render_response;
use folio_engine::{render_page, RenderRequest};

use super::{print_json, CliResult, Session};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page id or keyword
    pub page: String,

    /// Render the live draft
    #[arg(long)]
    pub preview: bool,

    /// Caller holds preview rights
    #[arg(long)]
    pub can_preview: bool,

    #[arg(long)]
    pub user: Option<i64>,

    /// Print status, headers and body instead of the bare render
    #[arg(long)]
    pub http: bool,
}

pub fn execute(args: RenderArgs, session: &Session) -> CliResult {
    let mut request = RenderRequest::new(session.resolve_page(&args.page)?)
        .with_language(LanguageId::new(session.ctx.config.default_language_id))
        .with_preview(args.preview, args.can_preview);
    if let Some(user) = args.user {
        request = request.with_user(UserId::new(user));
    }

    let result = render_page(&request, &session.conn, &session.ctx);
    if args.http {
        let response = render_response(&result);
        return print_json(&serde_json::json!({
            "status": response.status,
            "headers": response.headers,
            "body": response.body,
        }));
    }
    print_json(&result?)
}
