use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, RawQuery, State};
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::classes::{ClassFilter, class_page};
use crate::fetch::SiteClient;
use crate::progress::{LookupForm, ProgressLookup, ProgressPage, RecordFilter};
use crate::render::{OutputFormat, Page, render};
use crate::resources::resource_page;
use crate::session::MemorySessionStore;

#[derive(Clone)]
pub struct SiteState {
    pub client: SiteClient,
}

/// Page routes plus an optional static directory for everything else.
pub fn router(state: SiteState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/", get(classes_handler))
        .route("/index.html", get(classes_handler))
        .route("/resources.html", get(resources_handler))
        .route("/progress.html", get(progress_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(dir) = static_dir {
        if dir.is_dir() {
            tracing::info!(dir = %dir.display(), "serving static files");
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            tracing::warn!(dir = %dir.display(), "static dir not found; skipping");
        }
    }
    app
}

fn html_page<P: Page>(page: &P) -> Html<String> {
    match render(page, OutputFormat::Html) {
        Ok(html) => Html(html),
        Err(err) => {
            tracing::error!(?err, "render page");
            Html(String::from("<!doctype html><p>Something went wrong.</p>\n"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClassesQuery {
    filter: Option<String>,
}

async fn classes_handler(
    State(state): State<SiteState>,
    Query(q): Query<ClassesQuery>,
) -> Html<String> {
    let filter = q
        .filter
        .as_deref()
        .map(ClassFilter::parse_lenient)
        .unwrap_or_default();
    html_page(&class_page(&state.client, filter).await)
}

/// `q` is the search term; `tag` may repeat.
fn resources_query(raw: Option<&str>) -> (String, Vec<String>) {
    let mut search = String::new();
    let mut tags = Vec::new();
    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "q" => search = value.into_owned(),
            "tag" if !value.is_empty() => tags.push(value.into_owned()),
            _ => {}
        }
    }
    (search, tags)
}

async fn resources_handler(
    State(state): State<SiteState>,
    RawQuery(raw): RawQuery,
) -> Html<String> {
    let (search, tags) = resources_query(raw.as_deref());
    html_page(&resource_page(&state.client, &search, &tags).await)
}

#[derive(Debug, Default, Deserialize)]
struct ProgressQuery {
    last_name: Option<String>,
    year: Option<String>,
    month: Option<String>,
    day: Option<String>,
    category: Option<String>,
}

/// Each request looks up from scratch; the session lives only as long as the request.
async fn progress_handler(
    State(state): State<SiteState>,
    Query(q): Query<ProgressQuery>,
) -> Html<String> {
    if q.last_name.is_none() && q.year.is_none() && q.month.is_none() && q.day.is_none() {
        return html_page(&ProgressPage::default());
    }

    let form = LookupForm {
        last_name: q.last_name.unwrap_or_default(),
        year: q.year.unwrap_or_default(),
        month: q.month.unwrap_or_default(),
        day: q.day.unwrap_or_default(),
    };
    let mut lookup = ProgressLookup::new(
        state.client.clone(),
        Arc::new(MemorySessionStore::default()),
    );
    lookup.set_filter(
        q.category
            .as_deref()
            .map(RecordFilter::parse_lenient)
            .unwrap_or_default(),
    );
    html_page(&lookup.submit(&form).await)
}
