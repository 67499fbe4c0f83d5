// ============================================================================
// Public Routes
// ============================================================================
//
// Read-only pages served to every host that is not an intern host.
//
// ============================================================================

use axum::{response::Html, routing::get, Router};

use crate::views;

pub fn public_router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/resume", get(resume))
        .route("/blog", get(blog))
}

async fn home() -> Html<String> {
    Html(views::public_home())
}

async fn resume() -> Html<String> {
    Html(views::public_resume())
}

async fn blog() -> Html<String> {
    Html(views::public_blog())
}
