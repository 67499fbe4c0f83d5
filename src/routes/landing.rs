use axum::response::Html;

use crate::routes::extractors::Caller;
use crate::views;

/// GET / (intern) - who am I
pub async fn landing(Caller(caller): Caller) -> Html<String> {
    Html(views::landing(&caller))
}
