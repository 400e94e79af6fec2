use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{include_res, res::escape_html, session, AppResult};

use super::msg;

/// Initial load of the chat view. A failed query still renders the page,
/// with the error line shown above an empty list; there is no retry.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let user_id = session::user_id(&session).await?;

    let (messages, error) = match msg::load_messages(&db_pool, &room_id).await {
        Ok(msgs) => (
            msgs.iter().map(msg::msg_to_html).collect::<String>(),
            String::new(),
        ),
        Err(e) => (String::new(), format!("Error loading messages: {e}")),
    };

    let body = include_res!(str, "/pages/chat.html")
        .replace("{room_id}", &escape_html(&room_id))
        .replace("{user_id}", &escape_html(&user_id))
        .replace("{error}", &escape_html(&error))
        .replace("{messages}", &messages);

    Ok(Html(body).into_response())
}
