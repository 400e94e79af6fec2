use axum::{
    debug_handler,
    extract::Query,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{include_res, session};

pub const ROOM_ID_LEN: usize = 9;

#[debug_handler]
pub async fn home() -> impl IntoResponse {
    Html(include_res!(str, "/pages/index.html"))
}

/// Rooms are not rows anywhere; a fresh token is all it takes.
#[debug_handler]
pub async fn new_room() -> Redirect {
    Redirect::to(&format!("/chat/{}", session::token(ROOM_ID_LEN)))
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    #[serde(default)]
    pub room_id: String,
}

/// Passes the operator-entered value through unvalidated, empty included.
#[debug_handler]
pub async fn join_room(Query(JoinQuery { room_id }): Query<JoinQuery>) -> Response {
    Redirect::to(&format!("/chat/{room_id}")).into_response()
}
