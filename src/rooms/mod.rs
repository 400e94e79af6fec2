pub mod msg;
mod page;
pub mod send;
mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{room_id}", get(page::room))
        .route("/{room_id}/ws", get(ws::room_ws))
        .route("/{room_id}/send", post(send::send))
}
