use axum::{
    debug_handler,
    extract::{ws::WebSocket, Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::msg::Message;

/// Realtime subscription for one room. One broadcast subscription per
/// socket, torn down with it; events for other rooms are dropped here, so
/// a stale frame can never land in the wrong list.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<String>,
    State(tx): State<broadcast::Sender<Message>>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| subscription(stream, tx, room_id))
}

async fn subscription(stream: WebSocket, tx: broadcast::Sender<Message>, room_id: String) {
    let mut rx = tx.subscribe();
    let (mut sender, mut receiver) = stream.split();

    let forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) if msg.room_id == room_id => {
                    let Ok(json) = serde_json::to_string(&msg) else {
                        continue;
                    };
                    if sender.send(json.into()).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                // lagged events are lost, not replayed
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // inbound frames are not part of the protocol; drain until the peer goes away
    while let Some(Ok(_)) = receiver.next().await {}

    forward_task.abort();
}
