use std::fmt;

use axum::{
    body::Bytes,
    debug_handler,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{session, storage::Storage, AppResult};

use super::msg::{self, Message};

#[derive(Debug)]
pub enum SendOutcome {
    /// No text, no file: nothing to say, nothing touched.
    Empty,
    Sent(Message),
}

#[derive(Debug)]
pub enum SendError {
    Upload(anyhow::Error),
    Insert(anyhow::Error),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Upload(e) => write!(f, "File upload failed: {e}"),
            SendError::Insert(e) => write!(f, "Message send failed: {e}"),
        }
    }
}

impl std::error::Error for SendError {}

/// The send path: guard, upload, insert, echo.
///
/// A failed upload aborts before any insert, so a broken attachment never
/// leaves a partial message behind. The reverse, an uploaded file whose
/// insert fails, stays as an orphaned object with no cleanup.
pub async fn send_message(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Message>,
    storage: &Storage,

    room_id: &str,
    user_id: &str,
    text: &str,
    file: Option<(&str, &[u8])>,
) -> Result<SendOutcome, SendError> {
    if text.is_empty() && file.is_none() {
        return Ok(SendOutcome::Empty);
    }

    let mut file_url = String::new();
    if let Some((name, bytes)) = file {
        let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        let stored = Storage::stored_name(name, millis);
        let path = storage
            .upload(room_id, &stored, bytes)
            .await
            .map_err(SendError::Upload)?;
        file_url = storage.public_url(&path);
    }

    let message =
        Message::new(room_id, user_id, text, &file_url).map_err(SendError::Insert)?;
    msg::insert_msg(db_pool, tx, &message)
        .await
        .map_err(|e| SendError::Insert(e.into()))?;

    tracing::debug!(room_id, user_id, "message sent");
    Ok(SendOutcome::Sent(message))
}

/// The sender sees the message come back over their own ws subscription;
/// nothing is returned in the response body on success.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    Path(room_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Message>>,
    State(storage): State<Storage>,
    session: Session,

    mut multipart: Multipart,
) -> AppResult<Response> {
    let user_id = session::user_id(&session).await?;

    // a body that cannot be read to completion is an upload problem,
    // surfaced with the same prefix as a failed store
    let outcome = match read_form(multipart).await {
        Ok((text, file)) => {
            let file = file.as_ref().map(|(name, bytes)| (name.as_str(), bytes.as_ref()));
            send_message(&db_pool, &tx, &storage, &room_id, &user_id, &text, file).await
        }
        Err(e) => Err(SendError::Upload(e.into())),
    };

    Ok(match outcome {
        Ok(SendOutcome::Empty) => StatusCode::NO_CONTENT.into_response(),
        Ok(SendOutcome::Sent(_)) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    })
}

async fn read_form(
    mut multipart: Multipart,
) -> Result<(String, Option<(String, Bytes)>), MultipartError> {
    let mut text = String::new();
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("text") => text = field.text().await?,
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                // a file input left blank still posts an empty part
                if !name.is_empty() {
                    file = Some((name, bytes));
                }
            }
            _ => {}
        }
    }
    Ok((text, file))
}
