use rand::Rng;
use tower_sessions::Session;

use crate::AppResult;

pub const USER_ID: &str = "user_id";

const TOKEN_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Lowercase-alphanumeric token, same alphabet the room and user ids share.
pub fn token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| TOKEN_CHARS[rng.random_range(0..TOKEN_CHARS.len())] as char)
        .collect()
}

/// Display label for this session. Not an identity: 6 chars, ephemeral,
/// collisions possible and unhandled.
pub async fn user_id(session: &Session) -> AppResult<String> {
    if let Some(user_id) = session.get::<String>(USER_ID).await? {
        return Ok(user_id);
    }

    let user_id = token(6);
    session.insert(USER_ID, user_id.clone()).await?;
    Ok(user_id)
}
