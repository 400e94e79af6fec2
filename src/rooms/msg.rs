use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{include_res, res::escape_html};

/// One row of the messages table. Immutable once inserted; there is no
/// edit or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub text: String,
    pub file: String,
    pub created_at: String,
}

impl Message {
    pub fn new(room_id: &str, user_id: &str, text: &str, file: &str) -> anyhow::Result<Self> {
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            room_id: room_id.to_owned(),
            user_id: user_id.to_owned(),
            text: text.to_owned(),
            file: file.to_owned(),
            created_at: timestamp(OffsetDateTime::now_utc())?,
        })
    }
}

/// Fixed three-digit subseconds so that string order is time order.
pub(crate) fn timestamp(at: OffsetDateTime) -> anyhow::Result<String> {
    let fmt = time::macros::format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    Ok(at.format(fmt)?)
}

pub async fn load_messages(
    db_pool: &SqlitePool,
    room_id: &str,
) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,room_id,user_id,text,file,created_at FROM messages
         WHERE room_id=? ORDER BY created_at ASC",
    )
    .bind(room_id)
    .fetch_all(db_pool)
    .await
}

/// Inserts the row, then echoes it on the realtime feed. Nobody listening
/// is not an error.
pub async fn insert_msg(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<Message>,
    msg: &Message,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO messages (id,room_id,user_id,text,file,created_at) values (?,?,?,?,?,?)",
    )
    .bind(&msg.id)
    .bind(&msg.room_id)
    .bind(&msg.user_id)
    .bind(&msg.text)
    .bind(&msg.file)
    .bind(&msg.created_at)
    .execute(db_pool)
    .await?;

    let _ = tx.send(msg.clone());

    Ok(())
}

pub(crate) fn msg_to_html(msg: &Message) -> String {
    let text = if msg.text.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape_html(&msg.text))
    };

    let file = if msg.file.is_empty() {
        String::new()
    } else {
        let name = msg.file.rsplit('/').next().unwrap_or(&msg.file);
        format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer" class="file-link">📎 {}</a>"#,
            escape_html(&msg.file),
            escape_html(name),
        )
    };

    include_res!(str, "/pages/message.html")
        .replace("{user_id}", &escape_html(&msg.user_id))
        .replace("{time}", &escape_html(&msg.created_at))
        .replace("{text}", &text)
        .replace("{file}", &file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use time::macros::datetime;

    fn msg(room_id: &str, text: &str) -> Message {
        Message::new(room_id, "u1u1u1", text, "").unwrap()
    }

    #[test]
    fn timestamp_is_fixed_width_rfc3339() {
        let at = datetime!(2026-03-01 12:00:00.5 UTC);
        assert_eq!(timestamp(at).unwrap(), "2026-03-01T12:00:00.500Z");

        let whole = datetime!(2026-03-01 12:00:00 UTC);
        assert_eq!(timestamp(whole).unwrap(), "2026-03-01T12:00:00.000Z");
    }

    #[test]
    fn timestamp_string_order_matches_time_order() {
        let a = timestamp(datetime!(2026-03-01 12:00:00.004 UTC)).unwrap();
        let b = timestamp(datetime!(2026-03-01 12:00:00.100 UTC)).unwrap();
        let c = timestamp(datetime!(2026-03-01 12:00:01 UTC)).unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn load_filters_by_room_and_orders_ascending() {
        let pool = db::test_pool().await;
        let (tx, _rx) = broadcast::channel(8);

        let first = msg("r1", "first");
        let second = msg("r1", "second");
        let other = msg("r2", "elsewhere");

        // insert out of order on purpose
        insert_msg(&pool, &tx, &second).await.unwrap();
        insert_msg(&pool, &tx, &other).await.unwrap();
        insert_msg(&pool, &tx, &first).await.unwrap();

        let loaded = load_messages(&pool, "r1").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|m| m.room_id == "r1"));
        assert!(loaded
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn insert_echoes_on_the_feed() {
        let pool = db::test_pool().await;
        let (tx, mut rx) = broadcast::channel(8);

        let sent = msg("r1", "hello");
        insert_msg(&pool, &tx, &sent).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn insert_without_subscribers_still_persists() {
        let pool = db::test_pool().await;
        let (tx, rx) = broadcast::channel(8);
        drop(rx);

        insert_msg(&pool, &tx, &msg("r1", "quiet")).await.unwrap();
        assert_eq!(load_messages(&pool, "r1").await.unwrap().len(), 1);
    }

    #[test]
    fn msg_to_html_escapes_and_links() {
        let mut m = msg("r1", "<script>alert(1)</script>");
        m.file = "/files/r1/1_cat pic.png".to_owned();

        let html = msg_to_html(&m);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"href="/files/r1/1_cat pic.png""#));
        assert!(html.contains("u1u1u1"));
    }

    #[test]
    fn msg_to_html_omits_empty_parts() {
        let m = msg("r1", "just text");
        let html = msg_to_html(&m);
        assert!(!html.contains("file-link"));

        let mut file_only = msg("r1", "");
        file_only.file = "/files/r1/1_a.png".to_owned();
        let html = msg_to_html(&file_only);
        assert!(!html.contains("<p>"));
        assert!(html.contains("file-link"));
    }
}
