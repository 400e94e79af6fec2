use sqlx::SqlitePool;

/// Rooms have no rows of their own; a room exists exactly as long as
/// messages reference its id.
pub async fn init(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            room_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            text TEXT NOT NULL,
            file TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_room_created
         ON messages (room_id, created_at)",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init(&pool).await.unwrap();
    pool
}
