use shared::models::Notification;
use sqlx::SqliteConnection;

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, read, created_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    title: &str,
    message: &str,
    now: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, title, message, read, created_at) VALUES (?, ?, ?, 0, ?)",
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

/// 最新在前
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    let sql = if unread_only {
        format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? AND read = 0 ORDER BY id DESC LIMIT ?")
    } else {
        format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? ORDER BY id DESC LIMIT ?")
    };
    sqlx::query_as::<_, Notification>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
}

pub async fn unread_count(conn: &mut SqliteConnection, user_id: i64) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

pub async fn count_all(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications")
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

/// 只能标记自己的通知，返回受影响行数
pub async fn mark_read(
    conn: &mut SqliteConnection,
    user_id: i64,
    notification_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn mark_all_read(conn: &mut SqliteConnection, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// 某用户是否存在该通知（不区分已读）
pub async fn exists_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    notification_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM notifications WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}
