use shared::models::{User, UserRole};
use sqlx::SqliteConnection;

const USER_COLUMNS: &str = "id, name, phone, role, created_at";

/// 注册用户
pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    phone: Option<&str>,
    role: UserRole,
) -> Result<User, sqlx::Error> {
    let now = shared::util::now_millis();
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, phone, role, created_at) VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(phone)
    .bind(role)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(&mut *conn)
        .await
}

/// 广播收件人
pub async fn list_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
