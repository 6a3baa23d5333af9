//! procurement_requests

use shared::models::ProcurementRequest;
use shared::status::Status;
use sqlx::SqliteConnection;

const PROCUREMENT_COLUMNS: &str = "id, owner_user_id, item_url, item_name, quantity, status, tracking_id, \
     note, received_at, consolidated_shipment_id, created_at, updated_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    owner_user_id: i64,
    item_url: &str,
    item_name: &str,
    quantity: i64,
    note: Option<&str>,
) -> Result<ProcurementRequest, sqlx::Error> {
    let now = shared::util::now_millis();
    sqlx::query_as::<_, ProcurementRequest>(&format!(
        "INSERT INTO procurement_requests (owner_user_id, item_url, item_name, quantity, status, note, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PROCUREMENT_COLUMNS}"
    ))
    .bind(owner_user_id)
    .bind(item_url)
    .bind(item_name)
    .bind(quantity)
    .bind(Status::Pending)
    .bind(note)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<ProcurementRequest>, sqlx::Error> {
    sqlx::query_as::<_, ProcurementRequest>(&format!(
        "SELECT {PROCUREMENT_COLUMNS} FROM procurement_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<ProcurementRequest>, sqlx::Error> {
    sqlx::query_as::<_, ProcurementRequest>(&format!(
        "SELECT {PROCUREMENT_COLUMNS} FROM procurement_requests ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_by_owner(
    conn: &mut SqliteConnection,
    owner_user_id: i64,
) -> Result<Vec<ProcurementRequest>, sqlx::Error> {
    sqlx::query_as::<_, ProcurementRequest>(&format!(
        "SELECT {PROCUREMENT_COLUMNS} FROM procurement_requests WHERE owner_user_id = ? \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(owner_user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn update_fields(
    conn: &mut SqliteConnection,
    id: i64,
    status: Status,
    tracking_id: Option<&str>,
    note: Option<&str>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE procurement_requests SET status = ?, tracking_id = ?, note = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(tracking_id)
    .bind(note)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn mark_received(conn: &mut SqliteConnection, id: i64, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE procurement_requests SET received_at = ?, updated_at = ? WHERE id = ? AND received_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn assign_consolidation(
    conn: &mut SqliteConnection,
    id: i64,
    shipment_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE procurement_requests SET consolidated_shipment_id = ?, updated_at = ? \
         WHERE id = ? AND consolidated_shipment_id IS NULL",
    )
    .bind(shipment_id)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
