//! shipments + shipment_events

use shared::models::{ItemType, Shipment, ShipmentEvent};
use shared::status::Status;
use sqlx::SqliteConnection;

const SHIPMENT_COLUMNS: &str = "id, tracking_id, customer_id, shipper_name, recipient_name, origin, \
     destination, status, source_type, source_id, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, shipment_id, status, location, note, created_at";

/// 新运单
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub tracking_id: String,
    pub customer_id: Option<i64>,
    pub shipper_name: String,
    pub recipient_name: String,
    pub origin: String,
    pub destination: String,
    pub status: Status,
    pub source: Option<(ItemType, i64)>,
}

/// 插入运单；`tracking_id` 重复时返回唯一约束错误
pub async fn insert(conn: &mut SqliteConnection, new: &NewShipment) -> Result<Shipment, sqlx::Error> {
    let now = shared::util::now_millis();
    sqlx::query_as::<_, Shipment>(&format!(
        "INSERT INTO shipments (tracking_id, customer_id, shipper_name, recipient_name, origin, destination, \
         status, source_type, source_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {SHIPMENT_COLUMNS}"
    ))
    .bind(&new.tracking_id)
    .bind(new.customer_id)
    .bind(&new.shipper_name)
    .bind(&new.recipient_name)
    .bind(&new.origin)
    .bind(&new.destination)
    .bind(new.status)
    .bind(new.source.map(|(kind, _)| kind))
    .bind(new.source.map(|(_, id)| id))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// 用随机运单号插入，撞号时换号重试
///
/// 尝试 `MAX_ID_ATTEMPTS` 次仍然撞号返回 `None`。
pub async fn insert_with_generated_id(
    conn: &mut SqliteConnection,
    template: &NewShipment,
) -> Result<Option<Shipment>, sqlx::Error> {
    insert_with_candidates(conn, template, std::iter::repeat_with(shared::util::generate_tracking_id)).await
}

async fn insert_with_candidates(
    conn: &mut SqliteConnection,
    template: &NewShipment,
    candidates: impl IntoIterator<Item = String>,
) -> Result<Option<Shipment>, sqlx::Error> {
    for tracking_id in candidates.into_iter().take(shared::util::MAX_ID_ATTEMPTS) {
        let new = NewShipment {
            tracking_id,
            ..template.clone()
        };
        match insert(conn, &new).await {
            Ok(created) => return Ok(Some(created)),
            Err(e) if crate::db::is_unique_violation(&e) => {
                tracing::debug!(tracking_id = %new.tracking_id, "Tracking id collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Shipment>, sqlx::Error> {
    sqlx::query_as::<_, Shipment>(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_by_tracking_id(
    conn: &mut SqliteConnection,
    tracking_id: &str,
) -> Result<Option<Shipment>, sqlx::Error> {
    sqlx::query_as::<_, Shipment>(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_id = ?"))
        .bind(tracking_id)
        .fetch_optional(&mut *conn)
        .await
}

/// 按 tracking_id 批量查询
pub async fn find_by_tracking_ids(
    conn: &mut SqliteConnection,
    tracking_ids: &[String],
) -> Result<Vec<Shipment>, sqlx::Error> {
    if tracking_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_id IN ("
    ));
    let mut separated = qb.separated(", ");
    for id in tracking_ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
    qb.build_query_as::<Shipment>().fetch_all(&mut *conn).await
}

pub async fn tracking_id_exists(conn: &mut SqliteConnection, tracking_id: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM shipments WHERE tracking_id = ?")
        .bind(tracking_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// 全部运单，最近更新在前
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Shipment>, sqlx::Error> {
    sqlx::query_as::<_, Shipment>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments ORDER BY updated_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_by_customer(conn: &mut SqliteConnection, customer_id: i64) -> Result<Vec<Shipment>, sqlx::Error> {
    sqlx::query_as::<_, Shipment>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE customer_id = ? ORDER BY updated_at DESC, id DESC"
    ))
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: Status,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE shipments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// 追加检查点（只增不改）
pub async fn insert_event(
    conn: &mut SqliteConnection,
    shipment_id: i64,
    status: Status,
    location: Option<&str>,
    note: Option<&str>,
    now: i64,
) -> Result<ShipmentEvent, sqlx::Error> {
    sqlx::query_as::<_, ShipmentEvent>(&format!(
        "INSERT INTO shipment_events (shipment_id, status, location, note, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {EVENT_COLUMNS}"
    ))
    .bind(shipment_id)
    .bind(status)
    .bind(location)
    .bind(note)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// 检查点，旧的在前
pub async fn list_events(conn: &mut SqliteConnection, shipment_id: i64) -> Result<Vec<ShipmentEvent>, sqlx::Error> {
    sqlx::query_as::<_, ShipmentEvent>(&format!(
        "SELECT {EVENT_COLUMNS} FROM shipment_events WHERE shipment_id = ? ORDER BY id"
    ))
    .bind(shipment_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn count(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shipments")
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    fn template() -> NewShipment {
        NewShipment {
            tracking_id: String::new(),
            customer_id: None,
            shipper_name: "Consolidated (2 items)".to_string(),
            recipient_name: "Ama".to_string(),
            origin: "MQM Warehouse - Guangzhou".to_string(),
            destination: "MQM Branch - Accra".to_string(),
            status: Status::Received,
            source: None,
        }
    }

    #[tokio::test]
    async fn test_generated_id_skips_taken_numbers() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let taken = NewShipment {
            tracking_id: "TRK-000001".to_string(),
            ..template()
        };
        insert(&mut conn, &taken).await.unwrap();

        let candidates = ["TRK-000001", "TRK-000002"].map(String::from);
        let created = insert_with_candidates(&mut conn, &template(), candidates)
            .await
            .unwrap()
            .expect("second candidate is free");
        assert_eq!(created.tracking_id, "TRK-000002");
        assert_eq!(created.shipper_name, "Consolidated (2 items)");
    }

    #[tokio::test]
    async fn test_generated_id_gives_up_after_bounded_attempts() {
        let pool = crate::db::open_pool(&Config::for_tests()).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let taken = NewShipment {
            tracking_id: "TRK-000001".to_string(),
            ..template()
        };
        insert(&mut conn, &taken).await.unwrap();

        let always_taken = std::iter::repeat("TRK-000001".to_string());
        let created = insert_with_candidates(&mut conn, &template(), always_taken).await.unwrap();
        assert!(created.is_none());
        assert_eq!(count(&mut conn).await.unwrap(), 1);

        let generated = insert_with_generated_id(&mut conn, &template()).await.unwrap().unwrap();
        assert!(shared::util::is_generated_tracking_id(&generated.tracking_id));
    }
}
