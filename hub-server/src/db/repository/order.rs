//! orders + order_items

use std::collections::HashMap;

use shared::models::{Order, OrderLineItem};
use shared::status::Status;
use sqlx::SqliteConnection;

const ORDER_COLUMNS: &str = "id, ref_code, customer_name, customer_phone, owner_user_id, status, \
     tracking_id, total_amount, received_at, consolidated_shipment_id, created_at, updated_at";

/// 新订单行（明细另行写入）
pub struct NewOrder<'a> {
    pub ref_code: &'a str,
    pub customer_name: &'a str,
    pub customer_phone: Option<&'a str>,
    pub owner_user_id: Option<i64>,
    pub status: Status,
    pub total_amount: f64,
}

/// 插入订单头，返回 id；`ref_code` 冲突时返回唯一约束错误
pub async fn insert(conn: &mut SqliteConnection, order: &NewOrder<'_>, now: i64) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO orders (ref_code, customer_name, customer_phone, owner_user_id, status, \
         total_amount, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.ref_code)
    .bind(order.customer_name)
    .bind(order.customer_phone)
    .bind(order.owner_user_id)
    .bind(order.status)
    .bind(order.total_amount)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_items(
    conn: &mut SqliteConnection,
    order_id: i64,
    items: &[OrderLineItem],
) -> Result<(), sqlx::Error> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (order_id, position, name, quantity, unit_price, source_url) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(position as i64)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.source_url)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn find_items(conn: &mut SqliteConnection, order_id: i64) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderLineItem>(
        "SELECT name, quantity, unit_price, source_url FROM order_items WHERE order_id = ? ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await
}

/// 按 id 查询（含明细）
pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match order {
        Some(mut order) => {
            order.items = find_items(conn, order.id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

pub async fn find_by_ref_code(conn: &mut SqliteConnection, ref_code: &str) -> Result<Option<Order>, sqlx::Error> {
    let id: Option<(i64,)> = sqlx::query_as("SELECT id FROM orders WHERE ref_code = ?")
        .bind(ref_code)
        .fetch_optional(&mut *conn)
        .await?;
    match id {
        Some((id,)) => find_by_id(conn, id).await,
        None => Ok(None),
    }
}

/// 全部订单，最新在前
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    attach_items(conn, orders, None).await
}

/// 某用户的订单，最新在前
pub async fn list_by_owner(conn: &mut SqliteConnection, owner_user_id: i64) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(owner_user_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_items(conn, orders, Some(owner_user_id)).await
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: i64,
    name: String,
    quantity: i64,
    unit_price: f64,
    source_url: Option<String>,
}

/// 一次查询取回明细后按订单分组
async fn attach_items(
    conn: &mut SqliteConnection,
    mut orders: Vec<Order>,
    owner_user_id: Option<i64>,
) -> Result<Vec<Order>, sqlx::Error> {
    if orders.is_empty() {
        return Ok(orders);
    }
    let rows = match owner_user_id {
        Some(owner) => {
            sqlx::query_as::<_, ItemRow>(
                "SELECT i.order_id, i.name, i.quantity, i.unit_price, i.source_url \
                 FROM order_items i JOIN orders o ON o.id = i.order_id \
                 WHERE o.owner_user_id = ? ORDER BY i.order_id, i.position",
            )
            .bind(owner)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, ItemRow>(
                "SELECT order_id, name, quantity, unit_price, source_url \
                 FROM order_items ORDER BY order_id, position",
            )
            .fetch_all(&mut *conn)
            .await?
        }
    };

    let mut grouped: HashMap<i64, Vec<OrderLineItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(OrderLineItem {
            name: row.name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            source_url: row.source_url,
        });
    }
    for order in &mut orders {
        order.items = grouped.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

/// 写入管理员修改后的状态与运单号
pub async fn update_fields(
    conn: &mut SqliteConnection,
    id: i64,
    status: Status,
    tracking_id: Option<&str>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = ?, tracking_id = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(tracking_id)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// 入库（幂等：已入库的不覆盖时间），返回受影响行数
pub async fn mark_received(conn: &mut SqliteConnection, id: i64, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET received_at = ?, updated_at = ? WHERE id = ? AND received_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// 归入合并运单；已被其他合并占用时影响 0 行
pub async fn assign_consolidation(
    conn: &mut SqliteConnection,
    id: i64,
    shipment_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET consolidated_shipment_id = ?, updated_at = ? \
         WHERE id = ? AND consolidated_shipment_id IS NULL",
    )
    .bind(shipment_id)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
