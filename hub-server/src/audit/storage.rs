//! 审计日志 SQLite 存储层
//!
//! Append-only 设计，没有任何删除/更新接口；
//! 表上的触发器同样拒绝 UPDATE / DELETE。

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};
use thiserror::Error;

use super::types::{AuditEntry, AuditMetadata, AuditQuery, AuditRecord};

/// 存储错误
#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt audit row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

pub type AuditStorageResult<T> = Result<T, AuditStorageError>;

impl From<AuditStorageError> for shared::error::AppError {
    fn from(err: AuditStorageError) -> Self {
        shared::error::AppError::internal(err.to_string())
    }
}

const AUDIT_COLUMNS: &str =
    "id, action, kind, entity_type, entity_id, actor_id, actor_name, details, metadata_json, created_at";

/// 审计存储
#[derive(Debug, Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 追加一条审计记录，`created_at` 取记录的发生时间
    pub async fn append(&self, record: &AuditRecord) -> AuditStorageResult<AuditEntry> {
        let metadata_json = match &record.metadata {
            Some(meta) => Some(serde_json::to_string(&meta.to_json()?)?),
            None => None,
        };
        let kind = record.action.kind();

        let result = sqlx::query(
            "INSERT INTO audit_logs (action, kind, entity_type, entity_id, actor_id, actor_name, details, \
             metadata_json, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.action.as_str())
        .bind(kind.as_str())
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(record.actor.id)
        .bind(&record.actor.name)
        .bind(&record.details)
        .bind(&metadata_json)
        .bind(record.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(AuditEntry {
            id: result.last_insert_rowid(),
            action: record.action,
            kind,
            entity_type: record.entity_type.clone(),
            entity_id: record.entity_id.clone(),
            actor_id: record.actor.id,
            actor_name: record.actor.name.clone(),
            details: record.details.clone(),
            metadata: record.metadata.clone(),
            created_at: record.occurred_at,
        })
    }

    /// 查询，按发生时间最新在前（同一毫秒按写入顺序）
    pub async fn query(&self, q: &AuditQuery) -> AuditStorageResult<Vec<AuditEntry>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE 1 = 1"));
        push_filters(&mut qb, q);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(q.effective_limit())
            .push(" OFFSET ")
            .push_bind(q.effective_offset());

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_entry).collect()
    }

    /// 满足过滤条件的总数
    pub async fn count(&self, q: &AuditQuery) -> AuditStorageResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_logs WHERE 1 = 1");
        push_filters(&mut qb, q);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, q: &AuditQuery) {
    if let Some(entity_type) = &q.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = &q.entity_id {
        qb.push(" AND entity_id = ").push_bind(entity_id.clone());
    }
    if let Some(kind) = q.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(action) = q.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(actor_id) = q.actor_id {
        qb.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(from) = q.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = q.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

fn row_to_entry(row: &SqliteRow) -> AuditStorageResult<AuditEntry> {
    let id: i64 = row.try_get("id")?;
    let corrupt = |reason: String| AuditStorageError::Corrupt { id, reason };

    let action: String = row.try_get("action")?;
    let kind: String = row.try_get("kind")?;
    let metadata_json: Option<String> = row.try_get("metadata_json")?;
    let metadata = match metadata_json {
        Some(text) => Some(AuditMetadata::from_json(serde_json::from_str(&text)?)),
        None => None,
    };

    Ok(AuditEntry {
        id,
        action: action.parse().map_err(corrupt)?,
        kind: kind.parse().map_err(corrupt)?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        actor_id: row.try_get("actor_id")?,
        actor_name: row.try_get("actor_name")?,
        details: row.try_get("details")?,
        metadata,
        created_at: row.try_get("created_at")?,
    })
}
