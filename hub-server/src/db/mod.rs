//! SQLite 持久层
//!
//! 连接池 + 内嵌迁移。仓储函数都接收 `&mut SqliteConnection`，
//! 既可以传入池连接，也可以传入事务（`&mut *tx`）。

pub mod repository;

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::core::Config;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// 打开连接池并执行迁移
pub async fn open_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = config.database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections.max(1))
        .acquire_timeout(config.operation_timeout());
    if in_memory {
        // 每个连接各自一份内存库，只能单连接；随最后一个连接关闭而消失
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;
    MIGRATOR.run(&pool).await?;

    tracing::info!(url = %config.database_url, "Database ready");
    Ok(pool)
}

/// 开启写事务
///
/// `BEGIN IMMEDIATE` 在开始时就拿写锁：并发写者在 busy_timeout 内排队，
/// 而不是先读后写、升级锁时收到 SQLITE_BUSY。
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// 唯一约束冲突
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_database_created_and_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hub.db");
        let config = Config {
            database_url: format!("sqlite://{}?mode=rwc", path.display()),
            ..Config::for_tests()
        };

        let pool = open_pool(&config).await.unwrap();
        assert!(path.exists());
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shipments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        pool.close().await;

        // 重复打开不会重复迁移
        let pool = open_pool(&config).await.unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn test_write_transactions_queue_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("hub.db").display()),
            db_max_connections: 4,
            ..Config::for_tests()
        };
        let pool = open_pool(&config).await.unwrap();

        // 先读后写：deferred 事务在这里会撞上 SQLITE_BUSY
        let writers = (0..4).map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut tx = begin_write(&pool).await?;
                let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shipments")
                    .fetch_one(&mut *tx)
                    .await?;
                tokio::time::sleep(Duration::from_millis(20)).await;
                sqlx::query(
                    "INSERT INTO shipments (tracking_id, shipper_name, recipient_name, origin, destination, status, created_at, updated_at) \
                     VALUES (?, 'a', 'b', 'o', 'd', 'Received', 0, 0)",
                )
                .bind(format!("TRK-00000{}", i))
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok::<i64, sqlx::Error>(count)
            })
        });
        let results = futures::future::join_all(writers).await;

        let mut seen: Vec<i64> = results.into_iter().map(|r| r.unwrap().unwrap()).collect();
        seen.sort_unstable();
        // 每个写者都看到了前一个写者提交的结果
        assert_eq!(seen, vec![0, 1, 2, 3]);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_tracking_id_is_unique_violation() {
        let pool = open_pool(&Config::for_tests()).await.unwrap();
        let insert = "INSERT INTO shipments (tracking_id, shipper_name, recipient_name, origin, destination, status, created_at, updated_at) \
                      VALUES ('TRK-000001', 'a', 'b', 'o', 'd', 'Received', 0, 0)";
        sqlx::query(insert).execute(&pool).await.unwrap();
        let err = sqlx::query(insert).execute(&pool).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
