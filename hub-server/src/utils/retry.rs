//! 主路径执行包装：有界超时 + 瞬时存储错误最多重试一次
//!
//! 每次尝试都是一个完整的工作单元（通常是一个事务）。超时会丢弃正在执行的
//! future，未提交的事务随之回滚，因此超时不重试，直接报告给调用方。

use std::future::Future;
use std::time::Duration;

use shared::error::AppError;

use super::error::{ServiceError, ServiceResult};

/// 执行主路径操作
pub async fn run_primary<T, F, Fut>(
    operation: &'static str,
    timeout: Duration,
    mut attempt: F,
) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let mut retried = false;
    loop {
        let result = match tokio::time::timeout(timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "Operation timed out");
                return Err(ServiceError::App(AppError::timeout(operation)));
            }
        };

        match result {
            Err(e) if !retried && e.is_transient() => {
                tracing::warn!(operation, error = %e, "Transient store error, retrying once");
                retried = true;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_error_is_retried_once() {
        let calls = AtomicU32::new(0);
        let result: ServiceResult<u32> = run_primary("test", Duration::from_secs(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ServiceError::Db(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_transient_error_is_returned() {
        let calls = AtomicU32::new(0);
        let result: ServiceResult<()> = run_primary("test", Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Db(sqlx::Error::PoolTimedOut)) }
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_business_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: ServiceResult<()> = run_primary("test", Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::App(AppError::validation("nope"))) }
        })
        .await;
        assert_eq!(result.unwrap_err().code(), Some(ErrorCode::ValidationFailed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let result: ServiceResult<()> = run_primary("slow_op", Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().code(), Some(ErrorCode::TimeoutError));
    }
}
