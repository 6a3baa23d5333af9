use std::time::Duration;

use crate::fulfillment::TransitionPolicy;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_URL | sqlite://data/hub.db?mode=rwc | SQLite 连接串 |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | OPERATION_TIMEOUT_MS | 5000 | 主路径单次操作超时(毫秒) |
/// | TRANSITION_POLICY | permissive | 状态迁移策略: permissive / strict |
/// | DEFAULT_ORIGIN | MQM Warehouse - Guangzhou | 同步运单默认起点 |
/// | DEFAULT_DESTINATION | MQM Branch - Accra | 同步运单默认终点 |
/// | WHATSAPP_NUMBER | (无) | 结账交接的 WhatsApp 号码 |
/// | AUDIT_QUEUE_SIZE | 1024 | 审计队列容量，0 表示同步直写 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志目录，设置后按天滚动写文件 |
///
/// # 示例
///
/// ```ignore
/// DATABASE_URL=sqlite://hub.db?mode=rwc TRANSITION_POLICY=strict cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 连接串
    pub database_url: String,
    /// 连接池最大连接数
    pub db_max_connections: u32,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 主路径操作超时 (毫秒)
    pub operation_timeout_ms: u64,
    /// 状态迁移策略
    pub transition_policy: TransitionPolicy,
    /// 默认起点仓库
    pub default_origin: String,
    /// 默认目的网点
    pub default_destination: String,
    /// 结账交接号码，未设置则不生成链接
    pub whatsapp_number: Option<String>,
    /// 审计队列容量 (0 = 直写)
    pub audit_queue_size: usize,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default_values();
        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.http_port),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            operation_timeout_ms: std::env::var("OPERATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.operation_timeout_ms),
            transition_policy: match std::env::var("TRANSITION_POLICY") {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    tracing::warn!(value = %raw, "Unknown TRANSITION_POLICY, using permissive");
                    TransitionPolicy::Permissive
                }),
                Err(_) => defaults.transition_policy,
            },
            default_origin: std::env::var("DEFAULT_ORIGIN").unwrap_or(defaults.default_origin),
            default_destination: std::env::var("DEFAULT_DESTINATION")
                .unwrap_or(defaults.default_destination),
            whatsapp_number: std::env::var("WHATSAPP_NUMBER").ok().filter(|s| !s.trim().is_empty()),
            audit_queue_size: std::env::var("AUDIT_QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.audit_queue_size),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        }
    }

    /// 内置默认值（不读环境变量）
    pub fn default_values() -> Self {
        Self {
            database_url: "sqlite://data/hub.db?mode=rwc".into(),
            db_max_connections: 5,
            http_port: 3000,
            environment: "development".into(),
            operation_timeout_ms: 5000,
            transition_policy: TransitionPolicy::Permissive,
            default_origin: "MQM Warehouse - Guangzhou".into(),
            default_destination: "MQM Branch - Accra".into(),
            whatsapp_number: None,
            audit_queue_size: 1024,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    /// 测试用配置：内存数据库、单连接、审计直写
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            db_max_connections: 1,
            audit_queue_size: 0,
            whatsapp_number: Some("+233 20 000 0000".into()),
            ..Self::default_values()
        }
    }

    /// 主路径超时
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
