use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub reconcile: ReconcileConfig,
    pub shipments: ShipmentsConfig,
    pub defects: DefectsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 超过该秒数的语句以 WARN 记录
    pub slow_statement_secs: u64,
}

/// 出荷状况批量更新
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// 允许执行批量更新的角色
    pub privileged_roles: Vec<String>,
    /// 更新后写入的状态值
    pub confirmed_status: String,
    pub lookup_strategy: LookupStrategy,
    pub apply_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

/// 明细存在性查询方式: 逐行查询或按集合批量查询
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    PerRow,
    Batched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentsConfig {
    /// 最新出荷日的可选显示件数
    pub limit_options: Vec<i64>,
    pub default_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectsConfig {
    /// 未要求全件时的显示件数
    pub recent_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/electrode";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
            },
            reconcile: ReconcileConfig {
                privileged_roles: vec!["nagatsu".to_string(), "admin".to_string()],
                confirmed_status: "OK".to_string(),
                lookup_strategy: LookupStrategy::Batched,
                apply_timeout_secs: 30,
                max_upload_bytes: 4 * 1024 * 1024,
            },
            shipments: ShipmentsConfig {
                limit_options: vec![5, 10, 20, 30, 50],
                default_limit: 5,
            },
            defects: DefectsConfig { recent_limit: 100 },
            log: LogConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/app.toml -> APP__* 环境变量 -> SERVER_HOST / SERVER_PORT / DATABASE_URL
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.max_connections", 20_i64)?
            .set_default("database.acquire_timeout_secs", 10_i64)?
            .set_default("database.slow_statement_secs", 5_i64)?
            .set_default("reconcile.privileged_roles", vec!["nagatsu", "admin"])?
            .set_default("reconcile.confirmed_status", "OK")?
            .set_default("reconcile.lookup_strategy", "batched")?
            .set_default("reconcile.apply_timeout_secs", 30_i64)?
            .set_default("reconcile.max_upload_bytes", 4_i64 * 1024 * 1024)?
            .set_default("shipments.limit_options", vec![5_i64, 10, 20, 30, 50])?
            .set_default("shipments.default_limit", 5_i64)?
            .set_default("defects.recent_limit", 100_i64)?
            .set_default("log.level", "info")?
            .add_source(File::with_name("config/app").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("reconcile.privileged_roles")
                    .with_list_parse_key("shipments.limit_options"),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.reconcile.apply_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "reconcile.apply_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.reconcile.privileged_roles.is_empty() {
            return Err(ConfigError::Message(
                "reconcile.privileged_roles must not be empty".to_string(),
            ));
        }
        if self.reconcile.confirmed_status.trim().is_empty() {
            return Err(ConfigError::Message(
                "reconcile.confirmed_status must not be empty".to_string(),
            ));
        }
        if self.shipments.limit_options.is_empty() {
            return Err(ConfigError::Message(
                "shipments.limit_options must not be empty".to_string(),
            ));
        }
        if self.shipments.limit_options.iter().any(|&l| l <= 0) {
            return Err(ConfigError::Message(
                "shipments.limit_options must be positive".to_string(),
            ));
        }
        if !self.shipments.limit_options.contains(&self.shipments.default_limit) {
            return Err(ConfigError::Message(format!(
                "shipments.default_limit {} is not one of {:?}",
                self.shipments.default_limit, self.shipments.limit_options
            )));
        }
        if self.defects.recent_limit <= 0 {
            return Err(ConfigError::Message(
                "defects.recent_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// 日志级别, 无法识别时回退到 INFO
    pub fn log_level(&self) -> tracing::Level {
        self.log.level.parse().unwrap_or(tracing::Level::INFO)
    }
}
