// ==========================================
// 工序报工配额系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope，当前仅使用 global)
// 约定: 读取时缺失或格式错误回落默认值（记录告警），写入时严格校验
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::settings::{
    EscalationSettings, ReportingSettings, DEFAULT_ESCALATION_POLL_INTERVAL_SECS,
    DEFAULT_ESCALATION_THRESHOLD_MINUTES,
};
use crate::domain::types::{PrevQtySource, SequenceMode};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未知配置项: {0}")]
    UnknownKey(String),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("锁获取失败: {0}")]
    LockError(String),

    #[error("配置读写失败: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入配置值（校验后 UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let value = value.trim();
        validate_config_value(key, value)?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置（用于启动日志与诊断）
    pub fn list_configs(&self) -> ConfigResult<HashMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    // ===== 升级通知配置 =====

    /// 获取升级通知设置
    ///
    /// 阈值必须 > 0，否则回落默认 5 分钟
    pub fn get_escalation_settings(&self) -> ConfigResult<EscalationSettings> {
        let threshold = self
            .parse_or_default::<u32>(config_keys::ESCALATION_THRESHOLD_MINUTES, DEFAULT_ESCALATION_THRESHOLD_MINUTES)?;
        let threshold = if threshold == 0 {
            tracing::warn!(
                config_key = config_keys::ESCALATION_THRESHOLD_MINUTES,
                "升级阈值为0，使用默认值"
            );
            DEFAULT_ESCALATION_THRESHOLD_MINUTES
        } else {
            threshold
        };
        let poll = self
            .parse_or_default::<u64>(config_keys::ESCALATION_POLL_INTERVAL_SECS, DEFAULT_ESCALATION_POLL_INTERVAL_SECS)?
            .max(1);

        Ok(EscalationSettings {
            escalation_threshold_minutes: threshold,
            poll_interval_secs: poll,
        })
    }

    // ===== 报工控制配置 =====

    pub fn get_reporting_settings(&self) -> ConfigResult<ReportingSettings> {
        let sequence_mode = match self.get_config_value(config_keys::SEQUENCE_MODE)? {
            Some(raw) => SequenceMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(config_key = config_keys::SEQUENCE_MODE, raw_value = %raw, "顺序控制模式格式错误，使用默认值");
                SequenceMode::default()
            }),
            None => SequenceMode::default(),
        };
        let prev_qty_source = match self.get_config_value(config_keys::PREV_QTY_SOURCE)? {
            Some(raw) => PrevQtySource::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(config_key = config_keys::PREV_QTY_SOURCE, raw_value = %raw, "前道数量来源格式错误，使用默认值");
                PrevQtySource::default()
            }),
            None => PrevQtySource::default(),
        };
        let manual_prev_qty = self
            .get_config_value(config_keys::MANUAL_PREV_QTY)?
            .and_then(|raw| raw.trim().parse::<u64>().ok());

        Ok(ReportingSettings {
            sequence_mode,
            prev_qty_source,
            manual_prev_qty,
        })
    }

    fn parse_or_default<T: std::str::FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_config_value(key)? {
            Some(raw) => Ok(raw.trim().parse::<T>().unwrap_or_else(|_| {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                default
            })),
            None => Ok(default),
        }
    }
}

fn validate_config_value(key: &str, value: &str) -> ConfigResult<()> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    };

    match key {
        config_keys::ESCALATION_THRESHOLD_MINUTES => match value.parse::<u32>() {
            Ok(v) if v > 0 => Ok(()),
            _ => Err(invalid("必须为正整数（分钟）")),
        },
        config_keys::ESCALATION_POLL_INTERVAL_SECS => match value.parse::<u64>() {
            Ok(v) if v > 0 => Ok(()),
            _ => Err(invalid("必须为正整数（秒）")),
        },
        config_keys::SEQUENCE_MODE => SequenceMode::parse(value)
            .map(|_| ())
            .ok_or_else(|| invalid("取值 OFF / ALERT / BLOCK")),
        config_keys::PREV_QTY_SOURCE => PrevQtySource::parse(value)
            .map(|_| ())
            .ok_or_else(|| invalid("取值 ERP / MANUAL")),
        config_keys::MANUAL_PREV_QTY => value
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| invalid("必须为非负整数")),
        other => Err(ConfigError::UnknownKey(other.to_string())),
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 升级通知
    pub const ESCALATION_THRESHOLD_MINUTES: &str = "escalation_threshold_minutes";
    pub const ESCALATION_POLL_INTERVAL_SECS: &str = "escalation_poll_interval_secs";

    // 报工控制
    pub const SEQUENCE_MODE: &str = "sequence_mode";
    pub const PREV_QTY_SOURCE: &str = "prev_qty_source";
    pub const MANUAL_PREV_QTY: &str = "manual_prev_qty";
}
