// ==========================================
// 工序报工配额系统 - 配置层
// ==========================================
// 职责: 升级阈值、轮询间隔、顺序控制模式等系统配置
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
