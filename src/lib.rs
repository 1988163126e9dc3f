// ==========================================
// 工序报工配额系统 - 核心库
// ==========================================
// 职责: 工序配额计算、报工校验、超产确认与超时升级通知
// 技术栈: Rust + SQLite + tokio
// 系统定位: 车间报工后端核心（界面层为外部协作方）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 配额/校验/台账/事件/调度
pub mod engine;

// 数据仓储层 - 键值持久化
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 导入层 - 订单/工序参考数据
pub mod importer;

// 通知层 - 升级通知投递
pub mod notify;

// API 层 - 业务接口
pub mod api;

// 后台服务 - 升级调度任务
pub mod services;

// 应用层 - 实例组装
pub mod app;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EventStatus, PrevQtySource, SequenceMode, SupervisorReason};

// 领域实体
pub use domain::{
    EscalationSettings, LedgerEntry, Operation, Order, OverproductionDetails,
    OverproductionEvent, ReportingSettings,
};

// 引擎
pub use engine::{
    EscalationNotice, EscalationScheduler, EventStore, NoticeKind, OperationLedger, Quota,
    QuotaResolver, ReportDecision, ReportValidator, ResolveOutcome,
};

// API
pub use api::{ApiError, ApiResult, ProductionApi, ReportOutcome, ReportReceipt, ReportRequest};

// 后台服务
pub use services::{EscalationWorker, TickReport};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工序报工配额系统";
