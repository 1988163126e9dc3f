// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供临时数据库、样例订单、手动时钟下的应用实例
// ==========================================

#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;

use shopfloor_quota::app::AppState;
use shopfloor_quota::domain::{Operation, Order};
use shopfloor_quota::engine::ManualClock;
use shopfloor_quota::importer::StaticOrderSource;
use shopfloor_quota::ReportRequest;
use tempfile::NamedTempFile;

/// 固定起始时间 (2023-11-14T22:13:20Z)
pub const T0: i64 = 1_700_000_000_000;

pub const MINUTE_MS: i64 = 60_000;

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是有效 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 样例订单
///
/// - VIGA001: 10 Corte(10) → 20 Soldadura(10) → 30 Pintura(10)
/// - VIGA002: 10 Corte(6) → 20 Armado(6)
pub fn sample_orders() -> StaticOrderSource {
    StaticOrderSource::new(vec![
        Order::new(
            "VIGA001",
            "Viga IPE 300",
            vec![
                Operation::new("10", "Corte", 10),
                Operation::new("20", "Soldadura", 10),
                Operation::new("30", "Pintura", 10),
            ],
        ),
        Order::new(
            "VIGA002",
            "Viga HEB 200",
            vec![Operation::new("10", "Corte", 6), Operation::new("20", "Armado", 6)],
        ),
    ])
    .expect("样例订单无效")
}

/// 基于手动时钟创建应用实例
pub fn open_state(db_path: &str, clock: Arc<ManualClock>) -> AppState {
    AppState::with_clock(db_path.to_string(), Arc::new(sample_orders()), clock)
        .expect("初始化AppState失败")
}

pub fn report(order_id: &str, operation_code: &str, good: i64, scrap: i64, override_confirmed: bool) -> ReportRequest {
    ReportRequest {
        order_id: order_id.to_string(),
        operation_code: operation_code.to_string(),
        machine_id: "M-01".to_string(),
        good,
        scrap,
        override_confirmed,
    }
}
