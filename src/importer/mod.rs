// ==========================================
// 工序报工配额系统 - 订单导入层
// ==========================================
// 职责: 提供只读订单/工序来源（BOM/ERP 导出 CSV）
// ==========================================

pub mod csv_loader;
pub mod error;
pub mod order_source;

pub use csv_loader::{load_orders_csv, parse_orders};
pub use error::{ImportError, ImportResult};
pub use order_source::{OrderSource, StaticOrderSource};
