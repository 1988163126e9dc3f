// ==========================================
// 工序报工配额系统 - 主入口
// ==========================================
// 用法: shopfloor-quota [数据库路径] [订单CSV]
//   数据库路径缺省: 环境变量 SHOPFLOOR_QUOTA_DB → 用户数据目录
//   订单CSV缺省: 环境变量 SHOPFLOOR_QUOTA_ORDERS，未设置时订单表为空
// 运行: 启动升级通知任务，Ctrl-C 停止
// ==========================================

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use shopfloor_quota::app::{get_default_db_path, AppState};
use shopfloor_quota::importer::{load_orders_csv, OrderSource, StaticOrderSource};
use shopfloor_quota::logging;

const ORDERS_PATH_ENV: &str = "SHOPFLOOR_QUOTA_ORDERS";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", shopfloor_quota::APP_NAME);
    tracing::info!("系统版本: {}", shopfloor_quota::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    let orders_path = args
        .next()
        .or_else(|| std::env::var(ORDERS_PATH_ENV).ok())
        .filter(|p| !p.trim().is_empty());

    let orders: Arc<dyn OrderSource> = match orders_path {
        Some(path) => Arc::new(
            load_orders_csv(Path::new(&path))
                .with_context(|| format!("加载订单失败: {}", path))?,
        ),
        None => {
            tracing::warn!("未指定订单 CSV，订单表为空");
            Arc::new(StaticOrderSource::default())
        }
    };

    let state = AppState::new(db_path, orders).context("初始化AppState失败")?;
    let settings = state.production_api.escalation_settings()?;
    tracing::info!(
        db_path = %state.db_path,
        orders = state.production_api.list_orders().len(),
        pending_events = state.production_api.pending_events()?.len(),
        threshold_minutes = settings.escalation_threshold_minutes,
        poll_interval_secs = settings.poll_interval_secs,
        "服务已就绪"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = state.escalation_worker.clone();
    let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await.context("监听停止信号失败")?;
    tracing::info!("收到停止信号，正在退出");

    // 接收端已退出时发送失败可忽略
    let _ = shutdown_tx.send(true);
    handle.await.context("升级通知任务异常退出")?;

    tracing::info!("服务已退出");
    Ok(())
}
