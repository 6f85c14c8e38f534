/// 日志工具模块
///
/// 初始化 tracing 订阅者，并提供日志格式化辅助函数
use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::error::AppResult;

/// 初始化日志
///
/// - 级别优先读取 `RUST_LOG`，否则 `info`（`verbose_logging` 时为 `debug`）
/// - 终端输出之外，配置了 `log_file` 时同时写入日志文件
/// - 重复初始化不会报错
pub fn init(config: &Config) -> AppResult<()> {
    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

    let file_layer = match &config.log_file {
        Some(path) if !path.trim().is_empty() => {
            init_log_file(path)?;
            let file = OpenOptions::new().append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        _ => None,
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}

/// 初始化日志文件（写入带时间戳的文件头，覆盖旧内容）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n作业批改日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 作业批改流水线");
    info!("📊 最大并发数: {}", config.max_workers);
    info!("🔁 重试次数: {}，间隔: {}ms", config.max_retries, config.retry_delay_ms);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
