use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::AiResult;

/**
 * \brief 安装全局 tracing subscriber。
 *
 * 设置了 `RUST_LOG` 时以其为准，否则 `debug` 把默认级别从 `info` 提升到 `debug`。
 * 重复调用无副作用。
 */
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/**
 * \brief 记录常规事件。
 */
pub fn log_event(category: &str, message: &str) {
    tracing::info!(category, "{}", message);
}

/**
 * \brief 记录错误事件。
 */
pub fn log_error(category: &str, message: &str) {
    tracing::error!(category, "{}", message);
}

/**
 * \brief 每次外部 Provider 调用记录一条诊断日志。
 */
pub fn record_call(provider: &str, model: &str, result: &AiResult, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    if result.is_error {
        tracing::warn!(
            provider,
            model,
            elapsed_ms,
            diagnostic = %result.response_text,
            "provider call failed"
        );
    } else {
        tracing::info!(
            provider,
            model,
            elapsed_ms,
            chars = result.response_text.chars().count(),
            tokens = ?result.tokens,
            "provider call succeeded"
        );
    }
}
