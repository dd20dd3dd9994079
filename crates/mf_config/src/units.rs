// crates/mf_config/src/units.rs

//! 时间单位
//!
//! 配置里的时间量（运行窗口、序列、输出间隔）可以带 `time units`，
//! 换算因子以秒为基准。

use mf_io::Config;
use mf_runtime::{MfError, MfResult};

/// 单位名 → 秒因子
pub fn factor(name: &str) -> MfResult<f64> {
    match name.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(1.0),
        "min" | "mins" | "minute" | "minutes" => Ok(60.0),
        "h" | "hr" | "hrs" | "hour" | "hours" => Ok(3600.0),
        "d" | "day" | "days" => Ok(86400.0),
        other => Err(MfError::configuration(format!(
            "未知的时间单位: '{}'",
            other
        ))),
    }
}

/// 读取块内 `time units`；缺失时用 `fallback` 因子
pub fn factor_for(conf: &Config, fallback: f64) -> MfResult<f64> {
    match conf.get_child("time units") {
        Some(node) => factor(node.value()),
        None => Ok(fallback),
    }
}
