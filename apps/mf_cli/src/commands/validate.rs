// apps/mf_cli/src/commands/validate.rs

//! validate 子命令：解析配置并以 JSON 倾倒解析结果

use clap::Args;
use mf_config::{DeviceParameters, RunParameters, SimulationContext, TimestepParameters};
use mf_runtime::{MfError, MfResult};
use std::path::PathBuf;

/// validate 参数
#[derive(Args)]
pub struct ValidateArgs {
    /// mf 配置文件路径
    pub config: PathBuf,
}

/// 校验配置
pub fn execute(args: ValidateArgs) -> MfResult<()> {
    let ctx = SimulationContext::from_file(&args.config)?;
    let run = RunParameters::from_config(ctx.config(), ctx.global_time_factor())?;
    let timestep = TimestepParameters::from_config(ctx.config())?;
    let device = DeviceParameters::from_config(ctx.config())?;

    let summary = serde_json::json!({
        "name": ctx.name(),
        "run parameters": run,
        "timestep parameters": timestep,
        "device parameters": device,
        "boundaries": ctx.config().count("boundary"),
        "outputs": ctx.config().count("output"),
        "time series": ctx.config().count("time series"),
        "raster fields": ctx.config().count("raster field"),
    });
    let text = serde_json::to_string_pretty(&summary)
        .map_err(|e| MfError::io(format!("无法序列化配置概要: {}", e)))?;
    println!("{}", text);

    tracing::info!("配置有效");
    Ok(())
}
