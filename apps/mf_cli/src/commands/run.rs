// apps/mf_cli/src/commands/run.rs

//! run 子命令：装配并执行仿真

use clap::Args;
use mf_config::{build_simulation, SimulationContext};
use mf_runtime::MfResult;
use std::path::PathBuf;

/// run 参数
#[derive(Args)]
pub struct RunArgs {
    /// mf 配置文件路径
    pub config: PathBuf,
}

/// 执行仿真
pub fn execute(args: RunArgs) -> MfResult<()> {
    let ctx = SimulationContext::from_file(&args.config)?;
    tracing::info!(simulation = %ctx.name(), "装配仿真");

    let (mut simulation, run) = build_simulation(&ctx)?;
    mf_config::builder::write_check_files(&ctx, &simulation)?;

    tracing::info!(
        start = run.start_time,
        end = run.end_time,
        sync = run.sync_step,
        "开始运行"
    );
    simulation.run(
        run.start_time,
        run.end_time,
        run.sync_step,
        run.display_every,
    )?;
    tracing::info!("仿真完成");
    Ok(())
}
