// apps/mf_cli/src/commands/info.rs

//! info 子命令：显示仿真概要表

use clap::Args;
use mf_config::SimulationContext;
use mf_runtime::{Column, DisplayTable, MfResult};
use std::path::PathBuf;

/// info 参数
#[derive(Args)]
pub struct InfoArgs {
    /// mf 配置文件路径
    pub config: PathBuf,
}

/// 显示概要
pub fn execute(args: InfoArgs) -> MfResult<()> {
    let ctx = SimulationContext::from_file(&args.config)?;
    let mesh = ctx.config().child("mesh")?;
    let [nx, ny] = mesh.get_fixed::<usize, 2>("cell count")?;
    let [dx, dy] = mesh.get_fixed::<f64, 2>("cell size")?;

    let table = DisplayTable::new(vec![Column::new(18, "item"), Column::new(30, "value")]);
    table.write_top_rule();
    table.write_header_row();
    table.write_mid_rule();
    table.write_data_row(&["name".into(), ctx.name()]);
    table.write_data_row(&["cells".into(), format!("{} × {}", nx, ny)]);
    table.write_data_row(&["cell size".into(), format!("{} × {}", dx, dy)]);
    table.write_data_row(&[
        "boundaries".into(),
        ctx.config().count("boundary").to_string(),
    ]);
    table.write_data_row(&["outputs".into(), ctx.config().count("output").to_string()]);
    table.write_data_row(&[
        "time series".into(),
        ctx.config().count("time series").to_string(),
    ]);
    table.write_data_row(&[
        "raster fields".into(),
        ctx.config().count("raster field").to_string(),
    ]);
    table.write_bot_rule();
    Ok(())
}
