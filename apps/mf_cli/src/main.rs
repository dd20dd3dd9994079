// apps/mf_cli/src/main.rs

//! mflow 命令行界面
//!
//! 二维 Saint-Venant 流动求解器的命令行工具：运行仿真、校验配置、
//! 查看仿真概要。完成时退出码为零，任何错误按类别映射为非零。

mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// mflow 浅水流动求解器命令行工具
#[derive(Parser)]
#[command(name = "mflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "2-D Saint-Venant flow solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行仿真
    Run(commands::run::RunArgs),
    /// 校验配置并以 JSON 倾倒解析结果
    Validate(commands::validate::ValidateArgs),
    /// 显示仿真概要
    Info(commands::info::InfoArgs),
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("无法初始化日志: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
