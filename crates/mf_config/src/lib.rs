// crates/mf_config/src/lib.rs

//! mflow 配置层
//!
//! - [`units`]: 时间单位因子表
//! - [`params`]: 运行/步长/设备参数
//! - [`context`]: 仿真上下文（配置树 + 时间序列与栅格缓存）
//! - [`builder`]: 从上下文装配完整仿真
//!
//! 上下文是显式传引用的单一所有者，不做隐藏单例。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod context;
pub mod params;
pub mod units;

pub use builder::build_simulation;
pub use context::SimulationContext;
pub use params::{DeviceParameters, DtKind, RunParameters, TimestepParameters};
