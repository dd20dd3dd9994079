// crates/mf_physics/src/lib.rs

//! mflow 物理层
//!
//! Saint-Venant 求解器的数值内核与编排：
//!
//! - [`forcing`]: 场函子、场修改器、时间序列与栅格场
//! - [`boundary`]: 流量/水位边界条件
//! - [`numerics`]: 空间重构、面通量、时间导数与控制数
//! - [`scheme`]: Butcher 表驱动的显式 Runge-Kutta
//! - [`solver`]: 求解器状态与 dU/dt 装配
//! - [`engine`]: 外层同步循环 + 内层自适应步长循环
//! - [`output`]: 命名输出函数（格式化由 I/O 层负责）
//!
//! 每个内循环步的数据流：
//! U → 重构 → (dU⁄dx, dU⁄dy) → 通量 → F → 时间导数 → dU⁄dt → RK → U*，
//! 控制数读取 U* 与步长决定接受或重复。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod engine;
pub mod forcing;
pub mod numerics;
pub mod output;
pub mod scheme;
pub mod solver;

/// 物理量的实数类型（默认单精度）
pub type R = f32;

/// 重力加速度 [m/s²]
pub const GRAVITY: f64 = 9.81;

/// 干单元水深阈值 [m]
pub const H_DRY: f64 = 1e-4;

/// minmod 限制器的 θ 参数
pub const THETA: f64 = 2.0;

pub use engine::Simulation;
pub use solver::SvSolver;
