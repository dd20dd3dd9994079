// crates/mf_physics/src/numerics/mod.rs

//! 数值内核
//!
//! - [`reconstruction`]: θ-minmod 限制的线性重构
//! - [`flux`]: 干湿感知的面通量（Rusanov 耗散）
//! - [`temporal`]: 单元时间导数装配
//! - [`control`]: 控制数（Courant 型）最大值归约

pub mod control;
pub mod flux;
pub mod reconstruction;
pub mod temporal;
