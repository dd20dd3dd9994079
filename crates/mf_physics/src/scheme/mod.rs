// crates/mf_physics/src/scheme/mod.rs

//! 显式 Runge-Kutta 时间推进
//!
//! - [`tableau`]: Butcher 系数表与命名格式
//! - [`runge_kutta`]: S 级显式推进、非负截断与接受步

pub mod runge_kutta;
pub mod tableau;

pub use runge_kutta::RungeKuttaScheme;
pub use tableau::ButcherTableau;
