// crates/mf_physics/src/forcing/mod.rs

//! 场函子、场修改器与外源数据
//!
//! 函子是 `(t, (x, y), nodata) → R` 的求值器，可选地支持箱式求值
//! `(t, (x, y), box, nodata) → R`。修改器把函子的值经
//! `clamp(offset + factor·v, min, max)` 后以 set/add/multiply 写入场。

pub mod functor;
pub mod generator;
pub mod modifier;
pub mod raster;
pub mod timeseries;

pub use functor::FieldFunctor;
pub use generator::ModifierStep;
pub use modifier::{modify_field, set_field_nan, FieldModifier, IntegrationType, ModifyOp};
pub use raster::{BoxReduction, GeoTransform, RasterField};
pub use timeseries::TimeSeries;
