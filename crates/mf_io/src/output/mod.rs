// crates/mf_io/src/output/mod.rs

//! 输出序列化
//!
//! - [`format`]: CSV/TSV 文件格式（xyz 或 WKT 几何列）
//! - [`driver`]: 输出驱动（时刻表 + 变量列表 → 每个 (变量, 时刻) 一个文件）

pub mod driver;
pub mod format;

pub use driver::OutputDriver;
pub use format::{CsvOutputFormat, GeometryStyle};
