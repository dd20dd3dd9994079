// crates/mf_io/src/lib.rs

//! mflow I/O 层
//!
//! - [`config`]: "mf" 层级配置格式（`{ }` 块、`key == value`、`!` 注释）
//! - [`timeseries`]: inline 与 CSV 时间序列加载
//! - [`raster`]: NIMROD 与 GeoTIFF 栅格读取
//! - [`output`]: CSV/TSV 输出格式与输出驱动
//! - [`check`]: 网格检查文件

pub mod check;
pub mod config;
pub mod output;
pub mod raster;
pub mod timeseries;

pub use config::Config;
