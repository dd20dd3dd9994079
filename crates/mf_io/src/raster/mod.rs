// crates/mf_io/src/raster/mod.rs

//! 栅格格式
//!
//! - [`nimrod`]: 大端 NIMROD 雷达栅格
//! - [`geotiff`]: GeoTIFF（纯 Rust tiff 解码）

pub mod geotiff;
pub mod nimrod;

use crate::config::Config;
use mf_physics::forcing::RasterField;
use mf_runtime::{MfError, MfResult};
use std::path::{Path, PathBuf};

/// 按 `format` 键分派加载一个 `raster field` 块
pub fn load(conf: &Config, base_path: &Path) -> MfResult<RasterField> {
    let user_path = PathBuf::from(conf.get_str("filename")?);
    let filepath = if user_path.is_absolute() {
        user_path
    } else {
        base_path.join(user_path)
    };

    match conf.get_str("format")? {
        "nimrod" => nimrod::load(&filepath, conf),
        "geotiff" | "gdal" => geotiff::load(&filepath, conf),
        other => Err(MfError::configuration(format!(
            "未知的栅格格式: '{}'",
            other
        ))),
    }
}
