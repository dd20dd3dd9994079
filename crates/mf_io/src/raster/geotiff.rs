// crates/mf_io/src/raster/geotiff.rs

//! GeoTIFF 栅格
//!
//! 纯 Rust tiff 解码，无系统依赖。地理变换取自 ModelPixelScale
//! （33550）与 ModelTiepoint（33922）标签；nodata 先看 GDAL_NODATA
//! （42113），配置里的 `nodata` 键可覆盖。

use crate::config::Config;
use mf_physics::forcing::{GeoTransform, RasterField};
use mf_runtime::{MfError, MfResult};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// 加载 GeoTIFF 栅格
pub fn load(path: &Path, conf: &Config) -> MfResult<RasterField> {
    let file = File::open(path)
        .map_err(|e| MfError::io_with(format!("无法打开 GeoTIFF {}", path.display()), e))?;
    let mut decoder = Decoder::new(file)
        .map_err(|e| MfError::io(format!("{}: TIFF 解码失败: {}", path.display(), e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| MfError::io(format!("{}: 无法读取尺寸: {}", path.display(), e)))?;

    // ModelPixelScale: [sx, sy, sz]；ModelTiepoint: [i, j, k, x, y, z]
    let pixel_scale = decoder.get_tag_f64_vec(Tag::Unknown(33550)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(33922)).ok();

    let geo = match (pixel_scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // 锚定像元 (i, j) 的左上角在世界坐标 (x, y)
            let origin_x = tie[3] - tie[0] * scale[0];
            let origin_y = tie[4] + tie[1] * scale[1];
            GeoTransform::new([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]])?
        }
        _ => {
            return Err(MfError::io(format!(
                "{}: 缺少 GeoTIFF 地理变换标签",
                path.display()
            )))
        }
    };

    // nodata：GDAL_NODATA 标签（ASCII）→ 配置覆盖 → 默认 −9999
    let tag_nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(42113))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok());
    let nodata = match conf.get_child("nodata") {
        Some(node) => node.value().parse::<f64>().map_err(|_| {
            MfError::configuration(format!("nodata 值 '{}' 无法解析", node.value()))
        })?,
        None => tag_nodata.unwrap_or(-9999.0),
    };

    let values: Vec<f64> = match decoder
        .read_image()
        .map_err(|e| MfError::io(format!("{}: 读取像元失败: {}", path.display(), e)))?
    {
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F64(v) => v,
    };

    if values.len() != (width as usize) * (height as usize) {
        return Err(MfError::io(format!(
            "{}: 像元数 {} 与 {}×{} 不符（多波段不受支持）",
            path.display(),
            values.len(),
            width,
            height
        )));
    }

    tracing::info!(
        file = %path.display(),
        grid = format!("{}×{}", width, height),
        nodata,
        "读取 GeoTIFF 栅格"
    );

    RasterField::new(values, width as usize, height as usize, geo, nodata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/x.tif"), &Config::empty()).unwrap_err();
        assert!(matches!(err, MfError::Io { .. }));
    }
}
