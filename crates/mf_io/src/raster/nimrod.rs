// crates/mf_io/src/raster/nimrod.rs

//! NIMROD 雷达栅格
//!
//! 大端二进制：4 字节长度前后缀（值 512）夹一个 512 字节头，
//! 头按 int16[31] / float32[28] / float32[45] / char[56] / int16[51]
//! 分区；随后是带同样长度括号的 ncols·nrows 个数据。
//!
//! 只接受左上角起点（h1[23] = 0）与 NG 网格（h1[14] = 0）。
//! 可选 bbox 裁剪按像元序号截取。

use crate::config::Config;
use mf_physics::forcing::{GeoTransform, RasterField};
use mf_runtime::{MfError, MfResult};
use std::io::Read;
use std::path::Path;

fn truncated(path: &Path, what: &str) -> MfError {
    MfError::io(format!("{}: NIMROD 文件截断（{}）", path.display(), what))
}

fn read_u32_be(r: &mut impl Read, path: &Path, what: &str) -> MfResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|_| truncated(path, what))?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i16_array<const N: usize>(
    r: &mut impl Read,
    path: &Path,
    what: &str,
) -> MfResult<[i16; N]> {
    let mut buf = vec![0u8; 2 * N];
    r.read_exact(&mut buf).map_err(|_| truncated(path, what))?;
    let mut out = [0i16; N];
    for (i, chunk) in buf.chunks_exact(2).enumerate() {
        out[i] = i16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(out)
}

fn read_f32_array<const N: usize>(
    r: &mut impl Read,
    path: &Path,
    what: &str,
) -> MfResult<[f32; N]> {
    let mut buf = vec![0u8; 4 * N];
    r.read_exact(&mut buf).map_err(|_| truncated(path, what))?;
    let mut out = [0f32; N];
    for (i, chunk) in buf.chunks_exact(4).enumerate() {
        out[i] = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(out)
}

/// 512 字节 NIMROD 头
#[derive(Debug, Clone)]
pub struct NimrodHeader {
    /// 整型区：时刻、数据类型、网格尺寸、起点角、nodata 等
    pub h1: [i16; 31],
    /// 浮点区：原点坐标、像元尺寸、浮点 nodata、缩放
    pub h2: [f32; 28],
    /// 浮点区（补充）
    pub h3: [f32; 45],
    /// 字符区：单位、数据源、场名
    pub h4: [u8; 56],
    /// 整型区（补充）
    pub h5: [i16; 51],
}

impl NimrodHeader {
    /// 网格列数
    pub fn ncols(&self) -> usize {
        self.h1[16] as usize
    }

    /// 网格行数
    pub fn nrows(&self) -> usize {
        self.h1[15] as usize
    }

    /// 数据单位（字符区前 8 字节）
    pub fn units(&self) -> String {
        String::from_utf8_lossy(&self.h4[..8]).trim().to_string()
    }

    /// 场名（字符区 32..56）
    pub fn field_name(&self) -> String {
        String::from_utf8_lossy(&self.h4[32..56]).trim().to_string()
    }
}

/// 加载 NIMROD 栅格
pub fn load(path: &Path, conf: &Config) -> MfResult<RasterField> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| MfError::io_with(format!("无法打开 NIMROD 文件 {}", path.display()), e))?;

    // 可选 bbox
    let bbox: Option<[f64; 4]> = match conf.get_child("bbox") {
        None => None,
        Some(node) => {
            let b = Config::parse_fixed::<f64, 4>(node.value())?;
            if b[2] <= b[0] || b[3] <= b[1] {
                return Err(MfError::configuration(format!(
                    "bbox 区域退化: ({}, {}) → ({}, {})",
                    b[0], b[1], b[2], b[3]
                )));
            }
            Some(b)
        }
    };

    // 头块及其长度括号
    let block = read_u32_be(&mut file, path, "头长度前缀")?;
    if block != 512 {
        return Err(MfError::io(format!(
            "{}: 期望头长度 512，实得 {}",
            path.display(),
            block
        )));
    }
    let header = NimrodHeader {
        h1: read_i16_array::<31>(&mut file, path, "h1")?,
        h2: read_f32_array::<28>(&mut file, path, "h2")?,
        h3: read_f32_array::<45>(&mut file, path, "h3")?,
        h4: {
            let mut b = [0u8; 56];
            file.read_exact(&mut b).map_err(|_| truncated(path, "h4"))?;
            b
        },
        h5: read_i16_array::<51>(&mut file, path, "h5")?,
    };
    let block = read_u32_be(&mut file, path, "头长度后缀")?;
    if block != 512 {
        return Err(MfError::io(format!(
            "{}: 期望头长度后缀 512，实得 {}",
            path.display(),
            block
        )));
    }

    // 网格类型约束
    match header.h1[14] {
        0 => {}
        1 => {
            return Err(MfError::unsupported_geometry(
                "NIMROD lat/long 网格不受支持",
            ))
        }
        2 => {
            return Err(MfError::unsupported_geometry(
                "NIMROD space view 网格不受支持",
            ))
        }
        3 => {
            return Err(MfError::unsupported_geometry(
                "NIMROD 极射投影网格不受支持",
            ))
        }
        4 => return Err(MfError::unsupported_geometry("NIMROD XY 网格不受支持")),
        other => {
            return Err(MfError::unsupported_geometry(format!(
                "NIMROD 未知网格类型 {}",
                other
            )))
        }
    }
    if header.h1[23] != 0 {
        return Err(MfError::unsupported_geometry(format!(
            "NIMROD 起点角 {} 不受支持（只接受左上角）",
            header.h1[23]
        )));
    }

    let ncols = header.ncols();
    let nrows = header.nrows();
    let npix = ncols * nrows;

    // 数据块
    let data_len = read_u32_be(&mut file, path, "数据长度前缀")?;
    let data_type = header.h1[11];
    let bpp = header.h1[12];

    let (buffer, nodata): (Vec<f64>, f64) = match data_type {
        0 => {
            if bpp != 4 {
                return Err(MfError::io(format!(
                    "{}: 浮点数据的字节数应为 4，实得 {}",
                    path.display(),
                    bpp
                )));
            }
            let mut raw = vec![0u8; 4 * npix];
            file.read_exact(&mut raw).map_err(|_| truncated(path, "浮点数据"))?;
            let values = raw
                .chunks_exact(4)
                .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect();
            (values, header.h2[6] as f64)
        }
        1 => {
            let values = match bpp {
                2 => {
                    let mut raw = vec![0u8; 2 * npix];
                    file.read_exact(&mut raw)
                        .map_err(|_| truncated(path, "整型数据"))?;
                    raw.chunks_exact(2)
                        .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
                        .collect()
                }
                4 => {
                    let mut raw = vec![0u8; 4 * npix];
                    file.read_exact(&mut raw)
                        .map_err(|_| truncated(path, "整型数据"))?;
                    raw.chunks_exact(4)
                        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
                        .collect()
                }
                other => {
                    return Err(MfError::io(format!(
                        "{}: 整型数据的字节数应为 2 或 4，实得 {}",
                        path.display(),
                        other
                    )))
                }
            };
            (values, header.h1[24] as f64)
        }
        2 => {
            if bpp != 1 {
                return Err(MfError::io(format!(
                    "{}: 字符数据的字节数应为 1，实得 {}",
                    path.display(),
                    bpp
                )));
            }
            let mut raw = vec![0u8; npix];
            file.read_exact(&mut raw).map_err(|_| truncated(path, "字符数据"))?;
            (raw.into_iter().map(|b| b as f64).collect(), header.h1[24] as f64)
        }
        other => {
            return Err(MfError::unsupported_geometry(format!(
                "NIMROD 未知数据类型 {}（期望 0/1/2）",
                other
            )))
        }
    };

    let data_len_close = read_u32_be(&mut file, path, "数据长度后缀")?;
    if data_len != data_len_close {
        return Err(MfError::io(format!(
            "{}: 数据块长度括号不匹配: {} vs {}",
            path.display(),
            data_len,
            data_len_close
        )));
    }

    // 地理参考：头给左上角起点的原点坐标与像元尺寸
    let dx = header.h2[5] as f64;
    let dy = header.h2[3] as f64;
    let llc_x = header.h2[4] as f64 - 0.5 * dx;
    let urc_y = header.h2[2] as f64 + 0.5 * dy;

    if conf.get_bool_or("verbose", false)? {
        tracing::info!(
            file = %path.display(),
            validity = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                header.h1[0], header.h1[1], header.h1[2],
                header.h1[3], header.h1[4], header.h1[5]
            ),
            grid = format!("{}×{}", ncols, nrows),
            units = %header.units(),
            field = %header.field_name(),
            nodata,
            "读取 NIMROD 栅格"
        );
    }

    // bbox 裁剪：按像元序号截取
    let (values, ncols_out, nrows_out, tl_x, tl_y) = match bbox {
        None => (buffer, ncols, nrows, llc_x, urc_y),
        Some(b) => {
            let clampc = |v: f64, n: usize| -> usize {
                if v < 0.0 {
                    0
                } else {
                    (v as usize).min(n - 1)
                }
            };
            let ulc_x = clampc((b[0] - llc_x) / dx, ncols);
            let ulc_y = clampc((urc_y - b[3]) / dy, nrows);
            let lrc_x = clampc((b[2] - llc_x) / dx, ncols);
            let lrc_y = clampc((urc_y - b[1]) / dy, nrows);

            let co = 1 + lrc_x - ulc_x;
            let ro = 1 + lrc_y - ulc_y;
            let mut cropped = Vec::with_capacity(co * ro);
            for row in 0..ro {
                for col in 0..co {
                    cropped.push(buffer[(row + ulc_y) * ncols + (col + ulc_x)]);
                }
            }
            (
                cropped,
                co,
                ro,
                llc_x + ulc_x as f64 * dx,
                urc_y - ulc_y as f64 * dy,
            )
        }
    };

    // 左上角原点、行向下的标准仿射
    let geo = GeoTransform::new([tl_x, dx, 0.0, tl_y, 0.0, -dy])?;
    RasterField::new(values, ncols_out, nrows_out, geo, nodata)
}
