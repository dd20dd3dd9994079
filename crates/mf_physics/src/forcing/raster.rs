// crates/mf_physics/src/forcing/raster.rs

//! 栅格场
//!
//! 只读的二维地理参考网格：六参数仿射变换 + 显式 nodata 哨兵。
//! 支持点采样与轴对齐箱式归约。归约操作是一个由调用方驱动的
//! 迭代状态机：单遍操作一次迭代完成，标准差类操作需要两遍。

use glam::DVec2;
use mf_runtime::{MfError, MfResult};

/// 六参数仿射地理变换（GDAL 约定）
///
/// `x = c0 + col·c1 + row·c2`，`y = c3 + col·c4 + row·c5`。
/// 构造时预计算逆变换用到的倒数。
#[derive(Debug, Clone, Copy)]
pub struct GeoTransform {
    c: [f64; 6],
    inv_x_size: f64,
    inv_y_size: f64,
    inv_xy_size: f64,
    inv_denom: f64,
}

impl GeoTransform {
    /// 由六个系数创建；不可逆的变换报配置错误
    pub fn new(c: [f64; 6]) -> MfResult<Self> {
        if c[1] == 0.0 || c[5] == 0.0 {
            return Err(MfError::configuration(
                "栅格地理变换不可逆（像元尺寸为零）",
            ));
        }
        let inv_x_size = 1.0 / c[1];
        let inv_y_size = 1.0 / c[5];
        let inv_xy_size = 1.0 / (c[1] * c[5]);
        let denom = 1.0 - (c[2] * c[4]) * inv_xy_size;
        if denom == 0.0 {
            return Err(MfError::configuration("栅格地理变换退化，无法求逆"));
        }
        Ok(Self {
            c,
            inv_x_size,
            inv_y_size,
            inv_xy_size,
            inv_denom: 1.0 / denom,
        })
    }

    /// 系数
    pub fn coefficients(&self) -> &[f64; 6] {
        &self.c
    }

    /// 世界坐标 → 分数列号
    pub fn fractional_col(&self, loc: DVec2) -> f64 {
        ((loc.x - self.c[0]) * self.inv_x_size
            - (loc.y - self.c[3]) * self.c[2] * self.inv_xy_size)
            * self.inv_denom
    }

    /// 世界坐标 → 分数行号
    pub fn fractional_row(&self, loc: DVec2) -> f64 {
        ((loc.y - self.c[3]) * self.inv_y_size
            - (loc.x - self.c[0]) * self.c[4] * self.inv_xy_size)
            * self.inv_denom
    }
}

/// 箱式归约操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxReduction {
    /// 最小值
    Minimum,
    /// 最大值
    Maximum,
    /// 均值
    Mean,
    /// 对数均值
    LnMean,
    /// 标准差（两遍）
    StdDev,
    /// 对数标准差（两遍）
    LnStdDev,
    /// 求和
    Sum,
    /// 像元计数
    Count,
}

impl BoxReduction {
    /// 配置名 → 操作
    pub fn from_name(name: &str) -> MfResult<Self> {
        match name {
            "minimum" | "min" => Ok(Self::Minimum),
            "maximum" | "max" => Ok(Self::Maximum),
            "mean" => Ok(Self::Mean),
            "ln mean" => Ok(Self::LnMean),
            "std dev" => Ok(Self::StdDev),
            "ln std dev" => Ok(Self::LnStdDev),
            "sum" => Ok(Self::Sum),
            "count" => Ok(Self::Count),
            other => Err(MfError::configuration(format!(
                "未知的箱式归约操作: '{}'",
                other
            ))),
        }
    }
}

/// 归约状态机
///
/// 调用方循环 `iterations_remaining() > 0`，每轮对箱内全部像元
/// `append`，随后 `get` 收取该轮结果；两遍操作第一轮产出中间量。
#[derive(Debug)]
pub struct ReductionState {
    op: BoxReduction,
    nodata: f64,
    state: usize,
    accumulator: f64,
    mean: f64,
    count: usize,
}

impl ReductionState {
    /// 创建指定操作的状态机
    pub fn new(op: BoxReduction, nodata: f64) -> Self {
        let state = match op {
            BoxReduction::StdDev | BoxReduction::LnStdDev => 2,
            _ => 1,
        };
        let accumulator = match op {
            BoxReduction::Minimum => f64::MAX,
            BoxReduction::Maximum => f64::MIN,
            _ => 0.0,
        };
        Self {
            op,
            nodata,
            state,
            accumulator,
            mean: 0.0,
            count: 0,
        }
    }

    /// 剩余迭代轮数
    pub fn iterations_remaining(&self) -> usize {
        self.state
    }

    /// 累积一个像元值
    pub fn append(&mut self, value: f64) {
        match self.op {
            BoxReduction::Minimum => {
                if value < self.accumulator {
                    self.accumulator = value;
                }
                self.count += 1;
            }
            BoxReduction::Maximum => {
                if value > self.accumulator {
                    self.accumulator = value;
                }
                self.count += 1;
            }
            BoxReduction::Mean => {
                self.accumulator += value;
                self.count += 1;
            }
            BoxReduction::LnMean => {
                self.accumulator += value.ln();
                self.count += 1;
            }
            BoxReduction::Sum => {
                self.accumulator += value;
                self.count += 1;
            }
            BoxReduction::Count => {
                self.count += 1;
            }
            BoxReduction::StdDev => match self.state {
                2 => {
                    self.mean += value;
                    self.count += 1;
                }
                1 => {
                    let d = value - self.mean;
                    self.accumulator += d * d;
                    self.count += 1;
                }
                _ => {}
            },
            BoxReduction::LnStdDev => match self.state {
                2 => {
                    self.mean += value.ln();
                    self.count += 1;
                }
                1 => {
                    let d = value.ln() - self.mean;
                    self.accumulator += d * d;
                    self.count += 1;
                }
                _ => {}
            },
        }
    }

    /// 收取本轮结果并推进状态
    pub fn get(&mut self) -> f64 {
        self.state = self.state.saturating_sub(1);
        if self.count == 0 {
            return self.nodata;
        }
        match self.op {
            BoxReduction::Minimum | BoxReduction::Maximum => self.accumulator,
            BoxReduction::Mean | BoxReduction::LnMean => self.accumulator / self.count as f64,
            BoxReduction::Sum => self.accumulator,
            BoxReduction::Count => self.count as f64,
            BoxReduction::StdDev | BoxReduction::LnStdDev => match self.state {
                // 第一遍结束：产出均值并清零计数
                1 => {
                    self.mean /= self.count as f64;
                    self.count = 0;
                    self.mean
                }
                _ => (self.accumulator / self.count as f64).sqrt(),
            },
        }
    }
}

/// 栅格场
#[derive(Debug, Clone)]
pub struct RasterField {
    values: Vec<f64>,
    ncols: usize,
    nrows: usize,
    geo: GeoTransform,
    nodata: f64,
}

impl RasterField {
    /// 创建栅格场
    pub fn new(
        values: Vec<f64>,
        ncols: usize,
        nrows: usize,
        geo: GeoTransform,
        nodata: f64,
    ) -> MfResult<Self> {
        if values.len() != ncols * nrows {
            return Err(MfError::configuration(format!(
                "栅格数据长度 {} 与 {}×{} 不符",
                values.len(),
                ncols,
                nrows
            )));
        }
        Ok(Self {
            values,
            ncols,
            nrows,
            geo,
            nodata,
        })
    }

    /// 列数
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// 行数
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// nodata 哨兵
    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// 地理变换
    pub fn transform(&self) -> &GeoTransform {
        &self.geo
    }

    /// 像元值
    pub fn pixel(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.ncols + col]
    }

    /// 点采样：落点像元的值；出界或 nodata 像元返回 `nodata_out`
    pub fn sample_point(&self, loc: DVec2, nodata_out: f64) -> f64 {
        let fc = self.geo.fractional_col(loc);
        let fr = self.geo.fractional_row(loc);
        if fc < 0.0 || fr < 0.0 {
            return nodata_out;
        }
        let col = fc as usize;
        let row = fr as usize;
        if col >= self.ncols || row >= self.nrows {
            return nodata_out;
        }
        let value = self.pixel(col, row);
        if value.is_nan() || value == self.nodata {
            nodata_out
        } else {
            value
        }
    }

    /// 箱式归约：覆盖箱的像元矩形上执行归约操作
    ///
    /// nodata 与 NaN 像元不参与累积；箱内无有效像元时返回 `nodata_out`。
    pub fn sample_box(
        &self,
        coord: DVec2,
        box_size: DVec2,
        op: BoxReduction,
        nodata_out: f64,
    ) -> f64 {
        let c0 = DVec2::new(coord.x - 0.5 * box_size.x, coord.y - 0.5 * box_size.y);
        let c1 = DVec2::new(coord.x + 0.5 * box_size.x, coord.y + 0.5 * box_size.y);

        // 两角换算成像元区间；y 轴像元尺寸通常为负，行区间取自对角
        let cols = [self.geo.fractional_col(c0), self.geo.fractional_col(c1)];
        let rows = [self.geo.fractional_row(c0), self.geo.fractional_row(c1)];
        let col0 = cols[0].min(cols[1]).floor().max(0.0) as usize;
        let col1 = (cols[0].max(cols[1]).ceil() as i64).clamp(0, self.ncols as i64) as usize;
        let row0 = rows[0].min(rows[1]).floor().max(0.0) as usize;
        let row1 = (rows[0].max(rows[1]).ceil() as i64).clamp(0, self.nrows as i64) as usize;

        let mut reduction = ReductionState::new(op, nodata_out);
        let mut result = nodata_out;
        while reduction.iterations_remaining() > 0 {
            for row in row0..row1 {
                for col in col0..col1 {
                    let value = self.pixel(col, row);
                    if value.is_nan() || value == self.nodata {
                        continue;
                    }
                    reduction.append(value);
                }
            }
            result = reduction.get();
        }
        result
    }
}
