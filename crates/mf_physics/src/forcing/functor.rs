// crates/mf_physics/src/forcing/functor.rs

//! 场函子
//!
//! 按配置名静态分派的带标签变体。随机函子只能在宿主侧求值
//! （[`FieldFunctor::is_host_only`]），其余变体可进入并行内核。

use super::raster::{BoxReduction, RasterField};
use super::timeseries::TimeSeries;
use glam::DVec2;
use mf_runtime::{MfError, MfResult};
use parking_lot::Mutex;
use rand::distributions::{Distribution, Uniform};
use rand::{RngCore, SeedableRng};
use rand_distr::{Cauchy, ChiSquared, Exp, FisherF, Gamma, Gumbel, LogNormal, Normal, StudentT, Weibull};
use rand_mt::{Mt19937GenRand32, Mt19937GenRand64};
use std::sync::Arc;

// =============================================================================
// 随机数引擎
// =============================================================================

/// Lehmer 最小标准线性同余发生器
///
/// 模数 2³¹−1，乘数 16807（1988 参数化）或 48271（1993 参数化）。
#[derive(Debug)]
struct Lehmer {
    state: u64,
    multiplier: u64,
}

const LEHMER_MODULUS: u64 = 0x7fff_ffff;

impl Lehmer {
    fn new(multiplier: u64, seed: u64) -> Self {
        let mut state = seed % LEHMER_MODULUS;
        if state == 0 {
            state = 1;
        }
        Self { state, multiplier }
    }
}

impl RngCore for Lehmer {
    fn next_u32(&mut self) -> u32 {
        self.state = (self.state * self.multiplier) % LEHMER_MODULUS;
        self.state as u32
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

enum Engine {
    Mt32(Mt19937GenRand32),
    Mt64(Mt19937GenRand64),
    MinStd(Lehmer),
}

impl RngCore for Engine {
    fn next_u32(&mut self) -> u32 {
        match self {
            Engine::Mt32(g) => g.next_u32(),
            Engine::Mt64(g) => g.next_u32(),
            Engine::MinStd(g) => g.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            Engine::Mt32(g) => g.next_u64(),
            Engine::Mt64(g) => g.next_u64(),
            Engine::MinStd(g) => g.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            Engine::Mt32(g) => g.fill_bytes(dest),
            Engine::Mt64(g) => g.fill_bytes(dest),
            Engine::MinStd(g) => g.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// 把用户的种子序列确定性地折叠为一个 u64
fn fold_seed(seed: &[u32]) -> u64 {
    let mut acc: u64 = 0x9e37_79b9_7f4a_7c15;
    for &s in seed {
        acc = acc
            .rotate_left(31)
            .wrapping_mul(0x100_0000_01b3)
            .wrapping_add(u64::from(s));
    }
    acc
}

fn build_engine(name: &str, seed: &[u32]) -> MfResult<Engine> {
    let folded = fold_seed(seed);
    match name {
        "mersenne twister 1998" => Ok(Engine::Mt32(Mt19937GenRand32::seed_from_u64(folded))),
        "mersenne twister 2000" => Ok(Engine::Mt64(Mt19937GenRand64::seed_from_u64(folded))),
        "minimal standard 1988" => Ok(Engine::MinStd(Lehmer::new(16807, folded))),
        "minimal standard 1993" => Ok(Engine::MinStd(Lehmer::new(48271, folded))),
        "ranlux 24" | "ranlux 48" | "ranlux 24 base" | "ranlux 48 base" | "knuth b" => Err(
            MfError::not_implemented(format!("随机数引擎 '{}' 暂不可用", name)),
        ),
        other => Err(MfError::configuration(format!(
            "不支持的随机数引擎: '{}'",
            other
        ))),
    }
}

// =============================================================================
// 随机分布
// =============================================================================

/// 随机分布及其参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RandomDistribution {
    /// 均匀分布 [min, max)
    Uniform {
        /// 下界
        min: f64,
        /// 上界
        max: f64,
    },
    /// 指数分布
    Exponential {
        /// 率参数 λ
        lambda: f64,
    },
    /// Gamma 分布（形状 α，尺度 β）
    Gamma {
        /// 形状
        alpha: f64,
        /// 尺度
        beta: f64,
    },
    /// Weibull 分布（形状 a，尺度 b）
    Weibull {
        /// 形状
        a: f64,
        /// 尺度
        b: f64,
    },
    /// 极值（Gumbel）分布（位置 a，尺度 b）
    ExtremeValue {
        /// 位置
        a: f64,
        /// 尺度
        b: f64,
    },
    /// 正态分布
    Normal {
        /// 均值
        mean: f64,
        /// 标准差
        std_dev: f64,
    },
    /// 对数正态分布
    LogNormal {
        /// 对数均值
        m: f64,
        /// 对数标准差
        s: f64,
    },
    /// 卡方分布
    ChiSquared {
        /// 自由度
        n: f64,
    },
    /// 柯西分布（位置 a，尺度 b）
    Cauchy {
        /// 位置
        a: f64,
        /// 尺度
        b: f64,
    },
    /// F 分布
    FisherF {
        /// 分子自由度
        m: f64,
        /// 分母自由度
        n: f64,
    },
    /// t 分布
    StudentT {
        /// 自由度
        n: f64,
    },
}

enum Sampler {
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
    Gamma(Gamma<f64>),
    Weibull(Weibull<f64>),
    ExtremeValue(Gumbel<f64>),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    ChiSquared(ChiSquared<f64>),
    Cauchy(Cauchy<f64>),
    FisherF(FisherF<f64>),
    StudentT(StudentT<f64>),
}

impl Sampler {
    fn build(dist: RandomDistribution) -> MfResult<Self> {
        let bad = |what: &str| MfError::configuration(format!("随机分布参数无效: {}", what));
        Ok(match dist {
            RandomDistribution::Uniform { min, max } => {
                if !(min < max) {
                    return Err(bad("uniform 要求 min < max"));
                }
                Sampler::Uniform(Uniform::new(min, max))
            }
            RandomDistribution::Exponential { lambda } => {
                Sampler::Exponential(Exp::new(lambda).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::Gamma { alpha, beta } => {
                Sampler::Gamma(Gamma::new(alpha, beta).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::Weibull { a, b } => {
                Sampler::Weibull(Weibull::new(b, a).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::ExtremeValue { a, b } => {
                Sampler::ExtremeValue(Gumbel::new(a, b).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::Normal { mean, std_dev } => {
                Sampler::Normal(Normal::new(mean, std_dev).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::LogNormal { m, s } => {
                Sampler::LogNormal(LogNormal::new(m, s).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::ChiSquared { n } => {
                Sampler::ChiSquared(ChiSquared::new(n).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::Cauchy { a, b } => {
                Sampler::Cauchy(Cauchy::new(a, b).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::FisherF { m, n } => {
                Sampler::FisherF(FisherF::new(m, n).map_err(|e| bad(&e.to_string()))?)
            }
            RandomDistribution::StudentT { n } => {
                Sampler::StudentT(StudentT::new(n).map_err(|e| bad(&e.to_string()))?)
            }
        })
    }

    fn sample(&self, rng: &mut Engine) -> f64 {
        match self {
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Exponential(d) => d.sample(rng),
            Sampler::Gamma(d) => d.sample(rng),
            Sampler::Weibull(d) => d.sample(rng),
            Sampler::ExtremeValue(d) => d.sample(rng),
            Sampler::Normal(d) => d.sample(rng),
            Sampler::LogNormal(d) => d.sample(rng),
            Sampler::ChiSquared(d) => d.sample(rng),
            Sampler::Cauchy(d) => d.sample(rng),
            Sampler::FisherF(d) => d.sample(rng),
            Sampler::StudentT(d) => d.sample(rng),
        }
    }
}

/// 随机值函子（仅宿主）
pub struct RandomFunctor {
    rng: Mutex<Engine>,
    sampler: Sampler,
}

impl RandomFunctor {
    /// 按引擎名、种子序列与分布创建
    pub fn new(engine: &str, seed: &[u32], dist: RandomDistribution) -> MfResult<Self> {
        Ok(Self {
            rng: Mutex::new(build_engine(engine, seed)?),
            sampler: Sampler::build(dist)?,
        })
    }

    fn draw(&self) -> f64 {
        self.sampler.sample(&mut self.rng.lock())
    }
}

impl std::fmt::Debug for RandomFunctor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomFunctor").finish_non_exhaustive()
    }
}

// =============================================================================
// 场函子
// =============================================================================

/// 场函子：`(t, (x, y), nodata) → 值`
#[derive(Debug)]
pub enum FieldFunctor {
    /// 固定值
    Fixed(f64),
    /// 半球面
    Hemisphere {
        /// 球心平面位置
        origin: DVec2,
        /// 球心高程
        centre_z: f64,
        /// 半径
        radius: f64,
        /// 凸（true）或凹
        convex: bool,
    },
    /// 仿射斜面
    Slope {
        /// 基准点
        origin: DVec2,
        /// x/y 方向坡度
        slope: DVec2,
        /// 基准点取值
        origin_value: f64,
    },
    /// 时间序列（与位置无关）
    Series(Arc<TimeSeries>),
    /// 反距离加权的多点时间序列
    Interpolated(Vec<(DVec2, Arc<TimeSeries>)>),
    /// 随机值（仅宿主）
    Random(RandomFunctor),
    /// 栅格查询
    Raster {
        /// 栅格场
        raster: Arc<RasterField>,
        /// 箱式归约操作
        reduction: BoxReduction,
    },
}

impl FieldFunctor {
    /// 函子名（日志用）
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldFunctor::Fixed(_) => "fixed value",
            FieldFunctor::Hemisphere { .. } => "hemisphere",
            FieldFunctor::Slope { .. } => "slope",
            FieldFunctor::Series(_) => "time series",
            FieldFunctor::Interpolated(_) => "interpolated time series",
            FieldFunctor::Random(_) => "random value",
            FieldFunctor::Raster { .. } => "raster field value",
        }
    }

    /// 是否只能在宿主侧求值
    pub fn is_host_only(&self) -> bool {
        matches!(self, FieldFunctor::Random(_))
    }

    /// 点求值
    pub fn evaluate(&self, time: f64, coord: DVec2, nodata: f64) -> f64 {
        match self {
            FieldFunctor::Fixed(v) => *v,
            FieldFunctor::Hemisphere {
                origin,
                centre_z,
                radius,
                convex,
            } => {
                let d = coord - *origin;
                let distance2 = radius * radius - d.x * d.x - d.y * d.y;
                if distance2 >= 0.0 {
                    (distance2.sqrt() + centre_z) * if *convex { 1.0 } else { -1.0 }
                } else {
                    nodata
                }
            }
            FieldFunctor::Slope {
                origin,
                slope,
                origin_value,
            } => {
                let d = coord - *origin;
                origin_value + d.x * slope.x + d.y * slope.y
            }
            FieldFunctor::Series(ts) => ts.value_at(time),
            FieldFunctor::Interpolated(anchors) => {
                let mut weighted = 0.0;
                let mut total_weight = 0.0;
                for (loc, ts) in anchors {
                    let value = ts.value_at(time);
                    let d2 = coord.distance_squared(*loc);
                    // 距锚点极近时直接取该锚点的值
                    if d2 < 1e-4 {
                        return value;
                    }
                    let weight = 1.0 / d2;
                    weighted += weight * value;
                    total_weight += weight;
                }
                if total_weight > 0.0 {
                    weighted / total_weight
                } else {
                    nodata
                }
            }
            FieldFunctor::Random(r) => r.draw(),
            FieldFunctor::Raster { raster, .. } => raster.sample_point(coord, nodata),
        }
    }

    /// 箱式求值
    ///
    /// 半球面没有箱式形式，返回 nodata；栅格做箱式归约；
    /// 其余变体退化到点求值。
    pub fn evaluate_box(&self, time: f64, coord: DVec2, box_size: DVec2, nodata: f64) -> f64 {
        match self {
            FieldFunctor::Hemisphere { .. } => nodata,
            FieldFunctor::Raster { raster, reduction } => {
                raster.sample_box(coord, box_size, *reduction, nodata)
            }
            other => other.evaluate(time, coord, nodata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::raster::GeoTransform;

    #[test]
    fn test_fixed() {
        let f = FieldFunctor::Fixed(3.5);
        assert_eq!(f.evaluate(0.0, DVec2::ZERO, -9999.0), 3.5);
        assert_eq!(f.evaluate_box(0.0, DVec2::ZERO, DVec2::ONE, -9999.0), 3.5);
    }

    #[test]
    fn test_hemisphere_inside_outside() {
        let f = FieldFunctor::Hemisphere {
            origin: DVec2::ZERO,
            centre_z: 1.0,
            radius: 2.0,
            convex: true,
        };
        // 球心处高 r + z
        assert!((f.evaluate(0.0, DVec2::ZERO, f64::NAN) - 3.0).abs() < 1e-12);
        // 半径外 nodata
        assert!(f.evaluate(0.0, DVec2::new(3.0, 0.0), f64::NAN).is_nan());
        // 箱式形式无定义
        assert!(f.evaluate_box(0.0, DVec2::ZERO, DVec2::ONE, f64::NAN).is_nan());
    }

    #[test]
    fn test_hemisphere_concave() {
        let f = FieldFunctor::Hemisphere {
            origin: DVec2::ZERO,
            centre_z: 0.0,
            radius: 1.0,
            convex: false,
        };
        assert!((f.evaluate(0.0, DVec2::ZERO, f64::NAN) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_slope() {
        let f = FieldFunctor::Slope {
            origin: DVec2::new(1.0, 1.0),
            slope: DVec2::new(0.1, -0.2),
            origin_value: 5.0,
        };
        let v = f.evaluate(0.0, DVec2::new(3.0, 2.0), f64::NAN);
        assert!((v - (5.0 + 2.0 * 0.1 - 1.0 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_series_ignores_position() {
        let ts = Arc::new(TimeSeries::new(vec![0.0, 10.0], vec![0.0, 1.0]).unwrap());
        let f = FieldFunctor::Series(ts);
        let a = f.evaluate(5.0, DVec2::ZERO, f64::NAN);
        let b = f.evaluate(5.0, DVec2::new(100.0, 100.0), f64::NAN);
        assert_eq!(a, b);
        assert!((a - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolated_idw_and_anchor_snap() {
        let ts1 = Arc::new(TimeSeries::new(vec![0.0, 1.0], vec![1.0, 1.0]).unwrap());
        let ts2 = Arc::new(TimeSeries::new(vec![0.0, 1.0], vec![3.0, 3.0]).unwrap());
        let f = FieldFunctor::Interpolated(vec![
            (DVec2::new(0.0, 0.0), ts1),
            (DVec2::new(2.0, 0.0), ts2),
        ]);
        // 中点：等权均值
        let mid = f.evaluate(0.5, DVec2::new(1.0, 0.0), f64::NAN);
        assert!((mid - 2.0).abs() < 1e-12);
        // 锚点处取锚点值
        let at = f.evaluate(0.5, DVec2::new(0.0, 0.0), f64::NAN);
        assert_eq!(at, 1.0);
    }

    #[test]
    fn test_random_deterministic_per_seed() {
        let dist = RandomDistribution::Uniform { min: 0.0, max: 1.0 };
        let a = FieldFunctor::Random(
            RandomFunctor::new("mersenne twister 1998", &[1, 2, 3], dist).unwrap(),
        );
        let b = FieldFunctor::Random(
            RandomFunctor::new("mersenne twister 1998", &[1, 2, 3], dist).unwrap(),
        );
        let seq_a: Vec<f64> = (0..8).map(|_| a.evaluate(0.0, DVec2::ZERO, 0.0)).collect();
        let seq_b: Vec<f64> = (0..8).map(|_| b.evaluate(0.0, DVec2::ZERO, 0.0)).collect();
        assert_eq!(seq_a, seq_b);
        assert!(seq_a.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert!(a.is_host_only());
    }

    #[test]
    fn test_random_engines() {
        let dist = RandomDistribution::Normal {
            mean: 0.0,
            std_dev: 1.0,
        };
        for engine in [
            "mersenne twister 1998",
            "mersenne twister 2000",
            "minimal standard 1988",
            "minimal standard 1993",
        ] {
            assert!(RandomFunctor::new(engine, &[7], dist).is_ok(), "{}", engine);
        }
        assert!(matches!(
            RandomFunctor::new("ranlux 24", &[7], dist).unwrap_err(),
            MfError::NotImplemented { .. }
        ));
        assert!(matches!(
            RandomFunctor::new("xorshift", &[7], dist).unwrap_err(),
            MfError::Configuration { .. }
        ));
    }

    #[test]
    fn test_raster_functor() {
        let geo = GeoTransform::new([0.0, 1.0, 0.0, 2.0, 0.0, -1.0]).unwrap();
        let raster = Arc::new(
            RasterField::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2, geo, -9999.0).unwrap(),
        );
        let f = FieldFunctor::Raster {
            raster,
            reduction: BoxReduction::Mean,
        };
        assert_eq!(f.evaluate(0.0, DVec2::new(0.5, 1.5), f64::NAN), 1.0);
        let mean = f.evaluate_box(0.0, DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0), f64::NAN);
        assert!((mean - 2.5).abs() < 1e-12);
    }
}
