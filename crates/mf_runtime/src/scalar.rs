// crates/mf_runtime/src/scalar.rs

//! Scalar trait（密封，仅 f32/f64 可实现）
//!
//! 物理量使用统一的实数类型承载，默认单精度。索引为 u64/usize，
//! 世界坐标恒为 f64，不经过本 trait。

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive, ToPrimitive};

mod private {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// 物理标量 trait
///
/// 仅对 f32/f64 实现。提供内核中需要的常量与 sycl 风格数学函数。
pub trait Scalar:
    Float
    + FromPrimitive
    + ToPrimitive
    + Pod
    + Default
    + Send
    + Sync
    + std::fmt::Debug
    + std::fmt::Display
    + std::ops::AddAssign
    + std::ops::SubAssign
    + std::ops::MulAssign
    + 'static
    + private::Sealed
{
    /// 零
    const ZERO: Self;
    /// 一
    const ONE: Self;
    /// 0.5
    const HALF: Self;
    /// 二
    const TWO: Self;

    /// 从 f64 降转（配置参数进入内核的唯一通道）
    fn of(v: f64) -> Self;

    /// 升转到 f64
    fn as_f64(self) -> f64;

    /// 符号函数，x == 0 时返回 0
    ///
    /// `Float::signum` 对 ±0 返回 ±1，与内核需要的三值符号不同。
    #[inline]
    fn sgn(self) -> Self {
        if self > Self::ZERO {
            Self::ONE
        } else if self < Self::ZERO {
            -Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// 线性混合 a + (b − a)·t
    #[inline]
    fn mix(a: Self, b: Self, t: Self) -> Self {
        a + (b - a) * t
    }

    /// Hermite 平滑阶梯，edge0 ≤ edge1
    #[inline]
    fn smoothstep(edge0: Self, edge1: Self, x: Self) -> Self {
        if edge0 >= edge1 {
            return if x < edge0 { Self::ZERO } else { Self::ONE };
        }
        let t = ((x - edge0) / (edge1 - edge0)).clamp_to(Self::ZERO, Self::ONE);
        t * t * (Self::of(3.0) - Self::TWO * t)
    }

    /// 截断到 [lo, hi]
    #[inline]
    fn clamp_to(self, lo: Self, hi: Self) -> Self {
        if self < lo {
            lo
        } else if self > hi {
            hi
        } else {
            self
        }
    }
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;

    #[inline]
    fn of(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;

    #[inline]
    fn of(v: f64) -> Self {
        v
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}
