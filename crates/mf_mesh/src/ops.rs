// crates/mf_mesh/src/ops.rs

//! 场算术
//!
//! 二元运算在 f64 中进行再降转到目标标量，保证 stage − zb 等
//! 初始化路径的双精度语义。操作数映射或长度不一致返回
//! `InvalidCombination`。结果写入新场或调用方提供的目标场。

use crate::field::Field;
use mf_runtime::{MfError, MfResult, Scalar};

fn check_pair<A: Scalar, B: Scalar>(a: &Field<A>, b: &Field<B>) -> MfResult<()> {
    if a.mesh().as_ref() != b.mesh().as_ref() {
        return Err(MfError::invalid_combination(format!(
            "场 '{}' 与 '{}' 属于不同网格",
            a.name(),
            b.name()
        )));
    }
    if a.mapping() != b.mapping() {
        return Err(MfError::invalid_combination(format!(
            "场 '{}' ({}) 与 '{}' ({}) 映射不同",
            a.name(),
            a.mapping(),
            b.name(),
            b.mapping()
        )));
    }
    if a.len() != b.len() {
        return Err(MfError::invalid_combination(format!(
            "场 '{}' 与 '{}' 长度不同: {} vs {}",
            a.name(),
            b.name(),
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn check_dest<A: Scalar, D: Scalar>(a: &Field<A>, dst: &Field<D>) -> MfResult<()> {
    if a.mapping() != dst.mapping() || a.len() != dst.len() || a.mesh().as_ref() != dst.mesh().as_ref()
    {
        return Err(MfError::invalid_combination(format!(
            "目标场 '{}' 与源场 '{}' 形状不匹配",
            dst.name(),
            a.name()
        )));
    }
    Ok(())
}

fn binary_to<A, B, D, F>(a: &Field<A>, b: &Field<B>, dst: &mut Field<D>, op: F) -> MfResult<()>
where
    A: Scalar,
    B: Scalar,
    D: Scalar,
    F: Fn(f64, f64) -> f64 + Sync,
{
    check_pair(a, b)?;
    check_dest(a, dst)?;
    let sa = a.slice();
    let sb = b.slice();
    if dst.is_on_device() {
        let queue = a.queue().clone();
        queue.parallel_fill(dst.slice_mut(), |i| D::of(op(sa[i].as_f64(), sb[i].as_f64())));
    } else {
        for (i, d) in dst.slice_mut().iter_mut().enumerate() {
            *d = D::of(op(sa[i].as_f64(), sb[i].as_f64()));
        }
    }
    Ok(())
}

fn binary_new<A, B, D, F>(name: &str, a: &Field<A>, b: &Field<B>, op: F) -> MfResult<Field<D>>
where
    A: Scalar,
    B: Scalar,
    D: Scalar,
    F: Fn(f64, f64) -> f64 + Sync,
{
    check_pair(a, b)?;
    let mut dst = Field::<D>::new(
        a.queue().clone(),
        name,
        a.mesh().clone(),
        a.mapping(),
        a.is_on_device(),
        D::ZERO,
    );
    binary_to(a, b, &mut dst, op)?;
    Ok(dst)
}

/// 和：dst = a + b
pub fn field_sum<A: Scalar, B: Scalar, D: Scalar>(
    name: &str,
    a: &Field<A>,
    b: &Field<B>,
) -> MfResult<Field<D>> {
    binary_new(name, a, b, |x, y| x + y)
}

/// 差：dst = a − b
pub fn field_difference<A: Scalar, B: Scalar, D: Scalar>(
    name: &str,
    a: &Field<A>,
    b: &Field<B>,
) -> MfResult<Field<D>> {
    binary_new(name, a, b, |x, y| x - y)
}

/// 积：dst = a · b
pub fn field_product<A: Scalar, B: Scalar, D: Scalar>(
    name: &str,
    a: &Field<A>,
    b: &Field<B>,
) -> MfResult<Field<D>> {
    binary_new(name, a, b, |x, y| x * y)
}

/// 商：dst = a / b
pub fn field_quotient<A: Scalar, B: Scalar, D: Scalar>(
    name: &str,
    a: &Field<A>,
    b: &Field<B>,
) -> MfResult<Field<D>> {
    binary_new(name, a, b, |x, y| x / y)
}

/// 差（写入既有目标场）
pub fn field_difference_to<A: Scalar, B: Scalar, D: Scalar>(
    a: &Field<A>,
    b: &Field<B>,
    dst: &mut Field<D>,
) -> MfResult<()> {
    binary_to(a, b, dst, |x, y| x - y)
}

/// 和（写入既有目标场）
pub fn field_sum_to<A: Scalar, B: Scalar, D: Scalar>(
    a: &Field<A>,
    b: &Field<B>,
    dst: &mut Field<D>,
) -> MfResult<()> {
    binary_to(a, b, dst, |x, y| x + y)
}

/// 积（写入既有目标场）
pub fn field_product_to<A: Scalar, B: Scalar, D: Scalar>(
    a: &Field<A>,
    b: &Field<B>,
    dst: &mut Field<D>,
) -> MfResult<()> {
    binary_to(a, b, dst, |x, y| x * y)
}

/// 商（写入既有目标场）
pub fn field_quotient_to<A: Scalar, B: Scalar, D: Scalar>(
    a: &Field<A>,
    b: &Field<B>,
    dst: &mut Field<D>,
) -> MfResult<()> {
    binary_to(a, b, dst, |x, y| x / y)
}

/// 类型转换：dst = D(a)
pub fn field_cast<A: Scalar, D: Scalar>(name: &str, a: &Field<A>) -> MfResult<Field<D>> {
    let mut dst = Field::<D>::new(
        a.queue().clone(),
        name,
        a.mesh().clone(),
        a.mapping(),
        a.is_on_device(),
        D::ZERO,
    );
    let sa = a.slice();
    if dst.is_on_device() {
        let queue = a.queue().clone();
        queue.parallel_fill(dst.slice_mut(), |i| D::of(sa[i].as_f64()));
    } else {
        for (i, d) in dst.slice_mut().iter_mut().enumerate() {
            *d = D::of(sa[i].as_f64());
        }
    }
    Ok(dst)
}

/// NaN 判定：dst = 1（NaN 处）/ 0
pub fn field_is_nan<A: Scalar, D: Scalar>(name: &str, a: &Field<A>) -> MfResult<Field<D>> {
    let mut dst = Field::<D>::new(
        a.queue().clone(),
        name,
        a.mesh().clone(),
        a.mapping(),
        a.is_on_device(),
        D::ZERO,
    );
    let sa = a.slice();
    let queue = a.queue().clone();
    queue.parallel_fill(dst.slice_mut(), |i| {
        if sa[i].is_nan() {
            D::ONE
        } else {
            D::ZERO
        }
    });
    Ok(dst)
}
