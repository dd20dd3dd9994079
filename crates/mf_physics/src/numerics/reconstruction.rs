// crates/mf_physics/src/numerics/reconstruction.rs

//! θ-minmod 限制的线性重构
//!
//! 每个单元、每个分量计算
//! `minmod3(θ(Uc−Uw)/dx, θ(Ue−Uc)/dx, ½(Ue−Uw)/dx)`（y 向同理），
//! θ = 2。网格边缘缺失的邻居视同中心单元；邻居为 NaN（停用单元）
//! 时同样以中心值代入，不让有限斜率跨过停用边界。

use mf_mesh::FieldVector;
use mf_runtime::Scalar;

/// 三参数 minmod
#[inline]
pub fn minmod3<T: Scalar>(a: T, b: T, c: T) -> T {
    let mm = T::HALF * (a.sgn() + b.sgn()) * a.abs().min(b.abs());
    T::HALF * (mm.sgn() + c.sgn()) * mm.abs().min(c.abs())
}

/// 计算全部分量的 x/y 向斜率
pub fn calculate<T: Scalar, const N: usize>(
    u: &FieldVector<T, N>,
    dudx: &mut FieldVector<T, N>,
    dudy: &mut FieldVector<T, N>,
    theta: T,
) {
    let mesh = u.mesh().clone();
    let queue = u.queue().clone();
    let [nx, ny] = mesh.cell_index_size();
    let cs = mesh.cell_size();
    let dx = T::of(cs.x);
    let dy = T::of(cs.y);

    for k in 0..N {
        let uk = u.at(k).slice();

        let neighbours = |cid: usize| {
            let idx = mesh.cell_index(cid);
            let uc = uk[cid];
            let sub = |v: T| if v.is_nan() { uc } else { v };
            let uw = if idx[0] > 0 { sub(uk[cid - 1]) } else { uc };
            let ue = if idx[0] + 1 < nx { sub(uk[cid + 1]) } else { uc };
            let us = if idx[1] > 0 { sub(uk[cid - nx]) } else { uc };
            let un = if idx[1] + 1 < ny { sub(uk[cid + nx]) } else { uc };
            (uc, uw, ue, us, un)
        };

        queue.parallel_fill(dudx.at_mut(k).slice_mut(), |cid| {
            let (uc, uw, ue, _us, _un) = neighbours(cid);
            minmod3(
                theta * (uc - uw) / dx,
                theta * (ue - uc) / dx,
                T::HALF * (ue - uw) / dx,
            )
        });

        queue.parallel_fill(dudy.at_mut(k).slice_mut(), |cid| {
            let (uc, _uw, _ue, us, un) = neighbours(cid);
            minmod3(
                theta * (uc - us) / dy,
                theta * (un - uc) / dy,
                T::HALF * (un - us) / dy,
            )
        });
    }
}
