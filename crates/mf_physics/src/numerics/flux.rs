// crates/mf_physics/src/numerics/flux.rs

//! 面通量
//!
//! 每个面由两侧单元的重构状态求数值通量 (mass, xmom, ymom) 与
//! 墙基准 (wall = z⁺ − z⁻)。三种流态：
//!
//! - 全淹没：中心通量 + Rusanov 耗散；
//! - 全干：零通量；
//! - 台阶部分淹没：取高床一侧的单侧通量。
//!
//! 两侧都停用（床高 NaN）的面恒为零通量；恰有一侧停用或位于网格
//! 边缘的面按墙边处理：镜像活侧构造虚单元，并把虚侧床抬高
//! `1.1·h` 保证反射。

use crate::GRAVITY;
use mf_mesh::FieldVector;
use mf_runtime::Scalar;

/// 计算全部面的数值通量
pub fn calculate<T: Scalar>(
    u: &FieldVector<T, 3>,
    zbed: &FieldVector<T, 3>,
    dudx: &FieldVector<T, 3>,
    dudy: &FieldVector<T, 3>,
    flux: &mut FieldVector<T, 4>,
) {
    let mesh = u.mesh().clone();
    let queue = u.queue().clone();

    let cs = mesh.cell_size();
    let dx = T::of(cs.x);
    let dy = T::of(cs.y);
    let cell_count = mesh.cell_count();
    let [nx, ny] = mesh.cell_index_size();
    let vertical_faces = (nx + 1) * ny;
    let g = T::of(GRAVITY);

    let h_a = u.at(0).slice();
    let u_a = u.at(1).slice();
    let v_a = u.at(2).slice();
    let zb_a = zbed.at(0).slice();
    let dzdx_a = zbed.at(1).slice();
    let dzdy_a = zbed.at(2).slice();
    let dhdx_a = dudx.at(0).slice();
    let dudx_a = dudx.at(1).slice();
    let dvdx_a = dudx.at(2).slice();
    let dhdy_a = dudy.at(0).slice();
    let dudy_a = dudy.at(1).slice();
    let dvdy_a = dudy.at(2).slice();

    let [f_h, f_u, f_v, f_w] = flux.slices_mut();

    queue.parallel_zip4(f_h, f_u, f_v, f_w, |fid, out_h, out_u, out_v, out_w| {
        // 相邻单元与边缘标记：-1 表示左/下侧为虚，+1 表示右/上侧为虚
        let adjacent = mesh.cells_around_face(fid);
        let mut edge: i32 = 0;
        let (mut lhs, mut rhs);
        if adjacent[0] < cell_count {
            lhs = adjacent[0];
            if adjacent[1] < cell_count {
                rhs = adjacent[1];
            } else {
                rhs = lhs;
                edge = 1;
            }
        } else {
            rhs = adjacent[1];
            lhs = rhs;
            edge = -1;
        }

        // 面的流向因子
        let xdir = if fid < vertical_faces { T::ONE } else { T::ZERO };
        let ydir = T::ONE - xdir;
        let is_x = xdir == T::ONE;

        // 床高 NaN = 单元停用，按墙边处理；双侧停用则零通量
        let mut zb_l = zb_a[lhs];
        let mut zb_r = zb_a[rhs];
        if zb_l.is_nan() {
            lhs = rhs;
            edge = -1;
            if zb_r.is_nan() {
                *out_h = T::ZERO;
                *out_u = T::ZERO;
                *out_v = T::ZERO;
                *out_w = T::ZERO;
                return;
            }
        } else if zb_r.is_nan() {
            rhs = lhs;
            edge = 1;
        }

        let ghost_l = edge < 0;
        let ghost_r = edge > 0;
        let pick = |ghost: bool, value: T| if ghost { T::ZERO } else { value };

        // 水深与速度：虚侧水深归零；沿面流向的速度在虚侧归零
        let h_l = pick(ghost_l, h_a[lhs]);
        let h_r = pick(ghost_r, h_a[rhs]);
        let u_l = pick(ghost_l && is_x, u_a[lhs]);
        let u_r = pick(ghost_r && is_x, u_a[rhs]);
        let v_l = pick(ghost_l && !is_x, v_a[lhs]);
        let v_r = pick(ghost_r && !is_x, v_a[rhs]);

        // 斜率的虚侧归零规则与上同
        let dhdx_l = pick(ghost_l, dhdx_a[lhs]);
        let dhdx_r = pick(ghost_r, dhdx_a[rhs]);
        let dhdy_l = pick(ghost_l, dhdy_a[lhs]);
        let dhdy_r = pick(ghost_r, dhdy_a[rhs]);

        let dudx_l = pick(ghost_l && is_x, dudx_a[lhs]);
        let dudx_r = pick(ghost_r && is_x, dudx_a[rhs]);
        let dudy_l = pick(ghost_l && is_x, dudy_a[lhs]);
        let dudy_r = pick(ghost_r && is_x, dudy_a[rhs]);

        let dvdx_l = pick(ghost_l && !is_x, dvdx_a[lhs]);
        let dvdx_r = pick(ghost_r && !is_x, dvdx_a[rhs]);
        let dvdy_l = pick(ghost_l && !is_x, dvdy_a[lhs]);
        let dvdy_r = pick(ghost_r && !is_x, dvdy_a[rhs]);

        let dzdx_l = pick(ghost_l, dzdx_a[lhs]);
        let dzdx_r = pick(ghost_r, dzdx_a[rhs]);
        let dzdy_l = pick(ghost_l, dzdy_a[lhs]);
        let dzdy_r = pick(ghost_r, dzdy_a[rhs]);

        // 虚侧床抬到活侧水面之上，构成反射墙
        let lift = T::of(1.1);
        if ghost_l {
            zb_l = zb_r + h_r * lift;
        }
        if ghost_r {
            zb_r = zb_l + h_l * lift;
        }

        // 半单元投影到面（m = 上游侧，p = 下游侧）
        let half = T::HALF;
        let z_m = zb_l + half * dx * dzdx_l * xdir + half * dy * dzdy_l * ydir;
        let z_p = zb_r - half * dx * dzdx_r * xdir - half * dy * dzdy_r * ydir;

        let mut h_m = h_l + half * dx * dhdx_l * xdir + half * dy * dhdy_l * ydir;
        let mut h_p = h_r - half * dx * dhdx_r * xdir - half * dy * dhdy_r * ydir;

        let u_m = u_l + half * dx * dudx_l * xdir + half * dy * dudy_l * ydir;
        let u_p = u_r - half * dx * dudx_r * xdir - half * dy * dudy_r * ydir;

        let v_m = v_l + half * dx * dvdx_l * xdir + half * dy * dvdy_l * ydir;
        let v_p = v_r - half * dx * dvdx_r * xdir - half * dy * dvdy_r * ydir;

        let z_f = z_m.max(z_p);

        h_m = h_m.max(T::ZERO);
        h_p = h_p.max(T::ZERO);

        let y_m = z_m + h_m;
        let y_p = z_p + h_p;

        let c_m = (g * h_m).sqrt();
        let c_p = (g * h_p).sqrt();

        let (hh, hu, hv);
        if y_m > z_f || y_p > z_f {
            // 全淹没：中心通量 + Rusanov 耗散
            let spd_m = u_m * xdir + v_m * ydir;
            let spd_p = u_p * xdir + v_p * ydir;

            let fh_m = h_m * spd_m;
            let fh_p = h_p * spd_p;
            let fu_m = u_m * ((T::ONE - half * xdir) * spd_m) + g * h_m * xdir;
            let fu_p = u_p * ((T::ONE - half * xdir) * spd_p) + g * h_p * xdir;
            let fv_m = v_m * ((T::ONE - half * ydir) * spd_m) + g * h_m * ydir;
            let fv_p = v_p * ((T::ONE - half * ydir) * spd_p) + g * h_p * ydir;

            let a = (spd_p + spd_p.sgn() * c_p)
                .abs()
                .max((spd_m + spd_m.sgn() * c_m).abs());

            hh = half * (fh_p + fh_m) - half * a * (h_p - h_m);
            hu = half * (fu_p + fu_m) - half * a * (u_p - u_m);
            hv = half * (fv_p + fv_m) - half * a * (v_p - v_m);
        } else if h_m <= T::ZERO && h_p <= T::ZERO {
            // 全干
            hh = T::ZERO;
            hu = T::ZERO;
            hv = T::ZERO;
        } else if z_m > z_p {
            // 部分淹没台阶：上游侧高床，取上游单侧通量
            let spd = u_m * xdir + v_m * ydir;
            let fh = h_m * spd;
            let fu = u_m * (half * spd) + g * h_m * xdir;
            let fv = v_m * (half * spd) + g * h_m * ydir;
            let a = (spd + spd.sgn() * c_m).abs();
            hh = fh - half * a * -h_m;
            hu = fu - half * a * -u_m;
            hv = fv - half * a * -v_m;
        } else {
            let spd = u_p * xdir + v_p * ydir;
            let fh = h_p * spd;
            let fu = u_p * (half * spd) + g * h_p * xdir;
            let fv = v_p * (half * spd) + g * h_p * ydir;
            let a = (spd + spd.sgn() * c_p).abs();
            hh = fh - half * a * h_p;
            hu = fu - half * a * u_p;
            hv = fv - half * a * v_p;
        }

        *out_h = hh;
        *out_u = hu;
        *out_v = hv;
        *out_w = z_p - z_m;
    });
}
