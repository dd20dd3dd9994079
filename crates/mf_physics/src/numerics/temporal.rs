// crates/mf_physics/src/numerics/temporal.rs

//! 单元时间导数装配
//!
//! 把面通量散度、床坡源项、墙力、流量/水位边界与 Manning 摩阻
//! 组合成 dU⁄dt。水位边界以一个内步长内完全松弛的 Dirichlet
//! 覆盖实现，并丢弃该单元的流量贡献。

use crate::GRAVITY;
use mf_mesh::FieldVector;
use mf_runtime::Scalar;

/// 当前同步区间的时间窗口
#[derive(Debug, Clone, Copy)]
pub struct BoundaryWindow {
    /// 当前时刻
    pub time_now: f64,
    /// 当前步长
    pub timestep: f64,
    /// 区间起点（边界采样 0 的时刻）
    pub t0: f64,
    /// 区间终点（边界采样 1 的时刻）
    pub t1: f64,
}

/// 装配全部单元的 dU⁄dt
#[allow(clippy::too_many_arguments)]
pub fn calculate<T: Scalar>(
    u: &FieldVector<T, 3>,
    zbed: &FieldVector<T, 3>,
    manning: &FieldVector<T, 4>,
    q_in: &FieldVector<T, 2>,
    h_in: &FieldVector<T, 2>,
    flux: &FieldVector<T, 4>,
    dudt: &mut FieldVector<T, 3>,
    window: &BoundaryWindow,
) {
    let mesh = u.mesh().clone();
    let queue = u.queue().clone();
    let cs = mesh.cell_size();
    let dx = T::of(cs.x);
    let dy = T::of(cs.y);
    let g = T::of(GRAVITY);

    let time_now = T::of(window.time_now);
    let timestep = T::of(window.timestep);
    let bdy_t0 = T::of(window.t0);
    let bdy_t1 = T::of(window.t1);

    let h_a = u.at(0).slice();
    let u_a = u.at(1).slice();
    let v_a = u.at(2).slice();
    let dzdx_a = zbed.at(1).slice();
    let dzdy_a = zbed.at(2).slice();
    let n0_a = manning.at(0).slice();
    let h0_a = manning.at(1).slice();
    let n1_a = manning.at(2).slice();
    let h1_a = manning.at(3).slice();
    let q0_a = q_in.at(0).slice();
    let q1_a = q_in.at(1).slice();
    let hb0_a = h_in.at(0).slice();
    let hb1_a = h_in.at(1).slice();
    let fh_a = flux.at(0).slice();
    let fu_a = flux.at(1).slice();
    let fv_a = flux.at(2).slice();
    let fw_a = flux.at(3).slice();

    let [out_h, out_u, out_v] = dudt.slices_mut();

    queue.parallel_zip3(out_h, out_u, out_v, |cid, dh_out, du_out, dv_out| {
        let index = mesh.cell_index(cid);
        let [fid_w, fid_e, fid_s, fid_n] = mesh.faces_around_cell(index);

        let h = h_a[cid];
        let uu = u_a[cid];
        let vv = v_a[cid];

        // 通量散度
        let mut dhdt = (fh_a[fid_w] - fh_a[fid_e]) / dx + (fh_a[fid_s] - fh_a[fid_n]) / dy;
        let mut dudt_c = (fu_a[fid_w] - fu_a[fid_e]) / dx + (fu_a[fid_s] - fu_a[fid_n]) / dy;
        let mut dvdt_c = (fv_a[fid_w] - fv_a[fid_e]) / dx + (fv_a[fid_s] - fv_a[fid_n]) / dy;

        // 床坡源项：水平力的模不超过本单元可用水深
        let mut dzdx = dzdx_a[cid];
        if dzdx.abs() > h / dx {
            dzdx = dzdx.sgn() * h / dx;
        }
        let mut dzdy = dzdy_a[cid];
        if dzdy.abs() > h / dy {
            dzdy = dzdy.sgn() * h / dy;
        }
        let mut dudt_bed = -g * dzdx;
        let mut dvdt_bed = -g * dzdy;

        // 面上竖直墙的反力，按湿墙高度截断
        if fw_a[fid_w] < T::ZERO {
            dudt_bed += -g * fw_a[fid_w].max(-h) / dx;
        }
        if fw_a[fid_e] > T::ZERO {
            dudt_bed += -g * fw_a[fid_e].min(h) / dx;
        }
        if fw_a[fid_s] < T::ZERO {
            dvdt_bed += -g * fw_a[fid_s].max(-h) / dy;
        }
        if fw_a[fid_n] > T::ZERO {
            dvdt_bed += -g * fw_a[fid_n].min(h) / dy;
        }
        dudt_c += dudt_bed;
        dvdt_c += dvdt_bed;

        // 流量边界：区间内线性插值，按梯形取本步平均
        let dhdt_source;
        {
            let q_0 = q0_a[cid];
            let q_1 = q1_a[cid];
            let dq_dt = (q_1 - q_0) / (bdy_t1 - bdy_t0);
            let q_now = q_0 + (time_now - bdy_t0) * dq_dt;
            let q_next = q_now + timestep * dq_dt;
            dhdt_source = T::HALF * (q_now + q_next) / (dx * dy);
        }

        // 水位边界：h⁰ < 0 表示此处无水位边界
        let h_boundary;
        {
            let h_0 = hb0_a[cid];
            if h_0 < T::ZERO {
                h_boundary = -T::ONE;
            } else {
                let h_1 = hb1_a[cid];
                let dh_dt = (h_1 - h_0) / (bdy_t1 - bdy_t0);
                let h_now = h_0 + (time_now - bdy_t0) * dh_dt;
                let h_next = h_now + timestep * dh_dt;
                h_boundary = T::HALF * (h_now + h_next);
            }
        }

        if h_boundary >= T::ZERO {
            // Dirichlet 覆盖：一个内步长内恰好松弛到目标水深
            dhdt = h_boundary - h;
        } else {
            dhdt += dhdt_source;
        }

        // Manning 糙率在两档之间随水深平滑过渡
        let manning_n = T::mix(
            n0_a[cid],
            n1_a[cid],
            T::smoothstep(h0_a[cid], h1_a[cid], h),
        );

        // 摩阻坡降，h → 0 时用 h/(h²+10⁻³) 正则化
        let mut sf = T::ZERO;
        if h > T::of(1e-6) {
            let inv_h = h / (h * h + T::of(1e-3));
            sf = manning_n
                * manning_n
                * (uu * uu + vv * vv).sqrt()
                * inv_h.powf(T::of(1.333_333));
        }

        // 摩阻不得把水推过半步速度估计
        let u_estimate = uu + dudt_c * T::HALF * timestep;
        let mut dudt_f = g * sf * uu;
        if dudt_f.sgn() == u_estimate.sgn() && dudt_f.abs() > u_estimate.abs() {
            dudt_f = u_estimate;
        } else if dudt_f.sgn() == u_estimate.sgn() {
            dudt_f = T::ZERO;
        }
        dudt_c -= dudt_f;

        let v_estimate = vv + dvdt_c * T::HALF * timestep;
        let mut dvdt_f = g * sf * vv;
        if dvdt_f.sgn() == v_estimate.sgn() && dvdt_f.abs() > v_estimate.abs() {
            dvdt_f = v_estimate;
        } else if dvdt_f.sgn() == v_estimate.sgn() {
            dvdt_f = T::ZERO;
        }
        dvdt_c -= dvdt_f;

        *dh_out = dhdt;
        *du_out = dudt_c;
        *dv_out = dvdt_c;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::R;
    use mf_mesh::{Cartesian2dMesh, Mapping};
    use mf_runtime::DeviceQueue;
    use std::sync::Arc;

    struct Rig {
        u: FieldVector<R, 3>,
        zbed: FieldVector<R, 3>,
        manning: FieldVector<R, 4>,
        q_in: FieldVector<R, 2>,
        h_in: FieldVector<R, 2>,
        flux: FieldVector<R, 4>,
        dudt: FieldVector<R, 3>,
    }

    fn rig(nx: usize, ny: usize, dx: f64) -> Rig {
        let q = Arc::new(DeviceQueue::default_device().unwrap());
        let m = Arc::new(Cartesian2dMesh::new(
            nx,
            ny,
            glam::DVec2::ZERO,
            glam::DVec2::new(dx, dx),
        ));
        let u = FieldVector::new(q.clone(), ["h", "u", "v"], m.clone(), Mapping::Cell, true, 0.0);
        Rig {
            zbed: FieldVector::new(
                q.clone(),
                ["zb", "dzb⁄dx", "dzb⁄dy"],
                m.clone(),
                Mapping::Cell,
                true,
                0.0,
            ),
            manning: FieldVector::new(
                q.clone(),
                ["manning_n0", "manning_h0", "manning_n1", "manning_h1"],
                m.clone(),
                Mapping::Cell,
                true,
                0.0,
            ),
            q_in: FieldVector::new(
                q.clone(),
                ["Q_in_0", "Q_in_1"],
                m.clone(),
                Mapping::Cell,
                true,
                0.0,
            ),
            h_in: FieldVector::new(
                q.clone(),
                ["h_in_0", "h_in_1"],
                m.clone(),
                Mapping::Cell,
                true,
                -1.0,
            ),
            flux: FieldVector::new(
                q,
                ["mass", "xmom", "ymom", "wall"],
                m,
                Mapping::Face,
                true,
                0.0,
            ),
            dudt: FieldVector::derived("(d", &u, "⁄dt)"),
            u,
        }
    }

    fn window(dt: f64) -> BoundaryWindow {
        BoundaryWindow {
            time_now: 0.0,
            timestep: dt,
            t0: 0.0,
            t1: 10.0,
        }
    }

    fn run(r: &mut Rig, w: &BoundaryWindow) {
        calculate(
            &r.u, &r.zbed, &r.manning, &r.q_in, &r.h_in, &r.flux, &mut r.dudt, w,
        );
    }

    #[test]
    fn test_quiescent_is_steady() {
        let mut r = rig(3, 3, 1.0);
        r.u.at_mut(0).slice_mut().fill(1.0);
        run(&mut r, &window(0.1));
        assert!(r.dudt.at(0).slice().iter().all(|&v| v == 0.0));
        assert!(r.dudt.at(1).slice().iter().all(|&v| v == 0.0));
        assert!(r.dudt.at(2).slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_flux_divergence() {
        let mut r = rig(1, 1, 2.0);
        r.u.at_mut(0).slice_mut().fill(1.0);
        // 单单元：西面进 0.6，东面出 0.2 → dh/dt = (0.6−0.2)/2
        let [w, e, _s, _n] = r.u.mesh().faces_around_cell([0, 0]);
        r.flux.at_mut(0).slice_mut()[w] = 0.6;
        r.flux.at_mut(0).slice_mut()[e] = 0.2;
        run(&mut r, &window(0.1));
        assert!((r.dudt.at(0).slice()[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_inflow_trapezoidal_average() {
        let mut r = rig(1, 1, 10.0);
        r.u.at_mut(0).slice_mut().fill(0.0);
        // Q 从 0 线性升到 1（t1 = 10）；t = 0 起步长 2 → 平均 Q = 0.1
        r.q_in.at_mut(1).slice_mut()[0] = 1.0;
        let w = BoundaryWindow {
            time_now: 0.0,
            timestep: 2.0,
            t0: 0.0,
            t1: 10.0,
        };
        run(&mut r, &w);
        assert!((r.dudt.at(0).slice()[0] - 0.1 / 100.0).abs() < 1e-7);
    }

    #[test]
    fn test_stage_boundary_overrides_inflow() {
        let mut r = rig(1, 1, 1.0);
        r.u.at_mut(0).slice_mut().fill(0.2);
        r.q_in.at_mut(0).slice_mut()[0] = 5.0;
        r.q_in.at_mut(1).slice_mut()[0] = 5.0;
        r.h_in.at_mut(0).slice_mut()[0] = 0.5;
        r.h_in.at_mut(1).slice_mut()[0] = 0.5;
        run(&mut r, &window(0.1));
        // dh/dt = h_target − h，流量贡献被丢弃
        assert!((r.dudt.at(0).slice()[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_no_stage_boundary_when_negative() {
        let mut r = rig(1, 1, 1.0);
        r.u.at_mut(0).slice_mut().fill(0.2);
        run(&mut r, &window(0.1));
        assert_eq!(r.dudt.at(0).slice()[0], 0.0);
    }

    #[test]
    fn test_bed_slope_clamped_by_depth() {
        let mut r = rig(1, 1, 1.0);
        r.u.at_mut(0).slice_mut().fill(0.01);
        // 名义坡度 1，远超 h/dx = 0.01 → 截断
        r.zbed.at_mut(1).slice_mut()[0] = 1.0;
        run(&mut r, &window(0.1));
        let expected = -(GRAVITY as R) * 0.01;
        assert!((r.dudt.at(1).slice()[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_wall_force_pushes_back() {
        let mut r = rig(1, 1, 1.0);
        r.u.at_mut(0).slice_mut().fill(0.5);
        let [_w, e, _s, _n] = r.u.mesh().faces_around_cell([0, 0]);
        // 东面墙抬高 2：湿墙部分只有 h = 0.5
        r.flux.at_mut(3).slice_mut()[e] = 2.0;
        run(&mut r, &window(0.1));
        let expected = -(GRAVITY as R) * 0.5;
        assert!((r.dudt.at(1).slice()[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_friction_overshoot_stops_flow() {
        let mut r = rig(1, 1, 1.0);
        // 浅水高糙率：摩阻会超过半步估计，应被钳到估计值
        r.u.at_mut(0).slice_mut().fill(0.01);
        r.u.at_mut(1).slice_mut().fill(0.5);
        r.manning.at_mut(0).slice_mut().fill(10.0);
        r.manning.at_mut(2).slice_mut().fill(10.0);
        run(&mut r, &window(0.1));
        // dudt = −u_estimate = −u（此处无其他加速度）
        assert!((r.dudt.at(1).slice()[0] + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_friction_mild_zeroed_by_guard() {
        let mut r = rig(1, 1, 1.0);
        // 深水低糙率：摩阻未超过估计，按护栏分支归零
        r.u.at_mut(0).slice_mut().fill(2.0);
        r.u.at_mut(1).slice_mut().fill(0.5);
        r.manning.at_mut(0).slice_mut().fill(0.01);
        r.manning.at_mut(2).slice_mut().fill(0.01);
        run(&mut r, &window(0.1));
        assert_eq!(r.dudt.at(1).slice()[0], 0.0);
    }

    #[test]
    fn test_inactive_cell_propagates_nan() {
        let mut r = rig(1, 1, 1.0);
        r.u.at_mut(0).slice_mut().fill(R::NAN);
        r.u.at_mut(1).slice_mut().fill(R::NAN);
        r.u.at_mut(2).slice_mut().fill(R::NAN);
        run(&mut r, &window(0.1));
        assert!(r.dudt.at(0).slice()[0].is_nan());
    }
}
