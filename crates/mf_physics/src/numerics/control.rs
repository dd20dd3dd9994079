// crates/mf_physics/src/numerics/control.rs

//! 控制数
//!
//! `Co = Δt · max_c[(|u|+c)/dx + (|v|+c)/dy]`，`c = √(g·max(h,0))`。
//! 并行最大值归约；停用单元（NaN）不参与，结果读回宿主。

use crate::GRAVITY;
use mf_mesh::FieldVector;
use mf_runtime::Scalar;

/// 计算解状态的最大控制数
pub fn control_number<T: Scalar>(u: &FieldVector<T, 3>, timestep: f64) -> f64 {
    let queue = u.queue().clone();
    let cs = u.mesh().cell_size();
    let dx = cs.x;
    let dy = cs.y;

    let h_a = u.at(0).slice();
    let u_a = u.at(1).slice();
    let v_a = u.at(2).slice();

    queue.max_reduce(u.len(), |cid| {
        let h = h_a[cid].as_f64().max(0.0);
        let uu = u_a[cid].as_f64().abs();
        let vv = v_a[cid].as_f64().abs();
        let c = (GRAVITY * h).sqrt();
        timestep * ((uu + c) / dx + (vv + c) / dy)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::R;
    use mf_mesh::{Cartesian2dMesh, Mapping};
    use mf_runtime::DeviceQueue;
    use std::sync::Arc;

    fn state(nx: usize, dx: f64) -> FieldVector<R, 3> {
        let q = Arc::new(DeviceQueue::default_device().unwrap());
        let m = Arc::new(Cartesian2dMesh::new(
            nx,
            1,
            glam::DVec2::ZERO,
            glam::DVec2::new(dx, dx),
        ));
        FieldVector::new(q, ["h", "u", "v"], m, Mapping::Cell, true, 0.0)
    }

    #[test]
    fn test_dry_state_zero() {
        let u = state(10, 1.0);
        assert_eq!(control_number(&u, 0.1), 0.0);
    }

    #[test]
    fn test_known_value() {
        let mut u = state(4, 2.0);
        u.at_mut(0).slice_mut()[1] = 1.0;
        u.at_mut(1).slice_mut()[1] = 0.5;
        let c = (GRAVITY * 1.0_f64).sqrt();
        let expected = 0.1 * ((0.5 + c) / 2.0 + c / 2.0);
        assert!((control_number(&u, 0.1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_inactive_cells_ignored() {
        let mut u = state(4, 1.0);
        u.at_mut(0).slice_mut()[0] = R::NAN;
        u.at_mut(1).slice_mut()[0] = R::NAN;
        u.at_mut(0).slice_mut()[2] = 0.25;
        let with_nan = control_number(&u, 1.0);
        let c = (GRAVITY * 0.25_f64).sqrt();
        assert!((with_nan - 2.0 * c).abs() < 1e-6);
    }

    #[test]
    fn test_scales_with_timestep() {
        let mut u = state(4, 1.0);
        u.at_mut(0).slice_mut().fill(1.0);
        let co1 = control_number(&u, 0.1);
        let co2 = control_number(&u, 0.2);
        assert!((co2 - 2.0 * co1).abs() < 1e-9);
    }
}
