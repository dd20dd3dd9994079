// crates/mf_physics/src/solver.rs

//! Saint-Venant 求解器状态
//!
//! 持有常量场（地形三元组、糙率四元组）、内核暂存（斜率、面通量）
//! 与边界双采样场，并把 重构 → 通量 → 时间导数 串成 dU⁄dt 装配。
//! 初始状态与配置驱动的装配在上层完成。

use crate::forcing::{modify_field, FieldFunctor, FieldModifier, ModifyOp};
use crate::numerics::temporal::BoundaryWindow;
use crate::numerics::{control, flux, reconstruction, temporal};
use crate::output::OutputFunction;
use crate::{R, THETA};
use mf_mesh::ops::{field_is_nan, field_sum};
use mf_mesh::{Cartesian2dMesh, Field, FieldVector, Mapping, MeshSelection};
use mf_runtime::Scalar;
use mf_runtime::{DeviceQueue, MfError, MfResult};
use std::sync::Arc;

/// Saint-Venant 求解器
pub struct SvSolver {
    queue: Arc<DeviceQueue>,
    mesh: Arc<Cartesian2dMesh>,

    // 常量场
    zbed: FieldVector<R, 3>,
    manning: FieldVector<R, 4>,

    // 内核暂存
    dudx: FieldVector<R, 3>,
    dudy: FieldVector<R, 3>,
    flux: FieldVector<R, 4>,

    // 边界双采样
    q_in: FieldVector<R, 2>,
    h_in: FieldVector<R, 2>,
}

impl SvSolver {
    /// 创建求解器并分配全部内部场
    pub fn new(queue: Arc<DeviceQueue>, mesh: Arc<Cartesian2dMesh>) -> Self {
        let cell = Mapping::Cell;
        let zbed = FieldVector::new(
            queue.clone(),
            ["zb", "dzb⁄dx", "dzb⁄dy"],
            mesh.clone(),
            cell,
            true,
            0.0,
        );
        let manning = FieldVector::new(
            queue.clone(),
            ["manning_n0", "manning_h0", "manning_n1", "manning_h1"],
            mesh.clone(),
            cell,
            true,
            0.0,
        );
        let dudx = FieldVector::new(
            queue.clone(),
            ["dh⁄dx", "du⁄dx", "dv⁄dx"],
            mesh.clone(),
            cell,
            true,
            0.0,
        );
        let dudy = FieldVector::new(
            queue.clone(),
            ["dh⁄dy", "du⁄dy", "dv⁄dy"],
            mesh.clone(),
            cell,
            true,
            0.0,
        );
        let flux = FieldVector::new(
            queue.clone(),
            ["mass", "xmom", "ymom", "wall"],
            mesh.clone(),
            Mapping::Face,
            true,
            0.0,
        );
        let q_in = FieldVector::new(
            queue.clone(),
            ["Q_in_0", "Q_in_1"],
            mesh.clone(),
            cell,
            true,
            0.0,
        );
        let h_in = FieldVector::new(
            queue.clone(),
            ["h_in_0", "h_in_1"],
            mesh.clone(),
            cell,
            true,
            -1.0,
        );

        tracing::info!(
            cells = mesh.cell_count(),
            faces = mesh.face_count(),
            "求解器已初始化"
        );

        Self {
            queue,
            mesh,
            zbed,
            manning,
            dudx,
            dudy,
            flux,
            q_in,
            h_in,
        }
    }

    /// 计算队列
    pub fn queue(&self) -> &Arc<DeviceQueue> {
        &self.queue
    }

    /// 网格
    pub fn mesh(&self) -> &Arc<Cartesian2dMesh> {
        &self.mesh
    }

    /// 地形三元组 (zb, dzb⁄dx, dzb⁄dy)
    pub fn zbed(&self) -> &FieldVector<R, 3> {
        &self.zbed
    }

    /// 地形三元组（可写，供装配期生成）
    pub fn zbed_mut(&mut self) -> &mut FieldVector<R, 3> {
        &mut self.zbed
    }

    /// 糙率四元组
    pub fn manning(&self) -> &FieldVector<R, 4> {
        &self.manning
    }

    /// 糙率四元组（可写）
    pub fn manning_mut(&mut self) -> &mut FieldVector<R, 4> {
        &mut self.manning
    }

    /// 流量边界双采样
    pub fn q_in(&self) -> &FieldVector<R, 2> {
        &self.q_in
    }

    /// 流量边界双采样（可写）
    pub fn q_in_mut(&mut self) -> &mut FieldVector<R, 2> {
        &mut self.q_in
    }

    /// 水位边界双采样
    pub fn h_in(&self) -> &FieldVector<R, 2> {
        &self.h_in
    }

    /// 水位边界双采样（可写）
    pub fn h_in_mut(&mut self) -> &mut FieldVector<R, 2> {
        &mut self.h_in
    }

    /// 新建零初值解状态 (h, u, v)
    pub fn new_state(&self) -> FieldVector<R, 3> {
        FieldVector::new(
            self.queue.clone(),
            ["h", "u", "v"],
            self.mesh.clone(),
            Mapping::Cell,
            true,
            0.0,
        )
    }

    /// 复位边界场：Q_in := 0，h_in := −1
    pub fn clear_boundary_conditions(&mut self) -> MfResult<()> {
        let modifier = FieldModifier::passthrough(
            "clear boundaries",
            MeshSelection::global(self.mesh.clone(), Mapping::Cell),
        );
        let qfunc = FieldFunctor::Fixed(0.0);
        let hfunc = FieldFunctor::Fixed(-1.0);
        modify_field(&modifier, ModifyOp::Set, &qfunc, 0.0, self.q_in.at_mut(0))?;
        modify_field(&modifier, ModifyOp::Set, &qfunc, 0.0, self.q_in.at_mut(1))?;
        modify_field(&modifier, ModifyOp::Set, &hfunc, 0.0, self.h_in.at_mut(0))?;
        modify_field(&modifier, ModifyOp::Set, &hfunc, 0.0, self.h_in.at_mut(1))?;
        Ok(())
    }

    /// 装配 dU⁄dt：重构 → 面通量 → 时间导数
    pub fn update_ddt(
        &mut self,
        u: &FieldVector<R, 3>,
        dudt: &mut FieldVector<R, 3>,
        time_now: f64,
        timestep: f64,
        bdy_t0: f64,
        bdy_t1: f64,
    ) {
        reconstruction::calculate(u, &mut self.dudx, &mut self.dudy, R::of(THETA));
        flux::calculate(u, &self.zbed, &self.dudx, &self.dudy, &mut self.flux);
        temporal::calculate(
            u,
            &self.zbed,
            &self.manning,
            &self.q_in,
            &self.h_in,
            &self.flux,
            dudt,
            &BoundaryWindow {
                time_now,
                timestep,
                t0: bdy_t0,
                t1: bdy_t1,
            },
        );
    }

    /// 解状态的最大控制数
    pub fn control_number(&self, u: &FieldVector<R, 3>, timestep: f64) -> f64 {
        control::control_number(u, timestep)
    }

    /// 活动单元的总水量 Σ h·dx·dy（诊断用）
    pub fn total_volume(&self, u: &FieldVector<R, 3>) -> f64 {
        let cs = self.mesh.cell_size();
        let area = cs.x * cs.y;
        let h = u.at(0).slice();
        self.queue.sum_reduce(h.len(), |i| {
            let v = h[i].as_f64();
            if v.is_finite() {
                v * area
            } else {
                0.0
            }
        })
    }

    /// 按名称构造输出函数
    pub fn output_function(
        &self,
        name: &str,
        u: &FieldVector<R, 3>,
    ) -> MfResult<OutputFunction> {
        match name {
            "depth" => Ok(OutputFunction::from_fields("depth", &[u.at(0)])),
            "stage" => {
                let stage: Field<R> = field_sum("stage", self.zbed.at(0), u.at(0))?;
                Ok(OutputFunction::from_fields(
                    "stage",
                    &[&stage, self.zbed.at(0), u.at(0)],
                ))
            }
            "component velocity" => Ok(OutputFunction::from_fields(
                "component velocity",
                &[u.at(1), u.at(2)],
            )),
            "huv" => Ok(OutputFunction::from_fields(
                "huv",
                &[u.at(0), u.at(1), u.at(2)],
            )),
            "active cells" => {
                let active: Field<R> = field_is_nan("active cells", self.zbed.at(0))?;
                Ok(OutputFunction::from_fields("active cells", &[&active]))
            }
            "debug boundaries" => Ok(OutputFunction::from_fields(
                "debug boundaries",
                &[
                    self.q_in.at(0),
                    self.q_in.at(1),
                    self.h_in.at(0),
                    self.h_in.at(1),
                ],
            )),
            "debug slopes" => Ok(OutputFunction::from_fields(
                "debug slopes",
                &[
                    self.dudx.at(0),
                    self.dudx.at(1),
                    self.dudx.at(2),
                    self.dudy.at(0),
                    self.dudy.at(1),
                    self.dudy.at(2),
                ],
            )),
            "debug fluxes" => Ok(OutputFunction::from_fields(
                "debug fluxes",
                &[
                    self.flux.at(0),
                    self.flux.at(1),
                    self.flux.at(2),
                    self.flux.at(3),
                ],
            )),
            other => Err(MfError::configuration(format!(
                "未知的输出函数: '{}'",
                other
            ))),
        }
    }
}
