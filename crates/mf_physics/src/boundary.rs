// crates/mf_physics/src/boundary.rs

//! 边界条件
//!
//! 两类：source（向单元注入流量 Q）与 depth（规定水位 h）。
//! 每个边界条件持有选择集、函子与修改器参数；每个同步区间开始时
//! 求解器先复位边界场，再按配置顺序逐个写入区间端点的两份采样。
//! 同一单元被多个边界条件命中时，后写者胜。

use crate::forcing::{modify_field, FieldFunctor, FieldModifier, ModifyOp};
use crate::solver::SvSolver;
use mf_runtime::{MfError, MfResult};

/// 边界变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryVariable {
    /// 流量 [m³/s]
    Flow,
    /// 水位（水深）[m]
    Stage,
}

impl BoundaryVariable {
    /// 配置键 → 变量
    pub fn from_name(name: &str) -> MfResult<Self> {
        match name {
            "source" => Ok(Self::Flow),
            "depth" => Ok(Self::Stage),
            other => Err(MfError::configuration(format!(
                "未知的边界条件类型: '{}'",
                other
            ))),
        }
    }
}

/// 边界条件
pub struct BoundaryCondition {
    name: String,
    variable: BoundaryVariable,
    modifier: FieldModifier,
    functor: FieldFunctor,
}

impl BoundaryCondition {
    /// 创建边界条件
    pub fn new(
        name: impl Into<String>,
        variable: BoundaryVariable,
        modifier: FieldModifier,
        functor: FieldFunctor,
    ) -> Self {
        Self {
            name: name.into(),
            variable,
            modifier,
            functor,
        }
    }

    /// 边界条件名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 作用变量
    pub fn variable(&self) -> BoundaryVariable {
        self.variable
    }

    /// 把区间端点 (t0, t1) 的函子值写入对应边界场的两个采样槽
    pub fn update(&self, solver: &mut SvSolver, t0: f64, t1: f64) -> MfResult<()> {
        tracing::debug!(boundary = %self.name, t0, t1, "更新边界条件");
        let target = match self.variable {
            BoundaryVariable::Flow => solver.q_in_mut(),
            BoundaryVariable::Stage => solver.h_in_mut(),
        };
        let (slot0, slot1) = target.at2_mut(0, 1);
        modify_field(&self.modifier, ModifyOp::Set, &self.functor, t0, slot0)?;
        modify_field(&self.modifier, ModifyOp::Set, &self.functor, t1, slot1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::TimeSeries;
    use mf_mesh::{Cartesian2dMesh, Mapping, MeshSelection};
    use mf_runtime::DeviceQueue;
    use std::sync::Arc;

    fn solver(nx: usize) -> SvSolver {
        let q = Arc::new(DeviceQueue::default_device().unwrap());
        let m = Arc::new(Cartesian2dMesh::new(
            nx,
            1,
            glam::DVec2::ZERO,
            glam::DVec2::ONE,
        ));
        SvSolver::new(q, m)
    }

    #[test]
    fn test_source_boundary_writes_both_slots() {
        let mut s = solver(4);
        let sel = MeshSelection::from_ids(
            s.queue().clone(),
            s.mesh().clone(),
            Mapping::Cell,
            vec![1, 2],
        )
        .unwrap();
        let ts = Arc::new(TimeSeries::new(vec![0.0, 10.0], vec![0.0, 1.0]).unwrap());
        let bc = BoundaryCondition::new(
            "inflow",
            BoundaryVariable::Flow,
            FieldModifier::passthrough("inflow", sel),
            FieldFunctor::Series(ts),
        );
        s.clear_boundary_conditions().unwrap();
        bc.update(&mut s, 2.0, 6.0).unwrap();
        assert!((s.q_in().at(0).slice()[1] - 0.2).abs() < 1e-6);
        assert!((s.q_in().at(1).slice()[2] - 0.6).abs() < 1e-6);
        // 未选中的单元保持复位值
        assert_eq!(s.q_in().at(0).slice()[0], 0.0);
        assert_eq!(s.h_in().at(0).slice()[0], -1.0);
    }

    #[test]
    fn test_depth_boundary_targets_h_in() {
        let mut s = solver(3);
        let sel = MeshSelection::from_ids(
            s.queue().clone(),
            s.mesh().clone(),
            Mapping::Cell,
            vec![0],
        )
        .unwrap();
        let bc = BoundaryCondition::new(
            "west stage",
            BoundaryVariable::Stage,
            FieldModifier::passthrough("west stage", sel),
            FieldFunctor::Fixed(0.5),
        );
        s.clear_boundary_conditions().unwrap();
        bc.update(&mut s, 0.0, 1.0).unwrap();
        assert_eq!(s.h_in().at(0).slice()[0], 0.5);
        assert_eq!(s.h_in().at(1).slice()[0], 0.5);
        assert_eq!(s.h_in().at(0).slice()[1], -1.0);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut s = solver(2);
        let sel = |ids: Vec<u64>| {
            MeshSelection::from_ids(s.queue().clone(), s.mesh().clone(), Mapping::Cell, ids)
                .unwrap()
        };
        let a = BoundaryCondition::new(
            "first",
            BoundaryVariable::Flow,
            FieldModifier::passthrough("first", sel(vec![0])),
            FieldFunctor::Fixed(1.0),
        );
        let b = BoundaryCondition::new(
            "second",
            BoundaryVariable::Flow,
            FieldModifier::passthrough("second", sel(vec![0])),
            FieldFunctor::Fixed(2.0),
        );
        s.clear_boundary_conditions().unwrap();
        a.update(&mut s, 0.0, 1.0).unwrap();
        b.update(&mut s, 0.0, 1.0).unwrap();
        assert_eq!(s.q_in().at(0).slice()[0], 2.0);
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(
            BoundaryVariable::from_name("source").unwrap(),
            BoundaryVariable::Flow
        );
        assert_eq!(
            BoundaryVariable::from_name("depth").unwrap(),
            BoundaryVariable::Stage
        );
        assert!(BoundaryVariable::from_name("open").is_err());
    }
}
