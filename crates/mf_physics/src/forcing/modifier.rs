// crates/mf_physics/src/forcing/modifier.rs

//! 场修改器
//!
//! 对全场或选择集内的对象施加
//! `op(existing, clamp(offset + factor·v, min, max))`，
//! `op ∈ {set, add, multiply}`。函子给出 NaN 或 nodata 的位置保持
//! 原值不动。取样方式为形心点或对象脚印上的箱式归约。

use super::functor::FieldFunctor;
use crate::R;
use glam::DVec2;
use mf_mesh::{Field, MeshSelection};
use mf_runtime::{MfError, MfResult, Scalar};

/// 写入操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOp {
    /// 覆盖
    Set,
    /// 累加
    Add,
    /// 累乘
    Multiply,
}

impl ModifyOp {
    #[inline]
    fn apply(self, existing: f64, value: f64) -> f64 {
        match self {
            ModifyOp::Set => value,
            ModifyOp::Add => existing + value,
            ModifyOp::Multiply => existing * value,
        }
    }

    /// 配置键 → 操作
    pub fn from_name(name: &str) -> MfResult<Self> {
        match name {
            "set" => Ok(Self::Set),
            "offset" => Ok(Self::Add),
            "factor" => Ok(Self::Multiply),
            other => Err(MfError::configuration(format!(
                "未知的场修改操作: '{}'",
                other
            ))),
        }
    }
}

/// 取样方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationType {
    /// 对象形心处点求值
    Centroid,
    /// 对象脚印上的箱式归约
    Box,
}

/// 场修改器参数
#[derive(Debug, Clone)]
pub struct FieldModifier {
    name: String,
    selection: MeshSelection,
    offset: f64,
    factor: f64,
    min: f64,
    max: f64,
    nodata: f64,
    integration: IntegrationType,
    box_size: DVec2,
}

impl FieldModifier {
    /// 创建修改器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        selection: MeshSelection,
        offset: f64,
        factor: f64,
        min: f64,
        max: f64,
        nodata: f64,
    ) -> Self {
        let box_size = {
            let cs = selection.mesh().cell_size();
            DVec2::new(cs.x, cs.y)
        };
        Self {
            name: name.into(),
            selection,
            offset,
            factor,
            min,
            max,
            nodata,
            integration: IntegrationType::Centroid,
            box_size,
        }
    }

    /// 边界条件与内部复位使用的默认参数（无截断、nodata 取最小值）
    pub fn passthrough(name: impl Into<String>, selection: MeshSelection) -> Self {
        Self::new(name, selection, 0.0, 1.0, f64::MIN, f64::MAX, f64::MIN)
    }

    /// 切换为箱式取样；`box_size` 为 None 时用网格单元尺寸
    pub fn with_box_integration(mut self, box_size: Option<DVec2>) -> Self {
        self.integration = IntegrationType::Box;
        if let Some(bs) = box_size {
            self.box_size = bs;
        }
        self
    }

    /// 修改器名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 选择集
    pub fn selection(&self) -> &MeshSelection {
        &self.selection
    }

    /// 取样方式
    pub fn integration(&self) -> IntegrationType {
        self.integration
    }

    /// 计算对象 `i` 处经截断的写入值；跳过处返回 NaN
    fn value_at(&self, functor: &FieldFunctor, time: f64, i: usize) -> f64 {
        let mesh = self.selection.mesh();
        let coord = mesh.object_coordinate(self.selection.mapping(), i);
        let raw = match self.integration {
            IntegrationType::Centroid => functor.evaluate(time, coord, self.nodata),
            IntegrationType::Box => functor.evaluate_box(time, coord, self.box_size, self.nodata),
        };
        if raw.is_nan() || raw == self.nodata {
            return f64::NAN;
        }
        (self.offset + self.factor * raw).clamp(self.min, self.max)
    }
}

/// 将函子经修改器施加到场上
pub fn modify_field<T: Scalar>(
    modifier: &FieldModifier,
    op: ModifyOp,
    functor: &FieldFunctor,
    time: f64,
    field: &mut Field<T>,
) -> MfResult<()> {
    if modifier.selection.mapping() != field.mapping() {
        return Err(MfError::invalid_combination(format!(
            "修改器 '{}' 的选择集映射 {} 与场 '{}' 的映射 {} 不一致",
            modifier.name,
            modifier.selection.mapping(),
            field.name(),
            field.mapping()
        )));
    }
    if modifier.selection.mesh().as_ref() != field.mesh().as_ref() {
        return Err(MfError::invalid_combination(format!(
            "修改器 '{}' 与场 '{}' 属于不同网格",
            modifier.name,
            field.name()
        )));
    }

    if functor.is_host_only() {
        // 宿主专属函子：搬回宿主串行求值，完成后恢复驻留
        let was_on_device = field.is_on_device();
        field.move_to_host();
        {
            let data = field.slice_mut();
            match modifier.selection.ids() {
                None => {
                    for (i, x) in data.iter_mut().enumerate() {
                        let value = modifier.value_at(functor, time, i);
                        if !value.is_nan() {
                            *x = T::of(op.apply(x.as_f64(), value));
                        }
                    }
                }
                Some(ids) => {
                    for &id in ids {
                        let i = id as usize;
                        let value = modifier.value_at(functor, time, i);
                        if !value.is_nan() {
                            data[i] = T::of(op.apply(data[i].as_f64(), value));
                        }
                    }
                }
            }
        }
        if was_on_device {
            field.move_to_device();
        }
        return Ok(());
    }

    let queue = field.queue().clone();
    // 选择集取过 ids 的克隆以避开对 field 的双重借用
    let selection = modifier.selection.clone();
    let data = field.slice_mut();
    match selection.ids() {
        None => {
            queue.parallel_update(data, |i, x| {
                let value = modifier.value_at(functor, time, i);
                if !value.is_nan() {
                    *x = T::of(op.apply(x.as_f64(), value));
                }
            });
        }
        Some(ids) => {
            queue.parallel_update(data, |i, x| {
                if ids.binary_search(&(i as u64)).is_ok() {
                    let value = modifier.value_at(functor, time, i);
                    if !value.is_nan() {
                        *x = T::of(op.apply(x.as_f64(), value));
                    }
                }
            });
        }
    }
    Ok(())
}

/// 把选择集内的对象置为 NaN（停用子域）
pub fn set_field_nan(selection: &MeshSelection, field: &mut Field<R>) -> MfResult<()> {
    if selection.mapping() != field.mapping() {
        return Err(MfError::invalid_combination(format!(
            "停用选择集映射 {} 与场 '{}' 的映射 {} 不一致",
            selection.mapping(),
            field.name(),
            field.mapping()
        )));
    }
    let queue = field.queue().clone();
    let data = field.slice_mut();
    match selection.ids() {
        None => {
            queue.parallel_update(data, |_i, x| *x = R::NAN);
        }
        Some(ids) => {
            queue.parallel_update(data, |i, x| {
                if ids.binary_search(&(i as u64)).is_ok() {
                    *x = R::NAN;
                }
            });
        }
    }
    Ok(())
}
