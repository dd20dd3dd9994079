// crates/mf_physics/src/forcing/generator.rs

//! 场生成
//!
//! 一个场的配置块是有序的修改步列表（set / offset / factor 各配一个
//! 函子），按配置顺序依次施加。配置解析在上层完成，这里消费已
//! 解析的步骤。

use super::functor::FieldFunctor;
use super::modifier::{modify_field, FieldModifier, ModifyOp};
use mf_mesh::Field;
use mf_runtime::{MfResult, Scalar};

/// 一个修改步：操作 + 修改器参数 + 函子
#[derive(Debug)]
pub struct ModifierStep {
    /// 写入操作
    pub op: ModifyOp,
    /// 修改器参数
    pub modifier: FieldModifier,
    /// 值函子
    pub functor: FieldFunctor,
}

/// 依次施加修改步
pub fn apply_steps<T: Scalar>(
    field: &mut Field<T>,
    steps: &[ModifierStep],
    time: f64,
) -> MfResult<()> {
    for step in steps {
        tracing::debug!(
            field = field.name(),
            op = ?step.op,
            functor = step.functor.kind_name(),
            "施加场修改步"
        );
        modify_field(&step.modifier, step.op, &step.functor, time, field)?;
    }
    Ok(())
}
