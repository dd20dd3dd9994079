// crates/mf_mesh/src/vector.rs

//! 同映射场的 N 元组
//!
//! 用于打包解状态 U = (h, u, v)、地形 (zb, dzb⁄dx, dzb⁄dy)、
//! 糙率四元组、面通量 (mass, xmom, ymom, wall) 与边界双采样。

use crate::cartesian::{Cartesian2dMesh, Mapping};
use crate::field::Field;
use mf_runtime::{DeviceQueue, MfError, MfResult, Scalar};
use std::sync::Arc;

/// 场向量：N 个同网格、同映射的场
#[derive(Debug, Clone)]
pub struct FieldVector<T: Scalar, const N: usize> {
    fields: [Field<T>; N],
}

impl<T: Scalar, const N: usize> FieldVector<T, N> {
    /// 创建 N 个同初值的场
    pub fn new(
        queue: Arc<DeviceQueue>,
        names: [&str; N],
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        on_device: bool,
        init: T,
    ) -> Self {
        let fields = names.map(|name| {
            Field::new(
                Arc::clone(&queue),
                name,
                Arc::clone(&mesh),
                mapping,
                on_device,
                init,
            )
        });
        Self { fields }
    }

    /// 从既有场组装；网格与映射必须一致
    pub fn from_fields(fields: [Field<T>; N]) -> MfResult<Self> {
        if N > 0 {
            let mapping = fields[0].mapping();
            let mesh = fields[0].mesh().clone();
            for f in &fields[1..] {
                if f.mapping() != mapping || f.mesh().as_ref() != mesh.as_ref() {
                    return Err(MfError::invalid_combination(format!(
                        "场向量分量 '{}' 的网格或映射不一致",
                        f.name()
                    )));
                }
            }
        }
        Ok(Self { fields })
    }

    /// 以既有向量为模板派生新向量，分量名为 `prefix + 原名 + suffix`
    pub fn derived(prefix: &str, base: &FieldVector<T, N>, suffix: &str) -> Self {
        let fields = std::array::from_fn(|i| {
            let b = &base.fields[i];
            Field::new(
                Arc::clone(b.queue()),
                format!("{}{}{}", prefix, b.name(), suffix),
                Arc::clone(b.mesh()),
                b.mapping(),
                b.is_on_device(),
                T::ZERO,
            )
        });
        Self { fields }
    }

    /// 分量
    pub fn at(&self, i: usize) -> &Field<T> {
        &self.fields[i]
    }

    /// 分量（可写）
    pub fn at_mut(&mut self, i: usize) -> &mut Field<T> {
        &mut self.fields[i]
    }

    /// 全部分量
    pub fn fields(&self) -> &[Field<T>; N] {
        &self.fields
    }

    /// 各分量的只读切片
    pub fn slices(&self) -> [&[T]; N] {
        std::array::from_fn(|i| self.fields[i].slice())
    }

    /// 各分量的可写切片（内核同时写多个分量时使用）
    pub fn slices_mut(&mut self) -> [&mut [T]; N] {
        self.fields.each_mut().map(|f| f.slice_mut())
    }

    /// 拆出两个分量的可写借用
    pub fn at2_mut(&mut self, i: usize, j: usize) -> (&mut Field<T>, &mut Field<T>) {
        assert!(i != j && i < N && j < N);
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let (a, b) = self.fields.split_at_mut(hi);
        if i < j {
            (&mut a[lo], &mut b[0])
        } else {
            (&mut b[0], &mut a[lo])
        }
    }

    /// 分量名列表
    pub fn names(&self) -> [&str; N] {
        std::array::from_fn(|i| self.fields[i].name())
    }

    /// 单分量长度
    pub fn len(&self) -> usize {
        if N == 0 {
            0
        } else {
            self.fields[0].len()
        }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 对象映射
    pub fn mapping(&self) -> Mapping {
        self.fields[0].mapping()
    }

    /// 所属网格
    pub fn mesh(&self) -> &Arc<Cartesian2dMesh> {
        self.fields[0].mesh()
    }

    /// 所属队列
    pub fn queue(&self) -> &Arc<DeviceQueue> {
        self.fields[0].queue()
    }

    /// 与另一向量交换存储（接受步的核心操作）
    pub fn swap_with(&mut self, other: &mut FieldVector<T, N>) {
        for i in 0..N {
            std::mem::swap(&mut self.fields[i], &mut other.fields[i]);
        }
    }

    /// 全部搬移到设备
    pub fn move_to_device(&mut self) {
        for f in &mut self.fields {
            f.move_to_device();
        }
    }

    /// 全部搬移到宿主
    pub fn move_to_host(&mut self) {
        for f in &mut self.fields {
            f.move_to_host();
        }
    }
}
