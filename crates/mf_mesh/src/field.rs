// crates/mf_mesh/src/field.rs

//! 网格映射稠密场
//!
//! 场 = 命名的数据数组 + 所属网格 + 对象映射。长度恒等于该映射的
//! 对象总数。驻留语义继承自 [`DataArray`]。

use crate::cartesian::{Cartesian2dMesh, Mapping};
use mf_runtime::{DataArray, DeviceQueue, Scalar};
use std::sync::Arc;

/// 网格映射场
#[derive(Debug, Clone)]
pub struct Field<T: Scalar> {
    name: String,
    mapping: Mapping,
    mesh: Arc<Cartesian2dMesh>,
    data: DataArray<T>,
}

impl<T: Scalar> Field<T> {
    /// 创建场并填充初值
    pub fn new(
        queue: Arc<DeviceQueue>,
        name: impl Into<String>,
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        on_device: bool,
        init: T,
    ) -> Self {
        let len = mesh.object_count(mapping);
        Self {
            name: name.into(),
            mapping,
            mesh,
            data: DataArray::new(queue, len, init, on_device),
        }
    }

    /// 逻辑名（用于日志与输出）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 重命名
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 对象映射
    pub fn mapping(&self) -> Mapping {
        self.mapping
    }

    /// 所属网格
    pub fn mesh(&self) -> &Arc<Cartesian2dMesh> {
        &self.mesh
    }

    /// 元素个数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 当前是否驻留设备
    pub fn is_on_device(&self) -> bool {
        self.data.is_on_device()
    }

    /// 搬移到设备
    pub fn move_to_device(&mut self) {
        self.data.move_to_device();
    }

    /// 搬移到宿主
    pub fn move_to_host(&mut self) {
        self.data.move_to_host();
    }

    /// 只读切片（当前驻留侧）
    pub fn slice(&self) -> &[T] {
        self.data.slice()
    }

    /// 可写切片（当前驻留侧）
    pub fn slice_mut(&mut self) -> &mut [T] {
        self.data.slice_mut()
    }

    /// 所属队列
    pub fn queue(&self) -> &Arc<DeviceQueue> {
        self.data.queue()
    }

    /// 底层数组
    pub fn data(&self) -> &DataArray<T> {
        &self.data
    }

    /// 底层数组（可写）
    pub fn data_mut(&mut self) -> &mut DataArray<T> {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn setup() -> (Arc<DeviceQueue>, Arc<Cartesian2dMesh>) {
        let q = Arc::new(DeviceQueue::default_device().unwrap());
        let m = Arc::new(Cartesian2dMesh::new(4, 3, DVec2::ZERO, DVec2::ONE));
        (q, m)
    }

    #[test]
    fn test_field_length_follows_mapping() {
        let (q, m) = setup();
        let c = Field::<f32>::new(q.clone(), "h", m.clone(), Mapping::Cell, true, 0.0);
        let f = Field::<f32>::new(q.clone(), "mass", m.clone(), Mapping::Face, true, 0.0);
        let v = Field::<f32>::new(q, "z", m.clone(), Mapping::Vertex, true, 0.0);
        assert_eq!(c.len(), 12);
        assert_eq!(f.len(), m.face_count());
        assert_eq!(v.len(), 20);
    }

    #[test]
    fn test_residency_moves() {
        let (q, m) = setup();
        let mut field = Field::<f32>::new(q, "h", m, Mapping::Cell, false, 1.5);
        assert!(!field.is_on_device());
        field.move_to_device();
        assert!(field.is_on_device());
        assert!(field.slice().iter().all(|&v| v == 1.5));
    }
}
