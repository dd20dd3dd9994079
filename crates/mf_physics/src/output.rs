// crates/mf_physics/src/output.rs

//! 命名输出函数
//!
//! 把求解器内部场物化成带几何的列表数据，交给 I/O 层序列化。
//! 列在创建时拷贝到宿主向量，与后续步进解耦。

use crate::R;
use glam::DVec2;
use mf_mesh::{Cartesian2dMesh, Field, Mapping};
use std::sync::Arc;

/// 输出函数：名称 + 映射 + 若干值列
#[derive(Debug, Clone)]
pub struct OutputFunction {
    name: String,
    mapping: Mapping,
    mesh: Arc<Cartesian2dMesh>,
    columns: Vec<Vec<R>>,
}

impl OutputFunction {
    /// 由场列表物化
    pub fn from_fields(name: impl Into<String>, fields: &[&Field<R>]) -> Self {
        let first = fields[0];
        Self {
            name: name.into(),
            mapping: first.mapping(),
            mesh: first.mesh().clone(),
            columns: fields.iter().map(|f| f.slice().to_vec()).collect(),
        }
    }

    /// 由已物化的列创建
    pub fn from_columns(
        name: impl Into<String>,
        mapping: Mapping,
        mesh: Arc<Cartesian2dMesh>,
        columns: Vec<Vec<R>>,
    ) -> Self {
        Self {
            name: name.into(),
            mapping,
            mesh,
            columns,
        }
    }

    /// 输出函数名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 对象映射
    pub fn mapping(&self) -> Mapping {
        self.mapping
    }

    /// 行数（对象数）
    pub fn size(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 第 i 个对象的坐标
    pub fn coordinate(&self, i: usize) -> DVec2 {
        self.mesh.object_coordinate(self.mapping, i)
    }

    /// 第 i 个对象的 WKT 几何
    pub fn wkt(&self, i: usize) -> String {
        self.mesh.object_wkt(self.mapping, i)
    }

    /// 第 i 个对象的各列取值
    pub fn values(&self, i: usize) -> Vec<R> {
        self.columns.iter().map(|c| c[i]).collect()
    }
}
