// crates/mf_mesh/src/lib.rs

//! mflow 网格层
//!
//! - [`cartesian`]: 均匀二维笛卡尔网格（单元/面/顶点，纯算术邻接）
//! - [`geometry`]: 矢量几何与 WKT 读写
//! - [`selection`]: 网格对象选择集（全局 / id 列表 / 坐标列表 / gis）
//! - [`field`]: 网格映射稠密场
//! - [`vector`]: 同映射场的 N 元组
//! - [`ops`]: 场算术（和/差/积/商/类型转换/NaN 判定）

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cartesian;
pub mod field;
pub mod geometry;
pub mod ops;
pub mod selection;
pub mod vector;

pub use cartesian::{Cartesian2dMesh, Mapping};
pub use field::Field;
pub use geometry::{Geometry, GeometryCollection, LineString, Point, Polygon};
pub use selection::MeshSelection;
pub use vector::FieldVector;
