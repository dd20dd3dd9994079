// crates/mf_mesh/src/selection.rs

//! 网格对象选择集
//!
//! 全局选择不存列表；显式选择存排序去重后的索引数组并搬移到设备。
//! gis 选择消费几何集合：点/多点取最近对象，多边形按扫描线取内部
//! 单元；洞不受支持；反选仅允许单个多边形。

use crate::cartesian::{Cartesian2dMesh, Mapping};
use crate::geometry::{Geometry, GeometryCollection, Polygon};
use glam::DVec2;
use mf_runtime::{DataArray, DeviceQueue, MfError, MfResult};
use std::sync::Arc;

/// 网格对象选择集
#[derive(Debug, Clone)]
pub struct MeshSelection {
    mesh: Arc<Cartesian2dMesh>,
    mapping: Mapping,
    list: Option<DataArray<u64>>,
}

impl MeshSelection {
    /// 全局选择（整个映射）
    pub fn global(mesh: Arc<Cartesian2dMesh>, mapping: Mapping) -> Self {
        Self {
            mesh,
            mapping,
            list: None,
        }
    }

    fn allocate(
        queue: Arc<DeviceQueue>,
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        mut ids: Vec<u64>,
    ) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let mut list = DataArray::from_vec(queue, ids);
        list.move_to_device();
        Self {
            mesh,
            mapping,
            list: Some(list),
        }
    }

    /// 由显式 id 列表创建；越界 id 报配置错误
    pub fn from_ids(
        queue: Arc<DeviceQueue>,
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        ids: Vec<u64>,
    ) -> MfResult<Self> {
        let idmax = mesh.object_count(mapping) as u64;
        for &id in &ids {
            if id >= idmax {
                return Err(MfError::configuration(format!(
                    "选择的 id {} 超出网格（{} 共 {} 个对象）",
                    id, mapping, idmax
                )));
            }
        }
        Ok(Self::allocate(queue, mesh, mapping, ids))
    }

    /// 由坐标列表创建，逐点取最近对象
    pub fn from_locations(
        queue: Arc<DeviceQueue>,
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        locations: &[DVec2],
    ) -> MfResult<Self> {
        let ids = locations
            .iter()
            .map(|&loc| mesh.nearest_object(mapping, loc) as u64)
            .collect();
        Ok(Self::allocate(queue, mesh, mapping, ids))
    }

    fn polygon_ids(
        mesh: &Cartesian2dMesh,
        mapping: Mapping,
        poly: &Polygon,
        inverted: bool,
        ids: &mut Vec<u64>,
    ) -> MfResult<()> {
        if mapping != Mapping::Cell {
            return Err(MfError::unsupported_geometry(format!(
                "多边形选择仅支持单元映射，给定 {}",
                mapping
            )));
        }
        if poly.ring_count() != 1 {
            return Err(MfError::unsupported_geometry("不支持带洞的多边形"));
        }
        mesh.for_each_cell_in_polygon(poly, inverted, |id| ids.push(id as u64));
        Ok(())
    }

    /// 由几何集合创建（gis 选择）
    pub fn from_geometry(
        queue: Arc<DeviceQueue>,
        mesh: Arc<Cartesian2dMesh>,
        mapping: Mapping,
        gc: &GeometryCollection,
        inverted: bool,
    ) -> MfResult<Self> {
        let mut ids: Vec<u64> = Vec::new();

        if inverted {
            // 反选只对恰好一个多边形有意义（允许套一层单元素多多边形）
            let poly = match gc.as_slice() {
                [Geometry::Polygon(p)] => p,
                [Geometry::MultiPolygon(polys)] if polys.len() == 1 => &polys[0],
                [Geometry::MultiPolygon(_)] => {
                    return Err(MfError::invalid_inversion(
                        "多多边形包含多个多边形时无法反选",
                    ))
                }
                _ => return Err(MfError::invalid_inversion("只能对单个多边形反选")),
            };
            Self::polygon_ids(&mesh, mapping, poly, true, &mut ids)?;
        } else {
            for geom in gc {
                match geom {
                    Geometry::Point(p) => {
                        ids.push(mesh.nearest_object(mapping, p.coord()) as u64);
                    }
                    Geometry::MultiPoint(pts) => {
                        for p in pts {
                            ids.push(mesh.nearest_object(mapping, p.coord()) as u64);
                        }
                    }
                    Geometry::Polygon(poly) => {
                        Self::polygon_ids(&mesh, mapping, poly, false, &mut ids)?;
                    }
                    Geometry::MultiPolygon(polys) => {
                        for poly in polys {
                            Self::polygon_ids(&mesh, mapping, poly, false, &mut ids)?;
                        }
                    }
                    other => {
                        return Err(MfError::unsupported_geometry(format!(
                            "选择不支持 {} 几何",
                            other.type_name()
                        )));
                    }
                }
            }
        }

        Ok(Self::allocate(queue, mesh, mapping, ids))
    }

    /// 是否为全局选择
    pub fn is_global(&self) -> bool {
        self.list.is_none()
    }

    /// 选中对象个数；全局选择返回映射的对象总数
    pub fn size(&self) -> usize {
        match &self.list {
            Some(list) => list.len(),
            None => self.mesh.object_count(self.mapping),
        }
    }

    /// 对象映射
    pub fn mapping(&self) -> Mapping {
        self.mapping
    }

    /// 所属网格
    pub fn mesh(&self) -> &Arc<Cartesian2dMesh> {
        &self.mesh
    }

    /// 索引列表（全局选择为 None）
    pub fn ids(&self) -> Option<&[u64]> {
        self.list.as_ref().map(|l| l.slice())
    }
}
