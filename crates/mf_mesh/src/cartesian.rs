// crates/mf_mesh/src/cartesian.rs

//! 均匀二维笛卡尔网格
//!
//! 对象编号约定：
//!
//! - 单元按行主序，`cid = iy·nx + ix`；
//! - 面先竖直后水平：`fid < (nx+1)·ny` 为竖直面（左右相邻单元），
//!   其余为水平面（下上相邻单元）；
//! - 顶点按行主序，`vid = iy·(nx+1) + ix`。
//!
//! 邻接全部由算术给出，不存连接表。边界面缺失的邻居以
//! `face_count` 作哨兵。

use crate::geometry::Polygon;
use glam::DVec2;

/// 场映射的对象种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mapping {
    /// 单元中心
    Cell,
    /// 面中点
    Face,
    /// 顶点
    Vertex,
}

impl std::fmt::Display for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mapping::Cell => write!(f, "cell"),
            Mapping::Face => write!(f, "face"),
            Mapping::Vertex => write!(f, "vertex"),
        }
    }
}

/// 均匀二维笛卡尔网格
#[derive(Debug, Clone, PartialEq)]
pub struct Cartesian2dMesh {
    ncells: [usize; 2],
    origin: DVec2,
    cell_size: DVec2,
}

impl Cartesian2dMesh {
    /// 创建网格
    pub fn new(nx: usize, ny: usize, origin: DVec2, cell_size: DVec2) -> Self {
        Self {
            ncells: [nx, ny],
            origin,
            cell_size,
        }
    }

    /// 单元数 (nx, ny)
    pub fn cell_index_size(&self) -> [usize; 2] {
        self.ncells
    }

    /// 网格原点（左下角）
    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    /// 单元尺寸 (dx, dy)
    pub fn cell_size(&self) -> DVec2 {
        self.cell_size
    }

    /// 给定映射的对象总数
    pub fn object_count(&self, mapping: Mapping) -> usize {
        let [nx, ny] = self.ncells;
        match mapping {
            Mapping::Cell => nx * ny,
            Mapping::Face => (nx + 1) * ny + nx * (ny + 1),
            Mapping::Vertex => (nx + 1) * (ny + 1),
        }
    }

    /// 单元总数
    pub fn cell_count(&self) -> usize {
        self.object_count(Mapping::Cell)
    }

    /// 面总数
    pub fn face_count(&self) -> usize {
        self.object_count(Mapping::Face)
    }

    /// 顶点总数
    pub fn vertex_count(&self) -> usize {
        self.object_count(Mapping::Vertex)
    }

    /// 竖直面个数
    #[inline]
    fn vertical_face_count(&self) -> usize {
        (self.ncells[0] + 1) * self.ncells[1]
    }

    /// 线性单元号 → (ix, iy)
    #[inline]
    pub fn cell_index(&self, cid: usize) -> [usize; 2] {
        [cid % self.ncells[0], cid / self.ncells[0]]
    }

    /// (ix, iy) → 线性单元号
    #[inline]
    pub fn cell_linear_id(&self, index: [usize; 2]) -> usize {
        index[1] * self.ncells[0] + index[0]
    }

    /// 线性顶点号 → (ix, iy)
    #[inline]
    pub fn vertex_index(&self, vid: usize) -> [usize; 2] {
        [vid % (self.ncells[0] + 1), vid / (self.ncells[0] + 1)]
    }

    /// 单元中心坐标
    pub fn cell_centre(&self, index: [usize; 2]) -> DVec2 {
        DVec2::new(
            self.origin.x + (index[0] as f64 + 0.5) * self.cell_size.x,
            self.origin.y + (index[1] as f64 + 0.5) * self.cell_size.y,
        )
    }

    /// 面中点坐标
    pub fn face_centre(&self, fid: usize) -> DVec2 {
        let [nx, _ny] = self.ncells;
        if fid < self.vertical_face_count() {
            let fy = fid / (nx + 1);
            let fx = fid % (nx + 1);
            DVec2::new(
                self.origin.x + fx as f64 * self.cell_size.x,
                self.origin.y + (fy as f64 + 0.5) * self.cell_size.y,
            )
        } else {
            let local = fid - self.vertical_face_count();
            let fy = local / nx;
            let fx = local % nx;
            DVec2::new(
                self.origin.x + (fx as f64 + 0.5) * self.cell_size.x,
                self.origin.y + fy as f64 * self.cell_size.y,
            )
        }
    }

    /// 顶点坐标
    pub fn vertex(&self, index: [usize; 2]) -> DVec2 {
        DVec2::new(
            self.origin.x + index[0] as f64 * self.cell_size.x,
            self.origin.y + index[1] as f64 * self.cell_size.y,
        )
    }

    /// 对象坐标：单元取形心，面取中点，顶点取其本身
    pub fn object_coordinate(&self, mapping: Mapping, id: usize) -> DVec2 {
        match mapping {
            Mapping::Cell => self.cell_centre(self.cell_index(id)),
            Mapping::Face => self.face_centre(id),
            Mapping::Vertex => self.vertex(self.vertex_index(id)),
        }
    }

    /// 面两侧的单元 (lhs, rhs)；缺失侧为 `face_count` 哨兵
    ///
    /// 竖直面 lhs 在左、rhs 在右；水平面 lhs 在下、rhs 在上。
    pub fn cells_around_face(&self, fid: usize) -> [usize; 2] {
        let [nx, ny] = self.ncells;
        let sentinel = self.face_count();

        if fid < self.vertical_face_count() {
            let fy = fid / (nx + 1);
            let fx = fid % (nx + 1);
            if fx < nx {
                let rhs = self.cell_linear_id([fx, fy]);
                if fx > 0 {
                    [self.cell_linear_id([fx - 1, fy]), rhs]
                } else {
                    [sentinel, rhs]
                }
            } else {
                [self.cell_linear_id([fx - 1, fy]), sentinel]
            }
        } else {
            let local = fid - self.vertical_face_count();
            let fy = local / nx;
            let fx = local % nx;
            if fy < ny {
                let rhs = self.cell_linear_id([fx, fy]);
                if fy > 0 {
                    [self.cell_linear_id([fx, fy - 1]), rhs]
                } else {
                    [sentinel, rhs]
                }
            } else {
                [self.cell_linear_id([fx, fy - 1]), sentinel]
            }
        }
    }

    /// 面两端的顶点 (v0, v1)
    pub fn vertices_around_face(&self, fid: usize) -> [usize; 2] {
        let [nx, _ny] = self.ncells;
        if fid < self.vertical_face_count() {
            // 竖直面：南北两顶点，顶点行距恰为 nx+1
            [fid + (nx + 1), fid]
        } else {
            let local = fid - self.vertical_face_count();
            let fy = local / nx;
            let fx = local % nx;
            [fy * (nx + 1) + fx, fy * (nx + 1) + fx + 1]
        }
    }

    /// 单元四周的面，顺序固定为 (W, E, S, N)
    pub fn faces_around_cell(&self, index: [usize; 2]) -> [usize; 4] {
        let [nx, ny] = self.ncells;
        let w = index[1] * (nx + 1) + index[0];
        let e = w + 1;
        let s = (nx + 1) * ny + index[1] * nx + index[0];
        let n = s + nx;
        [w, e, s, n]
    }

    /// 单元四角的顶点，顺序固定为 (SW, SE, NW, NE)
    pub fn vertices_around_cell(&self, index: [usize; 2]) -> [usize; 4] {
        let [nx, _ny] = self.ncells;
        let sw = index[1] * (nx + 1) + index[0];
        let se = sw + 1;
        let nw = sw + (nx + 1);
        let ne = nw + 1;
        [sw, se, nw, ne]
    }

    /// 距给定位置最近的对象，截断到网格内部
    pub fn nearest_object(&self, mapping: Mapping, loc: DVec2) -> usize {
        let fx = (loc.x - self.origin.x) / self.cell_size.x;
        let fy = (loc.y - self.origin.y) / self.cell_size.y;
        let [nx, ny] = self.ncells;

        let clamp = |f: f64, n: usize| -> usize {
            if f < 0.0 {
                0
            } else {
                (f as usize).min(n - 1)
            }
        };

        match mapping {
            Mapping::Cell => self.cell_linear_id([clamp(fx, nx), clamp(fy, ny)]),
            Mapping::Vertex => {
                let vx = clamp(fx + 0.5, nx + 1);
                let vy = clamp(fy + 0.5, ny + 1);
                vy * (nx + 1) + vx
            }
            Mapping::Face => {
                // 候选：最近的竖直面与最近的水平面，取距离较小者
                let vfx = clamp(fx + 0.5, nx + 1);
                let vfy = clamp(fy, ny);
                let vfid = vfy * (nx + 1) + vfx;

                let hfx = clamp(fx, nx);
                let hfy = clamp(fy + 0.5, ny + 1);
                let hfid = self.vertical_face_count() + hfy * nx + hfx;

                let dv = self.face_centre(vfid).distance_squared(loc);
                let dh = self.face_centre(hfid).distance_squared(loc);
                if dv <= dh {
                    vfid
                } else {
                    hfid
                }
            }
        }
    }

    /// 扫描线遍历多边形内部的单元
    ///
    /// 逐行求多边形各边与扫描线的交点，排序后按奇偶规则取内部区段；
    /// `inverted` 时输出补集。交点平行于顶点时按半开 `≥`/`<` 规则计数。
    ///
    /// 仅接受单外环多边形：带洞多边形返回 `UnsupportedGeometry`
    /// 语义的错误由调用方（选择集）负责，此处只处理第一外环。
    pub fn for_each_cell_in_polygon<F>(&self, poly: &Polygon, inverted: bool, mut fn_emit: F)
    where
        F: FnMut(usize),
    {
        let ring = match poly.rings().first() {
            Some(r) if r.len() >= 3 => r,
            _ => {
                tracing::warn!("退化多边形不选择任何单元");
                return;
            }
        };

        let [nx, ny] = self.ncells;

        for yi in 0..ny {
            // 本行与各边的交点（单元坐标系的 x 值，截断取整）
            let mut nodes_xi: Vec<usize> = Vec::new();
            let pts = ring.points();
            let mut j = pts.len() - 1;
            for i in 0..pts.len() {
                let viy = (pts[i].y() - self.origin.y) / self.cell_size.y;
                let vjy = (pts[j].y() - self.origin.y) / self.cell_size.y;
                let y = yi as f64;

                if (viy < y && vjy >= y) || (vjy < y && viy >= y) {
                    let vix = (pts[i].x() - self.origin.x) / self.cell_size.x;
                    let vjx = (pts[j].x() - self.origin.x) / self.cell_size.x;
                    let x = vix + (y - viy) / (vjy - viy) * (vjx - vix);
                    // 越界交点截断到 [0, nx]，保持奇偶配对
                    let xi = if x < 0.0 { 0 } else { (x as usize).min(nx) };
                    nodes_xi.push(xi);
                }
                j = i;
            }

            if nodes_xi.is_empty() {
                if inverted {
                    for xi in 0..nx {
                        fn_emit(yi * nx + xi);
                    }
                }
                continue;
            }

            nodes_xi.sort_unstable();

            if inverted {
                for xi in 0..nx {
                    let within = nodes_xi
                        .chunks_exact(2)
                        .any(|pair| xi >= pair[0] && xi < pair[1]);
                    if !within {
                        fn_emit(yi * nx + xi);
                    }
                }
            } else {
                for pair in nodes_xi.chunks_exact(2) {
                    for xi in pair[0]..pair[1].min(nx) {
                        fn_emit(yi * nx + xi);
                    }
                }
            }
        }
    }

    /// 单元几何的 WKT（四角闭合多边形）
    pub fn cell_wkt(&self, cid: usize) -> String {
        let v = self.vertices_around_cell(self.cell_index(cid));
        let sw = self.vertex(self.vertex_index(v[0]));
        let se = self.vertex(self.vertex_index(v[1]));
        let nw = self.vertex(self.vertex_index(v[2]));
        let ne = self.vertex(self.vertex_index(v[3]));
        format!(
            "POLYGON (({} {}, {} {}, {} {}, {} {}, {} {}))",
            sw.x, sw.y, nw.x, nw.y, ne.x, ne.y, se.x, se.y, sw.x, sw.y
        )
    }

    /// 面几何的 WKT（两端点线段）
    pub fn face_wkt(&self, fid: usize) -> String {
        let v = self.vertices_around_face(fid);
        let p0 = self.vertex(self.vertex_index(v[0]));
        let p1 = self.vertex(self.vertex_index(v[1]));
        format!("LINESTRING ({} {}, {} {})", p0.x, p0.y, p1.x, p1.y)
    }

    /// 顶点几何的 WKT
    pub fn vertex_wkt(&self, vid: usize) -> String {
        let p = self.vertex(self.vertex_index(vid));
        format!("POINT ({} {})", p.x, p.y)
    }

    /// 对象几何的 WKT
    pub fn object_wkt(&self, mapping: Mapping, id: usize) -> String {
        match mapping {
            Mapping::Cell => self.cell_wkt(id),
            Mapping::Face => self.face_wkt(id),
            Mapping::Vertex => self.vertex_wkt(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LineString, Point};

    fn mesh_3x2() -> Cartesian2dMesh {
        Cartesian2dMesh::new(3, 2, DVec2::ZERO, DVec2::new(1.0, 1.0))
    }

    #[test]
    fn test_object_counts() {
        let m = mesh_3x2();
        assert_eq!(m.cell_count(), 6);
        // 竖直 4×2 + 水平 3×3
        assert_eq!(m.face_count(), 8 + 9);
        assert_eq!(m.vertex_count(), 12);
    }

    #[test]
    fn test_cell_index_roundtrip() {
        let m = mesh_3x2();
        for cid in 0..m.cell_count() {
            assert_eq!(m.cell_linear_id(m.cell_index(cid)), cid);
        }
    }

    #[test]
    fn test_faces_around_cell_order() {
        let m = mesh_3x2();
        // 单元 (1, 0)：西面 1，东面 2，南面 8+1，北面 8+1+3
        let f = m.faces_around_cell([1, 0]);
        assert_eq!(f, [1, 2, 9, 12]);
        // W/E 是竖直面，S/N 是水平面
        assert!(f[0] < 8 && f[1] < 8);
        assert!(f[2] >= 8 && f[3] >= 8);
    }

    #[test]
    fn test_cells_around_face_boundary_sentinel() {
        let m = mesh_3x2();
        let sentinel = m.face_count();
        // 第一行最左的竖直面没有左邻
        assert_eq!(m.cells_around_face(0), [sentinel, 0]);
        // 最右竖直面没有右邻
        assert_eq!(m.cells_around_face(3), [2, sentinel]);
        // 底边水平面没有下邻
        assert_eq!(m.cells_around_face(8), [sentinel, 0]);
    }

    #[test]
    fn test_face_cell_adjacency_consistency() {
        let m = mesh_3x2();
        for cid in 0..m.cell_count() {
            let idx = m.cell_index(cid);
            let [w, e, s, n] = m.faces_around_cell(idx);
            assert_eq!(m.cells_around_face(w)[1], cid);
            assert_eq!(m.cells_around_face(e)[0], cid);
            assert_eq!(m.cells_around_face(s)[1], cid);
            assert_eq!(m.cells_around_face(n)[0], cid);
        }
    }

    #[test]
    fn test_coordinates() {
        let m = Cartesian2dMesh::new(4, 4, DVec2::new(10.0, 20.0), DVec2::new(2.0, 0.5));
        assert_eq!(
            m.object_coordinate(Mapping::Cell, 0),
            DVec2::new(11.0, 20.25)
        );
        assert_eq!(m.object_coordinate(Mapping::Vertex, 0), DVec2::new(10.0, 20.0));
        // 第一个竖直面位于 x = x0，单元行中点高度
        assert_eq!(m.object_coordinate(Mapping::Face, 0), DVec2::new(10.0, 20.25));
    }

    #[test]
    fn test_nearest_object_clamps() {
        let m = mesh_3x2();
        assert_eq!(m.nearest_object(Mapping::Cell, DVec2::new(-5.0, -5.0)), 0);
        assert_eq!(
            m.nearest_object(Mapping::Cell, DVec2::new(100.0, 100.0)),
            m.cell_count() - 1
        );
        assert_eq!(m.nearest_object(Mapping::Cell, DVec2::new(1.5, 0.5)), 1);
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![LineString::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
            Point::new(x0, y0),
        ])])
    }

    #[test]
    fn test_polygon_scanline_selects_interior() {
        let m = Cartesian2dMesh::new(10, 10, DVec2::ZERO, DVec2::new(1.0, 1.0));
        let poly = square(2.0, 2.0, 5.0, 5.0);
        let mut ids = Vec::new();
        m.for_each_cell_in_polygon(&poly, false, |id| ids.push(id));
        ids.sort_unstable();
        // 行按 (viy < yi && vjy ≥ yi) 计交，故选中行 3..=5；列为半开 [2, 5)
        let mut expected = Vec::new();
        for yi in 3..=5 {
            for xi in 2..5 {
                expected.push(yi * 10 + xi);
            }
        }
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_polygon_scanline_inverted_is_complement() {
        let m = Cartesian2dMesh::new(8, 8, DVec2::ZERO, DVec2::new(1.0, 1.0));
        let poly = square(1.0, 1.0, 4.0, 4.0);
        let mut inside = Vec::new();
        let mut outside = Vec::new();
        m.for_each_cell_in_polygon(&poly, false, |id| inside.push(id));
        m.for_each_cell_in_polygon(&poly, true, |id| outside.push(id));
        inside.sort_unstable();
        outside.sort_unstable();
        let mut all: Vec<usize> = inside.iter().chain(outside.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..64).collect::<Vec<_>>());
        assert!(inside.iter().all(|id| !outside.contains(id)));
    }

    #[test]
    fn test_polygon_overhanging_mesh_is_clipped() {
        let m = Cartesian2dMesh::new(4, 4, DVec2::ZERO, DVec2::new(1.0, 1.0));
        let poly = square(-10.0, 1.0, 10.0, 3.0);
        let mut ids = Vec::new();
        m.for_each_cell_in_polygon(&poly, false, |id| ids.push(id));
        ids.sort_unstable();
        // 选中行 2..=3，整行裁剪到网格
        let expected: Vec<usize> = (0..4).map(|x| 8 + x).chain((0..4).map(|x| 12 + x)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_wkt_geometry() {
        let m = mesh_3x2();
        assert_eq!(
            m.cell_wkt(0),
            "POLYGON ((0 0, 0 1, 1 1, 1 0, 0 0))"
        );
        assert_eq!(m.vertex_wkt(0), "POINT (0 0)");
        assert!(m.face_wkt(0).starts_with("LINESTRING ("));
    }
}
