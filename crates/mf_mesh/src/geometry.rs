// crates/mf_mesh/src/geometry.rs

//! 矢量几何与 WKT 读写
//!
//! 选择集只消费点/多点/多边形/多多边形；线串保留为多边形环的
//! 载体并用于面几何输出。解析器是手写的递归下降，大小写不敏感。

use glam::DVec2;
use mf_runtime::{MfError, MfResult};

/// 二维点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point(DVec2);

impl Point {
    /// 创建点
    pub fn new(x: f64, y: f64) -> Self {
        Self(DVec2::new(x, y))
    }

    /// x 坐标
    pub fn x(&self) -> f64 {
        self.0.x
    }

    /// y 坐标
    pub fn y(&self) -> f64 {
        self.0.y
    }

    /// 坐标向量
    pub fn coord(&self) -> DVec2 {
        self.0
    }

    /// WKT 表示
    pub fn wkt(&self) -> String {
        format!("POINT ({} {})", self.0.x, self.0.y)
    }
}

/// 线串（多边形环的载体）
#[derive(Debug, Clone, PartialEq)]
pub struct LineString(Vec<Point>);

impl LineString {
    /// 创建线串
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// 顶点列表
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// 顶点个数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn wkt_body(&self) -> String {
        let parts: Vec<String> = self.0.iter().map(|p| format!("{} {}", p.x(), p.y())).collect();
        format!("({})", parts.join(", "))
    }

    /// WKT 表示
    pub fn wkt(&self) -> String {
        format!("LINESTRING {}", self.wkt_body())
    }
}

/// 多边形（外环 + 可选洞环；洞在选择集中不被支持）
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon(Vec<LineString>);

impl Polygon {
    /// 创建多边形
    pub fn new(rings: Vec<LineString>) -> Self {
        Self(rings)
    }

    /// 环列表（第一个为外环）
    pub fn rings(&self) -> &[LineString] {
        &self.0
    }

    /// 环个数
    pub fn ring_count(&self) -> usize {
        self.0.len()
    }

    /// WKT 表示
    pub fn wkt(&self) -> String {
        let rings: Vec<String> = self.0.iter().map(|r| r.wkt_body()).collect();
        format!("POLYGON ({})", rings.join(", "))
    }
}

/// 几何对象
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// 点
    Point(Point),
    /// 多点
    MultiPoint(Vec<Point>),
    /// 线串
    LineString(LineString),
    /// 多边形
    Polygon(Polygon),
    /// 多多边形
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// 几何类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "POINT",
            Geometry::MultiPoint(_) => "MULTIPOINT",
            Geometry::LineString(_) => "LINESTRING",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        }
    }
}

/// 几何集合
pub type GeometryCollection = Vec<Geometry>;

// =============================================================================
// WKT 解析
// =============================================================================

struct WktParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> WktParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn error(&self, what: &str) -> MfError {
        MfError::unsupported_geometry(format!(
            "WKT 解析失败（{}），偏移 {}: …{}",
            what,
            self.pos,
            &self.rest().chars().take(24).collect::<String>()
        ))
    }

    fn expect(&mut self, c: char) -> MfResult<()> {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("期望 '{}'", c)))
        }
    }

    fn peek_is(&mut self, c: char) -> bool {
        self.skip_ws();
        self.rest().starts_with(c)
    }

    fn keyword(&mut self) -> String {
        self.skip_ws();
        let word: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        self.pos += word.len();
        word.to_ascii_uppercase()
    }

    fn number(&mut self) -> MfResult<f64> {
        self.skip_ws();
        let tok: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
            .collect();
        if tok.is_empty() {
            return Err(self.error("期望数值"));
        }
        self.pos += tok.len();
        tok.parse::<f64>().map_err(|_| self.error("数值格式"))
    }

    fn coord(&mut self) -> MfResult<Point> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Point::new(x, y))
    }

    // (x y, x y, …)
    fn coord_list(&mut self) -> MfResult<Vec<Point>> {
        self.expect('(')?;
        let mut pts = vec![self.coord()?];
        while self.peek_is(',') {
            self.expect(',')?;
            pts.push(self.coord()?);
        }
        self.expect(')')?;
        Ok(pts)
    }

    // ((x y, …), (x y, …))
    fn ring_list(&mut self) -> MfResult<Vec<LineString>> {
        self.expect('(')?;
        let mut rings = vec![LineString::new(self.coord_list()?)];
        while self.peek_is(',') {
            self.expect(',')?;
            rings.push(LineString::new(self.coord_list()?));
        }
        self.expect(')')?;
        Ok(rings)
    }

    fn geometry(&mut self) -> MfResult<Geometry> {
        let kw = self.keyword();
        match kw.as_str() {
            "POINT" => {
                self.expect('(')?;
                let p = self.coord()?;
                self.expect(')')?;
                Ok(Geometry::Point(p))
            }
            "MULTIPOINT" => {
                // 两种记法：(1 2, 3 4) 或 ((1 2), (3 4))
                self.expect('(')?;
                let mut pts = Vec::new();
                loop {
                    if self.peek_is('(') {
                        self.expect('(')?;
                        pts.push(self.coord()?);
                        self.expect(')')?;
                    } else {
                        pts.push(self.coord()?);
                    }
                    if self.peek_is(',') {
                        self.expect(',')?;
                    } else {
                        break;
                    }
                }
                self.expect(')')?;
                Ok(Geometry::MultiPoint(pts))
            }
            "LINESTRING" => Ok(Geometry::LineString(LineString::new(self.coord_list()?))),
            "POLYGON" => Ok(Geometry::Polygon(Polygon::new(self.ring_list()?))),
            "MULTIPOLYGON" => {
                self.expect('(')?;
                let mut polys = vec![Polygon::new(self.ring_list()?)];
                while self.peek_is(',') {
                    self.expect(',')?;
                    polys.push(Polygon::new(self.ring_list()?));
                }
                self.expect(')')?;
                Ok(Geometry::MultiPolygon(polys))
            }
            other => Err(MfError::unsupported_geometry(format!(
                "不支持的 WKT 几何类型: {}",
                if other.is_empty() { "<空>" } else { other }
            ))),
        }
    }
}

/// 解析一段 WKT 文本（可含分号分隔的多个几何）为几何集合
pub fn parse_wkt_collection(src: &str) -> MfResult<GeometryCollection> {
    let mut gc = Vec::new();
    for part in src.split(';') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parser = WktParser::new(trimmed);
        let geom = parser.geometry()?;
        parser.skip_ws();
        if !parser.rest().is_empty() {
            return Err(parser.error("几何后存在多余内容"));
        }
        gc.push(geom);
    }
    if gc.is_empty() {
        return Err(MfError::unsupported_geometry("WKT 文本不含任何几何"));
    }
    Ok(gc)
}

/// 解析单个 WKT 几何
pub fn parse_wkt(src: &str) -> MfResult<Geometry> {
    let mut gc = parse_wkt_collection(src)?;
    if gc.len() != 1 {
        return Err(MfError::unsupported_geometry("期望单个 WKT 几何"));
    }
    Ok(gc.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let g = parse_wkt("POINT (30 10)").unwrap();
        assert_eq!(g, Geometry::Point(Point::new(30.0, 10.0)));
    }

    #[test]
    fn test_parse_multipoint_both_notations() {
        let a = parse_wkt("MULTIPOINT ((10 40), (40 30))").unwrap();
        let b = parse_wkt("MULTIPOINT (10 40, 40 30)").unwrap();
        assert_eq!(a, b);
        if let Geometry::MultiPoint(pts) = a {
            assert_eq!(pts.len(), 2);
            assert_eq!(pts[1], Point::new(40.0, 30.0));
        } else {
            panic!("expected multipoint");
        }
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let g = parse_wkt(
            "POLYGON ((35 10, 45 45, 15 40, 10 20, 35 10), (20 30, 35 35, 30 20, 20 30))",
        )
        .unwrap();
        if let Geometry::Polygon(p) = g {
            assert_eq!(p.ring_count(), 2);
        } else {
            panic!("expected polygon");
        }
    }

    #[test]
    fn test_parse_multipolygon() {
        let g = parse_wkt("MULTIPOLYGON (((0 0, 4 0, 4 4, 0 4, 0 0)), ((5 5, 6 5, 6 6, 5 5)))")
            .unwrap();
        if let Geometry::MultiPolygon(polys) = g {
            assert_eq!(polys.len(), 2);
        } else {
            panic!("expected multipolygon");
        }
    }

    #[test]
    fn test_parse_case_insensitive_and_scientific() {
        let g = parse_wkt("point (1.5e2 -2.5)").unwrap();
        assert_eq!(g, Geometry::Point(Point::new(150.0, -2.5)));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(parse_wkt("CIRCLE (0 0, 5)").is_err());
        assert!(parse_wkt("").is_err());
    }

    #[test]
    fn test_wkt_roundtrip() {
        let poly = Polygon::new(vec![LineString::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ])]);
        let text = poly.wkt();
        let parsed = parse_wkt(&text).unwrap();
        assert_eq!(parsed, Geometry::Polygon(poly));
    }

    #[test]
    fn test_collection_semicolon_separated() {
        let gc = parse_wkt_collection("POINT (0 0); POINT (1 1)").unwrap();
        assert_eq!(gc.len(), 2);
    }
}
