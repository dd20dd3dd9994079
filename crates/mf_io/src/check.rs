// crates/mf_io/src/check.rs

//! 检查文件
//!
//! 把网格（位置、连接、几何）与求解器常量（活动掩膜、单元常量）
//! 倾倒到检查目录，供外部 GIS 工具核对装配结果。

use crate::output::{CsvOutputFormat, GeometryStyle};
use mf_mesh::ops::field_is_nan;
use mf_mesh::{Cartesian2dMesh, Field, Mapping};
use mf_physics::output::OutputFunction;
use mf_physics::{R, SvSolver};
use mf_runtime::{MfError, MfResult};
use std::io::Write;
use std::path::Path;

fn ensure_dir(path: &Path) -> MfResult<()> {
    if path.exists() && !path.is_dir() {
        return Err(MfError::io(format!(
            "检查目录路径被文件占用: {}",
            path.display()
        )));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| MfError::io_with(format!("无法创建检查目录 {}", path.display()), e))
}

fn create(path: &Path) -> MfResult<std::io::BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .map_err(|e| MfError::io_with(format!("无法创建检查文件 {}", path.display()), e))?;
    Ok(std::io::BufWriter::new(file))
}

fn io_err(path: &Path, e: std::io::Error) -> MfError {
    MfError::io_with(format!("写出检查文件 {} 失败", path.display()), e)
}

/// 写出网格检查文件到 `check_path/mesh/`
pub fn write_mesh_check_files(mesh: &Cartesian2dMesh, check_path: &Path) -> MfResult<()> {
    let mesh_path = check_path.join("mesh");
    ensure_dir(&mesh_path)?;

    let [nx, ny] = mesh.cell_index_size();
    let log_path = mesh_path.join("log.txt");
    let mut log = create(&log_path)?;
    writeln!(
        log,
        "Cartesian 2D mesh\n  cells: {} × {} = {}\n  faces: {}\n  vertices: {}",
        nx,
        ny,
        mesh.cell_count(),
        mesh.face_count(),
        mesh.vertex_count()
    )
    .map_err(|e| io_err(&log_path, e))?;

    // 对象位置
    for (file, mapping) in [
        ("cell_centres.csv", Mapping::Cell),
        ("face_centres.csv", Mapping::Face),
        ("vertices.csv", Mapping::Vertex),
    ] {
        let path = mesh_path.join(file);
        let mut out = create(&path)?;
        for i in 0..mesh.object_count(mapping) {
            let c = mesh.object_coordinate(mapping, i);
            writeln!(out, "{},{}", c.x, c.y).map_err(|e| io_err(&path, e))?;
        }
    }

    // 连接表
    {
        let path = mesh_path.join("cell_connectivity.csv");
        let mut out = create(&path)?;
        writeln!(out, "f_w,f_e,f_s,f_n,v_sw,v_se,v_nw,v_ne").map_err(|e| io_err(&path, e))?;
        for cid in 0..mesh.cell_count() {
            let idx = mesh.cell_index(cid);
            let f = mesh.faces_around_cell(idx);
            let v = mesh.vertices_around_cell(idx);
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                f[0], f[1], f[2], f[3], v[0], v[1], v[2], v[3]
            )
            .map_err(|e| io_err(&path, e))?;
        }
    }
    {
        let path = mesh_path.join("face_connectivity.csv");
        let mut out = create(&path)?;
        writeln!(out, "c_us,c_ds,v_0,v_1").map_err(|e| io_err(&path, e))?;
        for fid in 0..mesh.face_count() {
            let c = mesh.cells_around_face(fid);
            let v = mesh.vertices_around_face(fid);
            writeln!(out, "{},{},{},{}", c[0], c[1], v[0], v[1]).map_err(|e| io_err(&path, e))?;
        }
    }

    // WKT 几何
    for (file, mapping) in [
        ("cell_geometry.csv", Mapping::Cell),
        ("face_geometry.csv", Mapping::Face),
        ("vertex_geometry.csv", Mapping::Vertex),
    ] {
        let path = mesh_path.join(file);
        let mut out = create(&path)?;
        writeln!(out, "wkt,id").map_err(|e| io_err(&path, e))?;
        for i in 0..mesh.object_count(mapping) {
            writeln!(out, "\"{}\",{}", mesh.object_wkt(mapping, i), i)
                .map_err(|e| io_err(&path, e))?;
        }
    }

    tracing::info!(dir = %mesh_path.display(), "写出网格检查文件");
    Ok(())
}

/// 写出活动单元掩膜检查文件
pub fn write_active_check(solver: &SvSolver, check_path: &Path) -> MfResult<()> {
    ensure_dir(check_path)?;
    let format = CsvOutputFormat::new(GeometryStyle::Wkt, ", ", check_path, "", ".txt");
    let active: Field<R> = field_is_nan("active cells", solver.zbed().at(0))?;
    format.output(&OutputFunction::from_fields("active cells", &[&active]), "init")
}

/// 写出单元常量（地形 + 糙率）检查文件
pub fn write_constants_check(solver: &SvSolver, check_path: &Path) -> MfResult<()> {
    ensure_dir(check_path)?;
    let format = CsvOutputFormat::new(GeometryStyle::Wkt, ", ", check_path, "", ".txt");
    let func = OutputFunction::from_fields(
        "cell constants",
        &[
            solver.zbed().at(0),
            solver.zbed().at(1),
            solver.zbed().at(2),
            solver.manning().at(0),
            solver.manning().at(1),
            solver.manning().at(2),
            solver.manning().at(3),
        ],
    );
    format.output(&func, "const")
}
