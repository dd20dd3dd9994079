// tests/io_roundtrip.rs

//! I/O 层端到端往返测试
//!
//! 覆盖配置树 → 时间序列 → 栅格 → 输出驱动的完整链路：
//!
//! - mf 配置文档解析出与文件顺序一致的多重块
//! - inline / CSV 时间序列装载后插值一致，单调性破坏被拒绝
//! - NIMROD 栅格写出再读回，采样值与坐标参考保持一致
//! - 输出驱动按 `{prefix}{variable}_{time_tag}{suffix}` 落盘
//! - 网格检查文件齐全

use mf_io::config::Config;
use mf_io::output::{CsvOutputFormat, GeometryStyle, OutputDriver};
use mf_io::{check, timeseries};
use mf_mesh::Cartesian2dMesh;
use mf_physics::engine::OutputSink;
use mf_physics::SvSolver;
use mf_runtime::{DeviceQueue, MfError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn tempdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("mf_io_roundtrip").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn solver_2x2(queue: Arc<DeviceQueue>) -> SvSolver {
    let mesh = Arc::new(Cartesian2dMesh::new(
        2,
        2,
        glam::DVec2::ZERO,
        glam::DVec2::ONE,
    ));
    SvSolver::new(queue, mesh)
}

#[test]
fn config_document_roundtrip() {
    let text = r#"
name == roundtrip
time units == seconds

mesh {
  cell count == 4 2
  origin == -10 5     ! 左下角
  cell size == 2.5 2.5
}

time series {
  name == inflow
  0 == 0
  60 == 1.5
}
time series {
  name == stage
  source == csv
  filename == stage.csv
}

boundary {
  value == source
  name == rain
  values {
    type == time series
    series == inflow
  }
}
"#;
    let conf = Config::parse(text).unwrap();
    assert_eq!(conf.get_str("name").unwrap(), "roundtrip");

    let mesh = conf.child("mesh").unwrap();
    assert_eq!(mesh.get_fixed::<usize, 2>("cell count").unwrap(), [4, 2]);
    assert_eq!(mesh.get_fixed::<f64, 2>("origin").unwrap(), [-10.0, 5.0]);

    // 重复块保持文件顺序
    let names: Vec<&str> = conf
        .children("time series")
        .map(|b| b.get_str("name").unwrap())
        .collect();
    assert_eq!(names, ["inflow", "stage"]);

    let values = conf
        .child("boundary")
        .unwrap()
        .child("values")
        .unwrap();
    assert_eq!(values.get_str("type").unwrap(), "time series");
}

#[test]
fn inline_and_csv_series_agree() {
    let dir = tempdir("series");
    std::fs::write(dir.join("q.csv"), "time,flow\n0,0\n30,3\n60,6\n").unwrap();

    let inline = Config::parse("0 == 0\n30 == 3\n60 == 6").unwrap();
    let csv = Config::parse(
        "source == csv\nfilename == q.csv\ntime column == time\nvalue column == flow",
    )
    .unwrap();

    let a = timeseries::load(&inline, &dir, 1.0).unwrap();
    let b = timeseries::load(&csv, &dir, 1.0).unwrap();

    assert_eq!(a.times(), b.times());
    assert_eq!(a.values(), b.values());
    for t in [0.0, 15.0, 45.0, 60.0, 90.0] {
        assert_eq!(a.value_at(t), b.value_at(t));
    }
}

#[test]
fn non_monotone_series_is_configuration_error() {
    let dir = tempdir("badseries");
    std::fs::write(dir.join("bad.csv"), "0,1\n10,2\n10,3\n").unwrap();
    let conf = Config::parse("source == csv\nfilename == bad.csv\nheaders == false").unwrap();
    let err = timeseries::load(&conf, &dir, 1.0).unwrap_err();
    assert!(matches!(err, MfError::Configuration { .. }));
}

/// 写一个最小的浮点 NIMROD 文件
fn write_nimrod(path: &Path, ncols: i16, nrows: i16, values: &[f32]) {
    let mut h1 = [0i16; 31];
    h1[11] = 0;
    h1[12] = 4;
    h1[14] = 0;
    h1[15] = nrows;
    h1[16] = ncols;
    h1[23] = 0;
    let mut h2 = [0f32; 28];
    h2[2] = nrows as f32 - 0.5; // 左上像元中心 y
    h2[3] = 1.0;
    h2[4] = 0.5; // 左上像元中心 x
    h2[5] = 1.0;
    h2[6] = -9999.0;

    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&512u32.to_be_bytes()).unwrap();
    for v in h1 {
        f.write_all(&v.to_be_bytes()).unwrap();
    }
    for v in h2 {
        f.write_all(&v.to_be_bytes()).unwrap();
    }
    for v in [0f32; 45] {
        f.write_all(&v.to_be_bytes()).unwrap();
    }
    f.write_all(&[b' '; 56]).unwrap();
    for v in [0i16; 51] {
        f.write_all(&v.to_be_bytes()).unwrap();
    }
    f.write_all(&512u32.to_be_bytes()).unwrap();

    let len = (values.len() * 4) as u32;
    f.write_all(&len.to_be_bytes()).unwrap();
    for v in values {
        f.write_all(&v.to_be_bytes()).unwrap();
    }
    f.write_all(&len.to_be_bytes()).unwrap();
}

#[test]
fn nimrod_raster_roundtrip_through_dispatch() {
    let dir = tempdir("nimrod");
    let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
    write_nimrod(&dir.join("radar.nim"), 4, 3, &values);

    let conf = Config::parse("filename == radar.nim\nformat == nimrod").unwrap();
    let raster = mf_io::raster::load(&conf, &dir).unwrap();

    assert_eq!(raster.ncols(), 4);
    assert_eq!(raster.nrows(), 3);
    // 顶行第一个像元值 0，底行最后一个 11
    assert_eq!(raster.sample_point(glam::DVec2::new(0.5, 2.5), f64::NAN), 0.0);
    assert_eq!(raster.sample_point(glam::DVec2::new(3.5, 0.5), f64::NAN), 11.0);
    // 点采样不受先行箱式归约影响
    let p = glam::DVec2::new(1.5, 1.5);
    let before = raster.sample_point(p, f64::NAN);
    let _ = raster.sample_box(
        glam::DVec2::new(2.0, 1.5),
        glam::DVec2::new(4.0, 3.0),
        mf_physics::forcing::BoxReduction::Mean,
        f64::NAN,
    );
    assert_eq!(raster.sample_point(p, f64::NAN), before);
}

#[test]
fn truncated_nimrod_is_io_error() {
    let dir = tempdir("trunc");
    let path = dir.join("half.nim");
    // 只有长度前缀与半个头
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(&512u32.to_be_bytes()).unwrap();
    f.write_all(&[0u8; 40]).unwrap();
    drop(f);

    let conf = Config::parse("filename == half.nim\nformat == nimrod").unwrap();
    let err = mf_io::raster::load(&conf, &dir).unwrap_err();
    assert!(matches!(err, MfError::Io { .. }));
}

#[test]
fn output_driver_writes_named_files() {
    let dir = tempdir("driver");
    let queue = Arc::new(DeviceQueue::default_device().unwrap());
    let solver = solver_2x2(queue);
    let u = solver.new_state();

    let format = CsvOutputFormat::new(GeometryStyle::Xyz, ", ", &dir, "run_", ".txt");
    let mut driver = OutputDriver::new(
        format,
        0.0,
        60.0,
        30.0,
        60.0, // 驱动单位为分钟
        vec!["depth".into(), "component velocity".into()],
    );

    while !driver.next_output_time().is_nan() {
        driver.emit(&solver, &u).unwrap();
    }

    for file in [
        "run_depth_0.txt",
        "run_depth_0.5.txt",
        "run_depth_1.txt",
        "run_component_velocity_0.txt",
        "run_component_velocity_1.txt",
    ] {
        assert!(dir.join(file).exists(), "{}", file);
    }

    // 每行：x, y, 值列
    let text = std::fs::read_to_string(dir.join("run_depth_0.txt")).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().next().unwrap().starts_with("0.5, 0.5, "));
}

#[test]
fn unknown_output_variable_fails_emission() {
    let dir = tempdir("badvar");
    let queue = Arc::new(DeviceQueue::default_device().unwrap());
    let solver = solver_2x2(queue);
    let u = solver.new_state();

    let format = CsvOutputFormat::new(GeometryStyle::Xyz, ",", &dir, "", ".csv");
    let mut driver = OutputDriver::new(format, 0.0, 1.0, 1.0, 1.0, vec!["vorticity".into()]);
    let err = driver.emit(&solver, &u).unwrap_err();
    assert!(matches!(err, MfError::Configuration { .. }));
}

#[test]
fn mesh_check_files_complete() {
    let dir = tempdir("check");
    let mesh = Cartesian2dMesh::new(3, 2, glam::DVec2::ZERO, glam::DVec2::ONE);
    check::write_mesh_check_files(&mesh, &dir).unwrap();

    let mesh_dir = dir.join("mesh");
    let geometry = std::fs::read_to_string(mesh_dir.join("cell_geometry.csv")).unwrap();
    // 表头 + 每单元一行，几何是闭合多边形
    assert_eq!(geometry.lines().count(), 1 + 6);
    assert!(geometry.lines().nth(1).unwrap().starts_with("\"POLYGON (("));

    let conn = std::fs::read_to_string(mesh_dir.join("face_connectivity.csv")).unwrap();
    assert_eq!(conn.lines().count(), 1 + mesh.face_count());
}
