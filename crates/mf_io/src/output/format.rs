// crates/mf_io/src/output/format.rs

//! CSV/TSV 输出格式
//!
//! 每次输出写一个文件：`{prefix}{variable}_{time_tag}{suffix}`。
//! 几何列是 `x,y`（对象坐标）或带引号的 WKT；其后是各值列。

use mf_physics::output::OutputFunction;
use mf_runtime::{MfError, MfResult};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 几何列风格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryStyle {
    /// 对象坐标 x, y
    Xyz,
    /// WKT 几何
    Wkt,
}

impl GeometryStyle {
    /// 配置名 → 风格
    pub fn from_name(name: &str) -> MfResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xyz" | "xy" => Ok(Self::Xyz),
            "wkt" => Ok(Self::Wkt),
            other => Err(MfError::configuration(format!(
                "未知的几何列风格: '{}'",
                other
            ))),
        }
    }
}

/// CSV/TSV 输出格式
#[derive(Debug, Clone)]
pub struct CsvOutputFormat {
    style: GeometryStyle,
    delimiter: String,
    directory: PathBuf,
    prefix: String,
    suffix: String,
}

impl CsvOutputFormat {
    /// 创建格式
    pub fn new(
        style: GeometryStyle,
        delimiter: impl Into<String>,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            style,
            delimiter: delimiter.into(),
            directory: directory.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// 输出文件路径
    pub fn file_path(&self, variable: &str, time_tag: &str) -> PathBuf {
        self.directory.join(format!(
            "{}{}_{}{}",
            self.prefix,
            variable.replace(' ', "_"),
            time_tag,
            self.suffix
        ))
    }

    /// 输出目录
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 写出一个输出函数在给定时刻标签下的文件
    pub fn output(&self, func: &OutputFunction, time_tag: &str) -> MfResult<()> {
        std::fs::create_dir_all(&self.directory).map_err(|e| {
            MfError::io_with(
                format!("无法创建输出目录 {}", self.directory.display()),
                e,
            )
        })?;

        let path = self.file_path(func.name(), time_tag);
        let file = std::fs::File::create(&path)
            .map_err(|e| MfError::io_with(format!("无法创建输出文件 {}", path.display()), e))?;
        let mut writer = std::io::BufWriter::new(file);

        for i in 0..func.size() {
            let mut cells: Vec<String> = Vec::with_capacity(2 + func.column_count());
            match self.style {
                GeometryStyle::Xyz => {
                    let c = func.coordinate(i);
                    cells.push(c.x.to_string());
                    cells.push(c.y.to_string());
                }
                GeometryStyle::Wkt => {
                    cells.push(format!("\"{}\"", func.wkt(i)));
                }
            }
            for v in func.values(i) {
                cells.push(v.to_string());
            }
            writeln!(writer, "{}", cells.join(&self.delimiter))
                .map_err(|e| MfError::io_with(format!("写出 {} 失败", path.display()), e))?;
        }

        tracing::debug!(file = %path.display(), rows = func.size(), "写出输出文件");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_mesh::{Cartesian2dMesh, Mapping};
    use std::sync::Arc;

    fn demo_function() -> OutputFunction {
        let mesh = Arc::new(Cartesian2dMesh::new(
            2,
            1,
            glam::DVec2::ZERO,
            glam::DVec2::ONE,
        ));
        OutputFunction::from_columns(
            "depth",
            Mapping::Cell,
            mesh,
            vec![vec![0.25, 0.5]],
        )
    }

    fn tempdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("mf_output_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_xyz_csv() {
        let dir = tempdir("xyz");
        let fmt = CsvOutputFormat::new(GeometryStyle::Xyz, ", ", &dir, "", ".txt");
        fmt.output(&demo_function(), "0.5").unwrap();
        let text = std::fs::read_to_string(dir.join("depth_0.5.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0.5, 0.5, 0.25");
        assert_eq!(lines[1], "1.5, 0.5, 0.5");
    }

    #[test]
    fn test_wkt_tsv() {
        let dir = tempdir("wkt");
        let fmt = CsvOutputFormat::new(GeometryStyle::Wkt, "\t", &dir, "run1_", ".tsv");
        fmt.output(&demo_function(), "init").unwrap();
        let text = std::fs::read_to_string(dir.join("run1_depth_init.tsv")).unwrap();
        assert!(text.starts_with("\"POLYGON (("));
        assert!(text.lines().next().unwrap().ends_with("0.25"));
    }

    #[test]
    fn test_variable_name_sanitised() {
        let fmt = CsvOutputFormat::new(GeometryStyle::Xyz, ",", "out", "", ".txt");
        assert_eq!(
            fmt.file_path("component velocity", "12"),
            PathBuf::from("out/component_velocity_12.txt")
        );
    }
}
