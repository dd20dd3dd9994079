// crates/mf_io/src/timeseries.rs

//! 时间序列加载
//!
//! 两种来源：inline（序列块里的 `time == value` 条目）与 csv
//! （分隔符、注释字符、表头、跳行/列均可配）。时间既可为数值
//! （乘以时间单位因子），也可为 `time format` 指定的挂钟格式，
//! 相对 `time zero` 锚点折算成秒。

use crate::config::Config;
use chrono::NaiveDateTime;
use mf_physics::forcing::TimeSeries;
use mf_runtime::{MfError, MfResult};
use std::path::{Path, PathBuf};

/// inline 序列块的保留键
fn is_reserved_key(key: &str) -> bool {
    matches!(
        key,
        "source"
            | "name"
            | "filename"
            | "time factor"
            | "time offset"
            | "value factor"
            | "value offset"
            | "time units"
            | "time format"
            | "time zero"
    )
}

/// 时间字符串解析器
struct TimeParse {
    format: Option<String>,
    time_zero: i64,
    unit_factor: f64,
}

impl TimeParse {
    fn new(conf: &Config, unit_factor: f64) -> MfResult<Self> {
        let format = conf
            .get_child("time format")
            .map(|n| n.value().to_string())
            .filter(|s| !s.is_empty());
        let time_zero = match &format {
            Some(fmt) => {
                let zero_str = conf.get_str("time zero")?;
                let dt = NaiveDateTime::parse_from_str(zero_str, fmt).map_err(|e| {
                    MfError::configuration(format!(
                        "time zero '{}' 不符合格式 '{}': {}",
                        zero_str, fmt, e
                    ))
                })?;
                dt.and_utc().timestamp()
            }
            None => 0,
        };
        Ok(Self {
            format,
            time_zero,
            unit_factor,
        })
    }

    fn parse(&self, raw: &str) -> MfResult<f64> {
        match &self.format {
            Some(fmt) => {
                let dt = NaiveDateTime::parse_from_str(raw, fmt).map_err(|e| {
                    MfError::configuration(format!(
                        "时间 '{}' 不符合格式 '{}': {}",
                        raw, fmt, e
                    ))
                })?;
                Ok((dt.and_utc().timestamp() - self.time_zero) as f64)
            }
            None => raw
                .parse::<f64>()
                .map(|t| t * self.unit_factor)
                .map_err(|_| MfError::configuration(format!("时间 '{}' 不是数值", raw))),
        }
    }
}

/// 统一的时间/值后缩放：先偏移再乘因子
fn scale_and_offset(conf: &Config, times: &mut [f64], values: &mut [f64]) -> MfResult<()> {
    let time_factor = conf.get_or::<f64>("time factor", 1.0)?;
    let time_offset = conf.get_or::<f64>("time offset", 0.0)?;
    let value_factor = conf.get_or::<f64>("value factor", 1.0)?;
    let value_offset = conf.get_or::<f64>("value offset", 0.0)?;
    for t in times.iter_mut() {
        *t = (*t + time_offset) * time_factor;
    }
    for v in values.iter_mut() {
        *v = (*v + value_offset) * value_factor;
    }
    Ok(())
}

/// 加载 inline 序列：块内的非保留键按 `time == value` 解释
pub fn load_inline(conf: &Config, unit_factor: f64) -> MfResult<TimeSeries> {
    let tparse = TimeParse::new(conf, unit_factor)?;
    let mut times = Vec::new();
    let mut values = Vec::new();

    for (key, node) in conf.entries() {
        let key = key.to_ascii_lowercase();
        if is_reserved_key(&key) {
            continue;
        }
        let t = tparse.parse(&key)?;
        if let Some(&last) = times.last() {
            if t <= last {
                return Err(MfError::configuration(format!(
                    "时间序列必须严格递增: {} ≤ {}",
                    t, last
                )));
            }
        }
        times.push(t);
        values.push(node.value().parse::<f64>().map_err(|_| {
            MfError::configuration(format!("序列值 '{}' 不是数值", node.value()))
        })?);
    }

    scale_and_offset(conf, &mut times, &mut values)?;
    TimeSeries::new(times, values)
}

/// 加载 CSV 序列
pub fn load_csv(conf: &Config, base_path: &Path, unit_factor: f64) -> MfResult<TimeSeries> {
    let user_path = PathBuf::from(conf.get_str("filename")?);
    let filepath = if user_path.is_absolute() {
        user_path
    } else {
        base_path.join(user_path)
    };

    let separator = conf
        .get_child("separator")
        .map(|n| n.value().chars().next().unwrap_or(','))
        .unwrap_or(',');
    let comment_char = conf
        .get_child("comment character")
        .map(|n| n.value().chars().next().unwrap_or('#'))
        .unwrap_or('#');
    let headers = conf.get_bool_or("headers", true)?;
    let skip_rows = conf.get_or::<i64>("skip rows", -1)?;
    let skip_cols = conf.get_or::<i64>("skip cols", -1)?;

    let tparse = TimeParse::new(conf, unit_factor)?;

    let content = std::fs::read_to_string(&filepath).map_err(|e| {
        MfError::io_with(format!("无法读取时间序列 {}", filepath.display()), e)
    })?;

    let rows: Vec<Vec<String>> = content
        .lines()
        .filter(|line| {
            let t = line.trim();
            !t.is_empty() && !t.starts_with(comment_char)
        })
        .map(|line| {
            line.split(separator)
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect();

    let col_base = (skip_cols + 1).max(0) as usize;
    let (time_col, value_col, data_start);

    if headers {
        let header_row = (skip_rows + 1).max(0) as usize;
        let header = rows.get(header_row).ok_or_else(|| {
            MfError::io(format!("{}: 找不到表头行", filepath.display()))
        })?;
        let find = |name: &str| -> MfResult<usize> {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| {
                    MfError::configuration(format!(
                        "{}: 表头中没有列 '{}'",
                        filepath.display(),
                        name
                    ))
                })
        };
        time_col = find(conf.get_str("time column")?)?;
        value_col = find(conf.get_str("value column")?)?;
        data_start = header_row + 1;
    } else {
        time_col = col_base + conf.get_or::<usize>("time column", 1)? - 1;
        value_col = col_base + conf.get_or::<usize>("value column", 2)? - 1;
        data_start = (skip_rows + 1).max(0) as usize;
    }

    let mut times = Vec::new();
    let mut values = Vec::new();
    for row in rows.iter().skip(data_start) {
        let need = time_col.max(value_col);
        if row.len() <= need {
            return Err(MfError::io(format!(
                "{}: 数据行列数不足（需要至少 {} 列）",
                filepath.display(),
                need + 1
            )));
        }
        times.push(tparse.parse(&row[time_col])?);
        values.push(row[value_col].parse::<f64>().map_err(|_| {
            MfError::configuration(format!(
                "{}: 序列值 '{}' 不是数值",
                filepath.display(),
                row[value_col]
            ))
        })?);
    }

    scale_and_offset(conf, &mut times, &mut values)?;
    TimeSeries::new(times, values)
}

/// 按 `source` 键分派加载
pub fn load(conf: &Config, base_path: &Path, unit_factor: f64) -> MfResult<TimeSeries> {
    match conf.get_or::<String>("source", "inline".to_string())?.as_str() {
        "inline" => load_inline(conf, unit_factor),
        "csv" => load_csv(conf, base_path, unit_factor),
        other => Err(MfError::configuration(format!(
            "未知的时间序列来源: '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_basic() {
        let conf = Config::parse("0 == 1.0\n10 == 2.0\n20 == 0.5").unwrap();
        let ts = load_inline(&conf, 1.0).unwrap();
        assert_eq!(ts.len(), 3);
        assert!((ts.value_at(5.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_inline_unit_factor() {
        // 时间单位为小时
        let conf = Config::parse("0 == 0\n1 == 36").unwrap();
        let ts = load_inline(&conf, 3600.0).unwrap();
        assert_eq!(ts.times()[1], 3600.0);
    }

    #[test]
    fn test_inline_scale_offset() {
        let conf = Config::parse(
            "value factor == 2\nvalue offset == 1\ntime factor == 10\n0 == 1\n1 == 2",
        )
        .unwrap();
        let ts = load_inline(&conf, 1.0).unwrap();
        // v = (1+1)·2 = 4；t = (1+0)·10 = 10
        assert_eq!(ts.values()[0], 4.0);
        assert_eq!(ts.times()[1], 10.0);
    }

    #[test]
    fn test_inline_nonmonotone_rejected() {
        let conf = Config::parse("0 == 1\n5 == 2\n5 == 3").unwrap();
        assert!(matches!(
            load_inline(&conf, 1.0).unwrap_err(),
            MfError::Configuration { .. }
        ));
    }

    #[test]
    fn test_csv_no_headers() {
        let dir = std::env::temp_dir().join("mf_ts_test_nh");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("q.csv"), "# comment\n0,1.0\n10,2.0\n").unwrap();
        let conf = Config::parse("source == csv\nfilename == q.csv\nheaders == false").unwrap();
        let ts = load(&conf, &dir, 1.0).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.value_at(10.0), 2.0);
    }

    #[test]
    fn test_csv_named_columns() {
        let dir = std::env::temp_dir().join("mf_ts_test_named");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("s.csv"), "t;flow;stage\n0;5;0.1\n60;6;0.2\n").unwrap();
        let conf = Config::parse(
            "source == csv\nfilename == s.csv\nseparator == ;\ntime column == t\nvalue column == stage",
        )
        .unwrap();
        let ts = load(&conf, &dir, 1.0).unwrap();
        assert_eq!(ts.values(), &[0.1, 0.2]);
    }

    #[test]
    fn test_csv_wall_clock_times() {
        let dir = std::env::temp_dir().join("mf_ts_test_wc");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("w.csv"),
            "2021-01-01 00:00:00,0.0\n2021-01-01 01:00:00,1.0\n",
        )
        .unwrap();
        let conf = Config::parse(
            "source == csv\nfilename == w.csv\nheaders == false\ntime format == %Y-%m-%d %H:%M:%S\ntime zero == 2021-01-01 00:00:00",
        )
        .unwrap();
        let ts = load(&conf, &dir, 1.0).unwrap();
        assert_eq!(ts.times(), &[0.0, 3600.0]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let conf =
            Config::parse("source == csv\nfilename == nope.csv\nheaders == false").unwrap();
        assert!(matches!(
            load(&conf, Path::new("/tmp"), 1.0).unwrap_err(),
            MfError::Io { .. }
        ));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let conf = Config::parse("source == xml").unwrap();
        assert!(load(&conf, Path::new("."), 1.0).is_err());
    }
}
