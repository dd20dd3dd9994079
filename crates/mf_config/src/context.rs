// crates/mf_config/src/context.rs

//! 仿真上下文
//!
//! 进程级配置状态的唯一所有者：配置树、基准路径、时间序列与
//! 栅格缓存。按引用传入各构造器，不做隐藏单例。

use crate::units;
use mf_io::Config;
use mf_physics::forcing::{RasterField, TimeSeries};
use mf_runtime::{MfError, MfResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 仿真上下文
pub struct SimulationContext {
    config: Config,
    base_path: PathBuf,
    stem: String,
    global_time_factor: f64,
    time_series: RwLock<HashMap<String, Arc<TimeSeries>>>,
    rasters: RwLock<HashMap<String, Arc<RasterField>>>,
}

impl SimulationContext {
    /// 从配置文件创建；基准路径取文件所在目录
    pub fn from_file(path: &Path) -> MfResult<Self> {
        let config = Config::load(path)?;
        let base_path = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "simulation".to_string());
        Self::new(config, base_path, stem)
    }

    /// 从已解析的配置创建
    pub fn new(config: Config, base_path: PathBuf, stem: String) -> MfResult<Self> {
        let global_time_factor = match config.get_child("time units") {
            Some(node) => units::factor(node.value())?,
            None => 1.0,
        };
        Ok(Self {
            config,
            base_path,
            stem,
            global_time_factor,
            time_series: RwLock::new(HashMap::new()),
            rasters: RwLock::new(HashMap::new()),
        })
    }

    /// 配置树
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 基准路径（相对路径的锚点）
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 仿真名：`name` 键或配置文件主干名
    pub fn name(&self) -> String {
        self.config
            .get_child("name")
            .map(|n| n.value().to_string())
            .unwrap_or_else(|| self.stem.clone())
    }

    /// 输出目录
    pub fn output_directory(&self) -> MfResult<PathBuf> {
        let dir = self
            .config
            .get_or::<String>("output directory", "output".to_string())?;
        Ok(self.base_path.join(dir))
    }

    /// 检查文件目录
    pub fn check_file_path(&self) -> MfResult<PathBuf> {
        let dir = self
            .config
            .get_or::<String>("check file directory", "check".to_string())?;
        Ok(self.base_path.join(dir))
    }

    /// 全局时间单位因子
    pub fn global_time_factor(&self) -> f64 {
        self.global_time_factor
    }

    /// 某个块的时间单位因子（回退到全局）
    pub fn time_unit_factor(&self, conf: &Config) -> MfResult<f64> {
        units::factor_for(conf, self.global_time_factor)
    }

    /// 按名称取时间序列（惰性加载 + 缓存，名字不区分大小写）
    pub fn time_series(&self, name: &str) -> MfResult<Arc<TimeSeries>> {
        let key = name.to_ascii_lowercase();
        if let Some(ts) = self.time_series.read().get(&key) {
            return Ok(Arc::clone(ts));
        }

        let block = self
            .config
            .children("time series")
            .find(|b| {
                b.get_child("name")
                    .map(|n| n.value().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                MfError::configuration(format!("找不到名为 '{}' 的时间序列", name))
            })?;

        let factor = self.time_unit_factor(block)?;
        let ts = Arc::new(mf_io::timeseries::load(block, &self.base_path, factor)?);
        tracing::info!(series = %name, points = ts.len(), "加载时间序列");
        self.time_series.write().insert(key, Arc::clone(&ts));
        Ok(ts)
    }

    /// 按名称取栅格场（惰性加载 + 缓存，名字不区分大小写）
    pub fn raster_field(&self, name: &str) -> MfResult<Arc<RasterField>> {
        let key = name.to_ascii_lowercase();
        if let Some(r) = self.rasters.read().get(&key) {
            return Ok(Arc::clone(r));
        }

        let block = self
            .config
            .children("raster field")
            .find(|b| {
                b.get_child("name")
                    .map(|n| n.value().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                MfError::configuration(format!("找不到名为 '{}' 的栅格场", name))
            })?;

        let raster = Arc::new(mf_io::raster::load(block, &self.base_path)?);
        tracing::info!(
            raster = %name,
            grid = format!("{}×{}", raster.ncols(), raster.nrows()),
            "加载栅格场"
        );
        self.rasters.write().insert(key, Arc::clone(&raster));
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(text: &str) -> SimulationContext {
        SimulationContext::new(
            Config::parse(text).unwrap(),
            PathBuf::from("."),
            "test".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_name_fallback() {
        assert_eq!(ctx("a == 1").name(), "test");
        assert_eq!(ctx("name == flood2021").name(), "flood2021");
    }

    #[test]
    fn test_global_time_units() {
        assert_eq!(ctx("a == 1").global_time_factor(), 1.0);
        assert_eq!(ctx("time units == minutes").global_time_factor(), 60.0);
    }

    #[test]
    fn test_time_series_cache() {
        let c = ctx("time series {\n name == q\n 0 == 1\n 10 == 2\n}");
        let a = c.time_series("q").unwrap();
        let b = c.time_series("Q").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_unknown_series_rejected() {
        let c = ctx("a == 1");
        assert!(matches!(
            c.time_series("missing").unwrap_err(),
            MfError::Configuration { .. }
        ));
    }

    #[test]
    fn test_output_directory_default() {
        let c = ctx("a == 1");
        assert_eq!(c.output_directory().unwrap(), PathBuf::from("./output"));
    }
}
