// crates/mf_config/src/params.rs

//! 运行/步长/设备参数
//!
//! 解析后的参数结构带 Serialize，`mf_cli validate` 用 JSON 倾倒
//! 已解析的配置。

use crate::units;
use mf_io::Config;
use mf_runtime::{MfError, MfResult};
use serde::Serialize;

/// 运行窗口参数
#[derive(Debug, Clone, Serialize)]
pub struct RunParameters {
    /// 起始时刻 [s]
    pub start_time: f64,
    /// 终止时刻 [s]
    pub end_time: f64,
    /// 同步区间长度 [s]
    pub sync_step: f64,
    /// 每多少个接受步打印一行
    pub display_every: usize,
}

impl RunParameters {
    /// 从 `run parameters` 块解析；时间按块内单位换算成秒
    pub fn from_config(root: &Config, global_factor: f64) -> MfResult<Self> {
        let conf = root.child("run parameters")?;
        let factor = units::factor_for(conf, global_factor)?;
        let start_time = conf.get_or::<f64>("start time", 0.0)? * factor;
        let end_time = conf.get::<f64>("end time")? * factor;
        // `sync step` 按块内时间单位换算；缺失时退到以秒给出的
        // `sync step seconds`
        let sync_step = match conf.get_child("sync step") {
            Some(_) => conf.get::<f64>("sync step")? * factor,
            None => conf.get_or::<f64>("sync step seconds", 60.0)?,
        };
        let display_every = conf.get_or::<usize>("display every", 1)?.max(1);
        if end_time <= start_time {
            return Err(MfError::configuration(format!(
                "运行窗口为空: end time {} ≤ start time {}",
                end_time, start_time
            )));
        }
        Ok(Self {
            start_time,
            end_time,
            sync_step,
            display_every,
        })
    }
}

/// 步长模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DtKind {
    /// 固定步长（已识别，未实现）
    Fixed,
    /// 自适应步长
    Adaptive,
}

/// 步长参数
#[derive(Debug, Clone, Serialize)]
pub struct TimestepParameters {
    /// 步长模式
    pub kind: DtKind,
    /// 初始步长 [s]
    pub time_step: f64,
    /// 步长上限 [s]
    pub max_time_step: f64,
    /// 控制数目标
    pub courant_target: f64,
    /// 时间格式名
    pub scheme_method: String,
    /// generic 格式的 α
    pub scheme_alpha: Option<f64>,
}

impl TimestepParameters {
    /// 从 `timestep parameters` 块解析
    pub fn from_config(root: &Config) -> MfResult<Self> {
        let conf = root.child("timestep parameters")?;
        let kind = match conf.get_or::<String>("value", "adaptive".to_string())?.as_str() {
            "fixed" => DtKind::Fixed,
            "adaptive" => DtKind::Adaptive,
            other => {
                return Err(MfError::configuration(format!(
                    "未知的步长模式: '{}'",
                    other
                )))
            }
        };
        let time_step = conf.get_or::<f64>("time step", 1.0)?;
        let max_time_step = conf.get_or::<f64>("max time step", 60.0)?;
        let courant_target = conf.get_or::<f64>("courant target", 0.9)?;

        // ddt scheme { runge kutta { method == …; alpha == … } }
        let rk = conf
            .get_child("ddt scheme")
            .and_then(|s| s.get_child("runge kutta"));
        let (scheme_method, scheme_alpha) = match rk {
            Some(rk) => (
                rk.get_or::<String>("method", "Euler".to_string())?,
                match rk.get_child("alpha") {
                    Some(node) => Some(node.value().parse::<f64>().map_err(|_| {
                        MfError::configuration(format!("alpha 值 '{}' 无法解析", node.value()))
                    })?),
                    None => None,
                },
            ),
            None => ("Euler".to_string(), None),
        };

        Ok(Self {
            kind,
            time_step,
            max_time_step,
            courant_target,
            scheme_method,
            scheme_alpha,
        })
    }
}

/// 设备参数
#[derive(Debug, Clone, Serialize)]
pub struct DeviceParameters {
    /// 平台序号
    pub platform_id: usize,
    /// 设备序号
    pub device_id: usize,
    /// 工作线程数（0 = 运行时决定）
    pub threads: usize,
    /// 设备名
    pub name: String,
}

impl DeviceParameters {
    /// 从 `device parameters` 块解析；块缺失时取默认设备
    pub fn from_config(root: &Config) -> MfResult<Self> {
        let default = Self {
            platform_id: 0,
            device_id: 0,
            threads: 0,
            name: "host".to_string(),
        };
        let conf = match root.get_child("device parameters") {
            Some(c) => c,
            None => return Ok(default),
        };
        Ok(Self {
            platform_id: conf.get_or::<usize>("platform id", 0)?,
            device_id: conf.get_or::<usize>("device id", 0)?,
            threads: conf.get_or::<usize>("threads", 0)?,
            name: conf.get_or::<String>("platforms", "host".to_string())?,
        })
    }
}
