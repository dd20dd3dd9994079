// crates/mf_physics/src/forcing/timeseries.rs

//! 时间序列
//!
//! 时间严格单调递增，取值做线性插值，越界时截断到端点值。
//! 加载（inline / csv）在 I/O 层完成，这里只承载数据与插值。

use mf_runtime::{MfError, MfResult};

/// 时间序列数据
#[derive(Debug, Clone)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// 由时间与值数组创建
    ///
    /// 时间必须严格单调递增且非空，否则报配置错误。
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> MfResult<Self> {
        if times.is_empty() {
            return Err(MfError::configuration("时间序列为空"));
        }
        if times.len() != values.len() {
            return Err(MfError::configuration(format!(
                "时间序列长度不一致: {} 个时间, {} 个值",
                times.len(),
                values.len()
            )));
        }
        for i in 1..times.len() {
            if times[i] <= times[i - 1] {
                return Err(MfError::configuration(format!(
                    "时间序列必须严格递增: t[{}]={} ≤ t[{}]={}",
                    i,
                    times[i],
                    i - 1,
                    times[i - 1]
                )));
            }
        }
        Ok(Self { times, values })
    }

    /// 数据点个数
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// 时间数组
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// 值数组
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 时间范围
    pub fn time_range(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// 线性插值取值，越界截断到端点
    pub fn value_at(&self, t: f64) -> f64 {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= self.times[n - 1] {
            return self.values[n - 1];
        }

        // 上界二分：第一个 times[i] > t
        let mut lo = 0;
        let mut hi = n - 1;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if self.times[mid] > t {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let t0 = self.times[lo];
        let t1 = self.times[hi];
        let v0 = self.values[lo];
        let v1 = self.values[hi];
        v0 + (t - t0) / (t1 - t0) * (v1 - v0)
    }
}
