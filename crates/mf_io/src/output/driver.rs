// crates/mf_io/src/output/driver.rs

//! 输出驱动
//!
//! 每个驱动持有一个输出格式、一张等间隔时刻表与一组变量名。
//! 引擎在同步区间末询问 `next_output_time`，到点后对每个变量
//! 物化输出函数并写文件，时刻标签按驱动自己的时间单位渲染。

use super::format::CsvOutputFormat;
use mf_mesh::FieldVector;
use mf_physics::engine::OutputSink;
use mf_physics::{R, SvSolver};
use mf_runtime::MfResult;

/// 输出驱动
pub struct OutputDriver {
    format: CsvOutputFormat,
    start_time: f64,
    interval: f64,
    n_steps: usize,
    next_step: usize,
    time_factor: f64,
    variables: Vec<String>,
}

impl OutputDriver {
    /// 创建驱动
    ///
    /// `time_factor` 是该驱动的时间单位因子（秒/单位）；时刻标签
    /// 以该单位渲染。
    pub fn new(
        format: CsvOutputFormat,
        start_time: f64,
        end_time: f64,
        interval: f64,
        time_factor: f64,
        variables: Vec<String>,
    ) -> Self {
        let mut n_steps = ((end_time - start_time) / interval).round() as usize;
        if interval * n_steps as f64 <= 1.0 + end_time - start_time {
            n_steps += 1;
        }
        tracing::info!(
            outputs = n_steps,
            interval,
            variables = ?variables,
            "创建输出驱动"
        );
        Self {
            format,
            start_time,
            interval,
            n_steps,
            next_step: 0,
            time_factor,
            variables,
        }
    }

    /// 时刻标签：按驱动时间单位渲染
    fn time_tag(&self, time: f64) -> String {
        format!("{}", time / self.time_factor)
    }

    /// 变量名列表
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

impl OutputSink for OutputDriver {
    fn next_output_time(&self) -> f64 {
        if self.next_step < self.n_steps {
            self.start_time + self.next_step as f64 * self.interval
        } else {
            f64::NAN
        }
    }

    fn emit(&mut self, solver: &SvSolver, u: &FieldVector<R, 3>) -> MfResult<()> {
        let time_now = self.next_output_time();
        let tag = self.time_tag(time_now);
        for variable in &self.variables {
            let func = solver.output_function(variable, u)?;
            self.format.output(&func, &tag)?;
        }
        self.next_step += 1;
        Ok(())
    }
}
