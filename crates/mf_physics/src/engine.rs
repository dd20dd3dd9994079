// crates/mf_physics/src/engine.rs

//! 时间步控制
//!
//! 外层循环把 [t_start, t_end] 切成同步区间：每个区间开始时复位并
//! 更新边界条件，结束时触发输出。内层循环自适应提出步长：
//!
//! | 状态      | 进入                 | 转移                              |
//! |-----------|----------------------|-----------------------------------|
//! | proposing | 区间开始；接受之后   | 计算一步 → evaluating             |
//! | evaluating| 归约完成             | Co>目标 → rejecting；否则 accepting|
//! | rejecting | 步无效               | 收缩 Δt → proposing               |
//! | accepting | 步有效               | 推进时间；区间耗尽 → done         |
//! | done      | 区间耗尽             | 触发输出，返回外层                |
//!
//! 拒绝时 `Δt := Δt·clamp(Co_t/Co, 0.1, 0.9)`；一个区间内累计拒绝
//! 1000 次即收敛失败。接受后若 `Co < 0.9·Co_t` 则步长向
//! `min(Δt_max, 1.1·Δt)` 增长。区间收尾时做 60 %/35 % 的奇偶整形，
//! 使区间在偶数步上干净落地。

use crate::boundary::BoundaryCondition;
use crate::output::OutputFunction;
use crate::scheme::RungeKuttaScheme;
use crate::solver::SvSolver;
use crate::R;
use mf_mesh::FieldVector;
use mf_runtime::{Column, DisplayTable, MfError, MfResult};

/// 自适应步长参数
#[derive(Debug, Clone, Copy)]
pub struct TimestepControl {
    /// 初始步长 [s]
    pub time_step: f64,
    /// 步长上限 [s]
    pub max_time_step: f64,
    /// 控制数目标
    pub courant_target: f64,
}

/// 输出接收器
///
/// 由 I/O 层实现；引擎只询问下次输出时刻并在到点时交出状态。
pub trait OutputSink {
    /// 下次应当输出的时刻；不再输出时返回 NaN
    fn next_output_time(&self) -> f64;

    /// 产出一次输出
    fn emit(&mut self, solver: &SvSolver, u: &FieldVector<R, 3>) -> MfResult<()>;
}

/// 仿真：求解器 + 时间推进 + 边界 + 输出
pub struct Simulation {
    solver: SvSolver,
    scheme: RungeKuttaScheme,
    boundaries: Vec<BoundaryCondition>,
    outputs: Vec<Box<dyn OutputSink>>,
    control: TimestepControl,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("boundaries_count", &self.boundaries.len())
            .field("outputs_count", &self.outputs.len())
            .field("control", &self.control)
            .finish()
    }
}

impl Simulation {
    /// 组装仿真
    pub fn new(
        solver: SvSolver,
        scheme: RungeKuttaScheme,
        boundaries: Vec<BoundaryCondition>,
        outputs: Vec<Box<dyn OutputSink>>,
        control: TimestepControl,
    ) -> Self {
        Self {
            solver,
            scheme,
            boundaries,
            outputs,
            control,
        }
    }

    /// 求解器
    pub fn solver(&self) -> &SvSolver {
        &self.solver
    }

    /// 当前解状态
    pub fn state(&self) -> &FieldVector<R, 3> {
        self.scheme.state()
    }

    /// 按名称构造当前状态的输出函数
    pub fn output_function(&self, name: &str) -> MfResult<OutputFunction> {
        self.solver.output_function(name, self.scheme.state())
    }

    /// 执行外层同步循环
    pub fn run(
        &mut self,
        start_time: f64,
        end_time: f64,
        sync_step: f64,
        display_every: usize,
    ) -> MfResult<()> {
        let mut dt = self.control.time_step;

        // 起始时刻的输出
        for od in &mut self.outputs {
            if start_time >= od.next_output_time() {
                od.emit(&self.solver, self.scheme.state())?;
            }
        }

        let table = DisplayTable::new(vec![
            Column::new(10, "t (hours)"),
            Column::new(9, "Δt"),
            Column::new(9, "tₗ"),
            Column::new(9, "Co"),
        ]);

        let nsteps = ((0.001 + end_time - start_time) / sync_step) as usize;
        for i in 0..nsteps {
            let t_step_start = start_time + i as f64 * sync_step;
            let t_step_end = t_step_start + sync_step;
            self.inner_loop(&mut dt, t_step_start, t_step_end, &table, display_every)?;
        }

        Ok(())
    }

    /// 单个同步区间的内层自适应循环
    fn inner_loop(
        &mut self,
        dt: &mut f64,
        t_start: f64,
        t_end: f64,
        table: &DisplayTable,
        display_every: usize,
    ) -> MfResult<()> {
        self.solver.clear_boundary_conditions()?;
        for bc in &self.boundaries {
            bc.update(&mut self.solver, t_start, t_end)?;
        }

        let courant_target = self.control.courant_target;
        let max_dt = self.control.max_time_step;

        let mut repeated_step_count = 0usize;
        let mut inner_steps = 0usize;
        let mut t_local = 0.0f64;
        let t_local_end = t_end - t_start;

        let mut any_output = true;

        let row = |t_now: f64, dt: f64, t_local: f64, co: f64| {
            table.write_data_row(&[
                format!("{:.3}", t_now / 3600.0),
                format!("{:.4}", dt),
                format!("{:.3}", t_local),
                format!("{:.4}", co),
            ]);
        };

        loop {
            if any_output {
                table.write_top_rule();
                table.write_header_row();
                any_output = false;
            }

            // proposing：按当前步长推进一步
            let t_now = t_start + t_local;
            self.scheme
                .step(&mut self.solver, t_now, *dt, t_start, t_end);

            // evaluating：候选状态的控制数
            let comax = self.solver.control_number(self.scheme.candidate(), *dt);

            let mut target_dt = *dt;

            if comax > courant_target {
                // rejecting
                row(t_now, *dt, t_local, comax);

                repeated_step_count += 1;
                if repeated_step_count >= 1000 {
                    return Err(MfError::convergence(format!(
                        "同步区间 [{}, {}] 内重复步数达到 1000",
                        t_start, t_end
                    )));
                }

                target_dt = *dt * (courant_target / comax).clamp(0.1, 0.9);
            } else {
                // accepting
                self.scheme.accept_step();
                t_local += *dt;
                inner_steps += 1;

                if comax < 0.9 * courant_target {
                    target_dt = max_dt.min(*dt * 1.1);
                }

                if inner_steps % display_every == 0 {
                    row(t_now, *dt, t_local, comax);
                }

                if t_local >= t_local_end {
                    // done：触发到点的输出
                    if inner_steps % display_every != 0 {
                        row(t_now, *dt, t_local, comax);
                    }

                    for od in &mut self.outputs {
                        if t_start + t_local >= od.next_output_time() {
                            any_output = true;
                            table.write_bot_rule();
                            od.emit(&self.solver, self.scheme.state())?;
                        }
                    }

                    if repeated_step_count > 0 {
                        if !any_output {
                            table.write_bot_rule();
                        } else {
                            table.write_mid_rule();
                        }
                        tracing::warn!(
                            repeats = repeated_step_count,
                            "本区间存在重复步"
                        );
                        any_output = true;
                    }

                    if !any_output {
                        table.write_bot_rule();
                    }

                    return Ok(());
                } else if t_local + target_dt > t_local_end {
                    // 下一步会越过区间终点：压到残量，偶数步时取 60 % 留两步
                    target_dt = t_local_end - t_local;
                    if inner_steps % 2 == 0 {
                        target_dt *= 0.6;
                    }
                } else if t_local + 1.5 * target_dt >= t_local_end {
                    // 接近终点：偶数步 60 % 留两步；奇数步 35 % 留三步
                    if inner_steps % 2 == 0 {
                        target_dt = 0.6 * (t_local_end - t_local);
                    } else {
                        target_dt = 0.35 * (t_local_end - t_local);
                    }
                }
            }

            *dt = target_dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::ButcherTableau;
    use mf_mesh::Cartesian2dMesh;
    use mf_runtime::DeviceQueue;
    use std::sync::Arc;

    fn simulation(nx: usize, h0: R) -> Simulation {
        let q = Arc::new(DeviceQueue::default_device().unwrap());
        let m = Arc::new(Cartesian2dMesh::new(
            nx,
            1,
            glam::DVec2::ZERO,
            glam::DVec2::ONE,
        ));
        let solver = SvSolver::new(q, m);
        let mut u = solver.new_state();
        u.at_mut(0).slice_mut().fill(h0);
        let scheme = RungeKuttaScheme::new(ButcherTableau::from_name("Euler", None).unwrap(), u);
        Simulation::new(
            solver,
            scheme,
            Vec::new(),
            Vec::new(),
            TimestepControl {
                time_step: 0.05,
                max_time_step: 0.2,
                courant_target: 0.9,
            },
        )
    }

    #[test]
    fn test_quiescent_run_completes() {
        let mut sim = simulation(8, 1.0);
        sim.run(0.0, 1.0, 0.5, 1000).unwrap();
        for &h in sim.state().at(0).slice() {
            assert!((h - 1.0).abs() < 1e-5);
        }
    }

    struct CountingSink {
        times: Vec<f64>,
        next: usize,
    }

    impl OutputSink for CountingSink {
        fn next_output_time(&self) -> f64 {
            if self.next < self.times.len() {
                self.times[self.next]
            } else {
                f64::NAN
            }
        }

        fn emit(&mut self, _solver: &SvSolver, _u: &FieldVector<R, 3>) -> MfResult<()> {
            self.next += 1;
            Ok(())
        }
    }

    #[test]
    fn test_oversized_timestep_recovers_by_rejection() {
        // 初始步长远超稳定极限：控制器按 clamp(Co_t/Co, 0.1, 0.9)
        // 连续收缩后接受，静水保持不变
        let mut sim = simulation(8, 1.0);
        sim.control.time_step = 10.0;
        sim.control.max_time_step = 10.0;
        sim.run(0.0, 0.5, 0.5, 1_000_000).unwrap();
        for &h in sim.state().at(0).slice() {
            assert!((h - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_outputs_fire_at_interval_ends() {
        let mut sim = simulation(4, 0.5);
        sim.outputs.push(Box::new(CountingSink {
            times: vec![0.0, 0.5, 1.0],
            next: 0,
        }));
        sim.run(0.0, 1.0, 0.5, 1000).unwrap();
        // 起始 + 两个区间末
        let sink = &sim.outputs[0];
        assert!(sink.next_output_time().is_nan());
    }
}
