// crates/mf_physics/src/scheme/runge_kutta.rs

//! S 级显式 Runge-Kutta 推进
//!
//! 第 i 遍（i = 0..=S）形成 `U* = U + Δt·Σ_{j<i} a[i][j]·k_j` 并做
//! 非负截断；i < S 时随即在 `t + c[i]·Δt` 处求 `k_i`。最后一遍后
//! U* 即候选推进状态，`accept_step` 把它换入 U。
//!
//! 截断规则：`h < 0 ⇒ (h,u,v) := 0`；`h < εdry ⇒ u = v := 0`。
//! NaN（停用单元）两个比较都不成立，原样保留。

use super::tableau::ButcherTableau;
use crate::solver::SvSolver;
use crate::{H_DRY, R};
use mf_mesh::FieldVector;
use mf_runtime::Scalar;

/// Runge-Kutta 时间推进器
pub struct RungeKuttaScheme {
    tableau: ButcherTableau,
    u: FieldVector<R, 3>,
    ustar: FieldVector<R, 3>,
    dudt: Vec<FieldVector<R, 3>>,
}

impl RungeKuttaScheme {
    /// 用系数表与初始状态创建
    pub fn new(tableau: ButcherTableau, initial: FieldVector<R, 3>) -> Self {
        let ustar = FieldVector::derived("", &initial, "*");
        let dudt = (0..tableau.stages())
            .map(|i| FieldVector::derived("(d", &initial, &format!("⁄dt)_{}", i)))
            .collect();
        Self {
            tableau,
            u: initial,
            ustar,
            dudt,
        }
    }

    /// 系数表
    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    /// 当前解状态 U
    pub fn state(&self) -> &FieldVector<R, 3> {
        &self.u
    }

    /// 当前解状态（可写，装配期使用）
    pub fn state_mut(&mut self) -> &mut FieldVector<R, 3> {
        &mut self.u
    }

    /// 候选推进状态 U*
    pub fn candidate(&self) -> &FieldVector<R, 3> {
        &self.ustar
    }

    /// 执行一个完整的 S 级推进，留下候选状态 U*
    pub fn step(
        &mut self,
        solver: &mut SvSolver,
        time_now: f64,
        timestep: f64,
        bdy_t0: f64,
        bdy_t1: f64,
    ) {
        for stage in 0..=self.tableau.stages() {
            self.update_ustar(solver, stage, time_now, timestep, bdy_t0, bdy_t1);
        }
    }

    fn update_ustar(
        &mut self,
        solver: &mut SvSolver,
        stage: usize,
        time_now: f64,
        timestep: f64,
        bdy_t0: f64,
        bdy_t1: f64,
    ) {
        let stages = self.tableau.stages();
        let queue = self.u.queue().clone();

        {
            let a_row = self.tableau.a(stage);
            let u_h = self.u.at(0).slice();
            let u_u = self.u.at(1).slice();
            let u_v = self.u.at(2).slice();
            let k_h: Vec<&[R]> = self.dudt[..stage].iter().map(|k| k.at(0).slice()).collect();
            let k_u: Vec<&[R]> = self.dudt[..stage].iter().map(|k| k.at(1).slice()).collect();
            let k_v: Vec<&[R]> = self.dudt[..stage].iter().map(|k| k.at(2).slice()).collect();

            let [s_h, s_u, s_v] = self.ustar.slices_mut();
            let eps = R::of(H_DRY);

            queue.parallel_zip3(s_h, s_u, s_v, |i, hh, uu, vv| {
                let mut h = u_h[i];
                let mut u = u_u[i];
                let mut v = u_v[i];
                for j in 0..stage {
                    let w = R::of(timestep * a_row[j]);
                    h += w * k_h[j][i];
                    u += w * k_u[j][i];
                    v += w * k_v[j][i];
                }

                if h < 0.0 {
                    h = 0.0;
                    u = 0.0;
                    v = 0.0;
                } else if h < eps {
                    u = 0.0;
                    v = 0.0;
                }

                *hh = h;
                *uu = u;
                *vv = v;
            });
        }

        if stage < stages {
            let stage_time = time_now + self.tableau.c(stage) * timestep;
            solver.update_ddt(
                &self.ustar,
                &mut self.dudt[stage],
                stage_time,
                timestep,
                bdy_t0,
                bdy_t1,
            );
        }
    }

    /// 接受候选状态：交换 U 与 U*
    pub fn accept_step(&mut self) {
        self.u.swap_with(&mut self.ustar);
    }
}
