// crates/mf_physics/src/scheme/tableau.rs

//! Butcher 系数表
//!
//! `a` 有 S+1 行：前 S 行是级内系数（第 i 行只用前 i 个），
//! 最后一行是组合权重 b；`c` 是各级取样时刻。

use mf_runtime::{MfError, MfResult};

/// Butcher 系数表
#[derive(Debug, Clone)]
pub struct ButcherTableau {
    name: String,
    stages: usize,
    a: Vec<Vec<f64>>,
    c: Vec<f64>,
}

impl ButcherTableau {
    fn build(name: &str, a: Vec<Vec<f64>>, c: Vec<f64>) -> Self {
        let stages = c.len();
        debug_assert_eq!(a.len(), stages + 1);
        Self {
            name: name.to_string(),
            stages,
            a,
            c,
        }
    }

    /// 按配置名创建；generic 格式需要 `alpha`
    pub fn from_name(method: &str, alpha: Option<f64>) -> MfResult<Self> {
        let need_alpha = || {
            alpha.ok_or_else(|| {
                MfError::configuration(format!("时间格式 '{}' 需要 alpha 参数", method))
            })
        };

        match method {
            "Euler" => Ok(Self::build(method, vec![vec![0.0], vec![1.0]], vec![0.0])),
            "midpoint" => Ok(Self::build(
                method,
                vec![vec![0.0, 0.0], vec![0.5, 0.0], vec![0.0, 1.0]],
                vec![0.0, 0.5],
            )),
            "Heun" => Ok(Self::build(
                method,
                vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.5, 0.5]],
                vec![0.0, 1.0],
            )),
            "Ralston" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0],
                    vec![2.0 / 3.0, 0.0],
                    vec![0.25, 0.75],
                ],
                vec![0.0, 2.0 / 3.0],
            )),
            "generic2" => {
                let alpha = need_alpha()?;
                Ok(Self::build(
                    method,
                    vec![
                        vec![0.0, 0.0],
                        vec![alpha, 0.0],
                        vec![1.0 - 1.0 / (2.0 * alpha), 1.0 / (2.0 * alpha)],
                    ],
                    vec![0.0, alpha],
                ))
            }
            "Kutta3" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![0.5, 0.0, 0.0],
                    vec![-1.0, 2.0, 0.0],
                    vec![1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0],
                ],
                vec![0.0, 0.5, 1.0],
            )),
            "Heun3" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![1.0 / 3.0, 0.0, 0.0],
                    vec![0.0, 2.0 / 3.0, 0.0],
                    vec![0.25, 0.0, 0.75],
                ],
                vec![0.0, 1.0 / 3.0, 2.0 / 3.0],
            )),
            "Ralston3" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![0.5, 0.0, 0.0],
                    vec![0.0, 0.75, 0.0],
                    vec![2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
                ],
                vec![0.0, 0.5, 0.75],
            )),
            "SSPRK3" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![1.0, 0.0, 0.0],
                    vec![0.25, 0.25, 0.0],
                    vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
                ],
                vec![0.0, 1.0, 0.5],
            )),
            "generic3" => {
                let alpha = need_alpha()?;
                Ok(Self::build(
                    method,
                    vec![
                        vec![0.0, 0.0, 0.0],
                        vec![alpha, 0.0, 0.0],
                        vec![
                            1.0 + (1.0 - alpha) / (alpha * (3.0 * alpha - 2.0)),
                            -(1.0 - alpha) / (alpha * (3.0 * alpha - 2.0)),
                            0.0,
                        ],
                        vec![
                            0.5 - 1.0 / (6.0 * alpha),
                            1.0 / (6.0 * alpha * (1.0 - alpha)),
                            (2.0 - 3.0 * alpha) / (6.0 * (1.0 - alpha)),
                        ],
                    ],
                    vec![0.0, alpha, 1.0],
                ))
            }
            "classic" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0, 0.0],
                    vec![0.5, 0.0, 0.0, 0.0],
                    vec![0.0, 0.5, 0.0, 0.0],
                    vec![0.0, 0.0, 1.0, 0.0],
                    vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
                ],
                vec![0.0, 0.5, 0.5, 1.0],
            )),
            "Ralston4" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0, 0.0],
                    vec![0.4, 0.0, 0.0, 0.0],
                    vec![0.29697761, 0.15875964, 0.0, 0.0],
                    vec![0.21810040, -3.05096516, 3.83286476, 0.0],
                    vec![0.17476028, -0.55148066, 1.20553560, 0.17118478],
                ],
                vec![0.0, 0.4, 0.45573725, 1.0],
            )),
            "3/8" => Ok(Self::build(
                method,
                vec![
                    vec![0.0, 0.0, 0.0, 0.0],
                    vec![1.0 / 3.0, 0.0, 0.0, 0.0],
                    vec![-1.0 / 3.0, 1.0, 0.0, 0.0],
                    vec![1.0, -1.0, 1.0, 0.0],
                    vec![1.0 / 8.0, 3.0 / 8.0, 3.0 / 8.0, 1.0 / 8.0],
                ],
                vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0],
            )),
            other => Err(MfError::configuration(format!(
                "未知的时间格式: '{}'",
                other
            ))),
        }
    }

    /// 格式名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 级数 S
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// 第 i 行系数（i = S 为组合权重）
    pub fn a(&self, i: usize) -> &[f64] {
        &self.a[i]
    }

    /// 第 i 级取样时刻
    pub fn c(&self, i: usize) -> f64 {
        self.c[i]
    }

    /// 把 Butcher 表打印到标准输出
    pub fn print(&self) {
        println!("Runge-Kutta 格式 '{}' 的 Butcher 表:", self.name);
        for i in 0..self.stages {
            print!("{:>10.6} │ ", self.c[i]);
            for j in 0..i {
                print!("{:>10.6} ", self.a[i][j]);
            }
            println!();
        }
        println!("{}─┼─{}", "─".repeat(10), "─".repeat(11 * self.stages));
        print!("{} │ ", " ".repeat(10));
        for j in 0..self.stages {
            print!("{:>10.6} ", self.a[self.stages][j]);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: [(&str, usize); 11] = [
        ("Euler", 1),
        ("midpoint", 2),
        ("Heun", 2),
        ("Ralston", 2),
        ("Kutta3", 3),
        ("Heun3", 3),
        ("Ralston3", 3),
        ("SSPRK3", 3),
        ("classic", 4),
        ("Ralston4", 4),
        ("3/8", 4),
    ];

    #[test]
    fn test_named_schemes_available() {
        for (name, stages) in NAMED {
            let t = ButcherTableau::from_name(name, None).unwrap();
            assert_eq!(t.stages(), stages, "{}", name);
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for (name, stages) in NAMED {
            let t = ButcherTableau::from_name(name, None).unwrap();
            let sum: f64 = t.a(stages).iter().sum();
            assert!((sum - 1.0).abs() < 1e-7, "{}: Σb = {}", name, sum);
        }
    }

    #[test]
    fn test_c_matches_row_sums() {
        // 一致性条件 c_i = Σ_j a_ij（本表全部满足）
        for (name, stages) in NAMED {
            let t = ButcherTableau::from_name(name, None).unwrap();
            for i in 0..stages {
                let sum: f64 = t.a(i)[..i].iter().sum();
                assert!((sum - t.c(i)).abs() < 1e-6, "{} 第 {} 级", name, i);
            }
        }
    }

    #[test]
    fn test_generic_schemes_need_alpha() {
        assert!(ButcherTableau::from_name("generic2", None).is_err());
        assert!(ButcherTableau::from_name("generic3", None).is_err());
        let g2 = ButcherTableau::from_name("generic2", Some(0.5)).unwrap();
        assert_eq!(g2.stages(), 2);
        // α = 0.5 即 midpoint
        assert!((g2.a(2)[1] - 1.0).abs() < 1e-12);
        let g3 = ButcherTableau::from_name("generic3", Some(0.5)).unwrap();
        let sum: f64 = g3.a(3).iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let err = ButcherTableau::from_name("leapfrog", None).unwrap_err();
        assert!(matches!(err, MfError::Configuration { .. }));
    }
}
