// crates/mf_config/src/builder.rs

//! 仿真装配
//!
//! 从上下文读出设备、网格、常量场、初始状态、边界条件、时间格式
//! 与输出驱动，装配成可运行的 [`Simulation`]。
//!
//! 初始条件规则：`h` 与 `stage` 至多其一（stage 时 h = stage − zb
//! 在双精度里计算后降转）；速度在 (u,v) / (qx,qy) / (q,θ) / 无
//! 之间恰取其一，混用报配置错误，(q,θ) 报未实现。

use crate::context::SimulationContext;
use crate::params::{DeviceParameters, DtKind, RunParameters, TimestepParameters};
use glam::DVec2;
use mf_io::output::{CsvOutputFormat, GeometryStyle, OutputDriver};
use mf_io::Config;
use mf_mesh::geometry::parse_wkt_collection;
use mf_mesh::ops::{field_cast, field_difference_to, field_quotient_to};
use mf_mesh::{Cartesian2dMesh, Field, Mapping, MeshSelection};
use mf_physics::boundary::{BoundaryCondition, BoundaryVariable};
use mf_physics::engine::{OutputSink, Simulation, TimestepControl};
use mf_physics::forcing::functor::{RandomDistribution, RandomFunctor};
use mf_physics::forcing::generator::{apply_steps, ModifierStep};
use mf_physics::forcing::{
    set_field_nan, BoxReduction, FieldFunctor, FieldModifier, ModifyOp,
};
use mf_physics::scheme::{ButcherTableau, RungeKuttaScheme};
use mf_physics::{R, SvSolver};
use mf_runtime::{DeviceQueue, MfError, MfResult, Scalar};
use std::sync::Arc;

// =============================================================================
// 选择集
// =============================================================================

/// 解析 `selection` 块；块缺失等同全局选择
pub fn parse_selection(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
    conf: Option<&Config>,
    mapping: Mapping,
) -> MfResult<MeshSelection> {
    let conf = match conf {
        None => return Ok(MeshSelection::global(mesh.clone(), mapping)),
        Some(c) => c,
    };

    let kind = conf.get_or::<String>("value", "global".to_string())?;
    match kind.as_str() {
        "global" | "" => Ok(MeshSelection::global(mesh.clone(), mapping)),
        "id list" => {
            let mut ids = Vec::new();
            for node in conf.children("id") {
                ids.extend(Config::parse_list::<u64>(node.value())?);
            }
            MeshSelection::from_ids(queue.clone(), mesh.clone(), mapping, ids)
        }
        "location list" => {
            let mut locs = Vec::new();
            for node in conf.children("at") {
                let [x, y] = Config::parse_fixed::<f64, 2>(node.value())?;
                locs.push(DVec2::new(x, y));
            }
            MeshSelection::from_locations(queue.clone(), mesh.clone(), mapping, &locs)
        }
        "gis" => {
            let inverted = conf.get_bool_or("inverted", false)?;
            let mut gc = Vec::new();
            for node in conf.children("wkt") {
                gc.extend(parse_wkt_collection(node.value())?);
            }
            if let Some(node) = conf.get_child("filename") {
                let path = ctx.base_path().join(node.value());
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    MfError::io_with(format!("无法读取几何文件 {}", path.display()), e)
                })?;
                gc.extend(parse_wkt_collection(&text)?);
            }
            if gc.is_empty() {
                return Err(MfError::configuration("gis 选择缺少几何"));
            }
            MeshSelection::from_geometry(queue.clone(), mesh.clone(), mapping, &gc, inverted)
        }
        other => Err(MfError::configuration(format!(
            "未知的选择方式: '{}'",
            other
        ))),
    }
}

// =============================================================================
// 函子
// =============================================================================

fn parse_distribution(conf: &Config) -> MfResult<RandomDistribution> {
    let name = conf.get_str("distribution")?;
    match name {
        "uniform" => Ok(RandomDistribution::Uniform {
            min: conf.get::<f64>("min")?,
            max: conf.get::<f64>("max")?,
        }),
        "exponential" => Ok(RandomDistribution::Exponential {
            lambda: conf.get::<f64>("lambda")?,
        }),
        "gamma" => Ok(RandomDistribution::Gamma {
            alpha: conf.get::<f64>("alpha")?,
            beta: conf.get::<f64>("beta")?,
        }),
        "weibull" => Ok(RandomDistribution::Weibull {
            a: conf.get::<f64>("a")?,
            b: conf.get::<f64>("b")?,
        }),
        "extreme value" => Ok(RandomDistribution::ExtremeValue {
            a: conf.get::<f64>("a")?,
            b: conf.get::<f64>("b")?,
        }),
        "normal" => Ok(RandomDistribution::Normal {
            mean: conf.get::<f64>("mean")?,
            std_dev: conf.get::<f64>("std dev")?,
        }),
        "log normal" => Ok(RandomDistribution::LogNormal {
            m: conf.get::<f64>("m")?,
            s: conf.get::<f64>("s")?,
        }),
        "chi squared" => Ok(RandomDistribution::ChiSquared {
            n: conf.get::<f64>("n")?,
        }),
        "cauchy" => Ok(RandomDistribution::Cauchy {
            a: conf.get::<f64>("a")?,
            b: conf.get::<f64>("b")?,
        }),
        "fisher f" => Ok(RandomDistribution::FisherF {
            m: conf.get::<f64>("m")?,
            n: conf.get::<f64>("n")?,
        }),
        "student t" => Ok(RandomDistribution::StudentT {
            n: conf.get::<f64>("n")?,
        }),
        other => Err(MfError::configuration(format!(
            "不支持的随机分布: '{}'",
            other
        ))),
    }
}

/// 按 `type` 键解析函子
pub fn parse_functor(ctx: &SimulationContext, conf: &Config) -> MfResult<FieldFunctor> {
    let kind = conf.get_str("type")?;
    match kind {
        "fixed value" => Ok(FieldFunctor::Fixed(conf.get::<f64>("value")?)),
        "hemisphere" => {
            let [x, y] = conf.get_fixed::<f64, 2>("origin")?;
            Ok(FieldFunctor::Hemisphere {
                origin: DVec2::new(x, y),
                centre_z: conf.get::<f64>("centre z")?,
                radius: conf.get::<f64>("radius")?,
                convex: conf.get_bool_or("convex", true)?,
            })
        }
        "slope" => {
            let [x, y] = conf.get_fixed::<f64, 2>("origin")?;
            let [sx, sy] = conf.get_fixed::<f64, 2>("slope")?;
            Ok(FieldFunctor::Slope {
                origin: DVec2::new(x, y),
                slope: DVec2::new(sx, sy),
                origin_value: conf.get::<f64>("origin value")?,
            })
        }
        "time series" => Ok(FieldFunctor::Series(
            ctx.time_series(conf.get_str("series")?)?,
        )),
        "interpolated time series" => {
            let mut anchors = Vec::new();
            for at in conf.children("at") {
                let [x, y] = at.get_fixed::<f64, 2>("location")?;
                let series = ctx.time_series(at.get_str("series")?)?;
                anchors.push((DVec2::new(x, y), series));
            }
            if anchors.is_empty() {
                return Err(MfError::configuration(
                    "interpolated time series 函子缺少锚点",
                ));
            }
            Ok(FieldFunctor::Interpolated(anchors))
        }
        "random value" => {
            let engine = conf.get_or::<String>("engine", "mersenne twister 1998".to_string())?;
            let seed = Config::parse_list::<u32>(conf.get_str("seed")?)?;
            let dist = parse_distribution(conf)?;
            Ok(FieldFunctor::Random(RandomFunctor::new(
                &engine, &seed, dist,
            )?))
        }
        "raster field" => {
            let raster = ctx.raster_field(conf.get_str("raster field")?)?;
            let reduction = BoxReduction::from_name(
                &conf.get_or::<String>("operation", "mean".to_string())?,
            )?;
            Ok(FieldFunctor::Raster { raster, reduction })
        }
        other => Err(MfError::configuration(format!(
            "未知的场函子类型: '{}'",
            other
        ))),
    }
}

// =============================================================================
// 修改步
// =============================================================================

fn parse_modifier(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
    name: &str,
    conf: &Config,
    mapping: Mapping,
) -> MfResult<FieldModifier> {
    let selection = parse_selection(ctx, queue, mesh, conf.get_child("selection"), mapping)?;
    let modifier = FieldModifier::new(
        name,
        selection,
        conf.get_or::<f64>("offset", 0.0)?,
        conf.get_or::<f64>("factor", 1.0)?,
        conf.get_or::<f64>("minimum", f64::MIN)?,
        conf.get_or::<f64>("maximum", f64::MAX)?,
        conf.get_or::<f64>("nodata", -9999.0)?,
    );
    match conf.get_or::<String>("integration type", "centroid".to_string())?.as_str() {
        "centroid" => Ok(modifier),
        "box" => {
            let box_size = match conf.get_child("box size") {
                Some(node) => {
                    let [bx, by] = Config::parse_fixed::<f64, 2>(node.value())?;
                    Some(DVec2::new(bx, by))
                }
                None => None,
            };
            Ok(modifier.with_box_integration(box_size))
        }
        other => Err(MfError::configuration(format!(
            "未知的取样方式: '{}'",
            other
        ))),
    }
}

/// 把一个场配置块解析成有序修改步
pub fn parse_steps(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
    field_name: &str,
    conf: &Config,
) -> MfResult<Vec<ModifierStep>> {
    let mut steps = Vec::new();
    for (key, step_conf) in conf.entries() {
        if !matches!(key, "set" | "offset" | "factor") {
            continue;
        }
        let op = ModifyOp::from_name(key)?;
        let modifier = parse_modifier(
            ctx,
            queue,
            mesh,
            &format!("{} {}", field_name, key),
            step_conf,
            Mapping::Cell,
        )?;
        let functor = parse_functor(ctx, step_conf)?;
        steps.push(ModifierStep {
            op,
            modifier,
            functor,
        });
    }
    if steps.is_empty() {
        return Err(MfError::configuration(format!(
            "场 '{}' 的配置块不含任何修改步",
            field_name
        )));
    }
    Ok(steps)
}

fn generate_field<T: Scalar>(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
    field: &mut Field<T>,
) -> MfResult<()> {
    if let Some(conf) = ctx.config().get_child(field.name()) {
        let name = field.name().to_string();
        let steps = parse_steps(ctx, queue, mesh, &name, conf)?;
        apply_steps(field, &steps, 0.0)?;
    }
    Ok(())
}

// =============================================================================
// 初始状态
// =============================================================================

fn build_initial_state(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
    solver: &mut SvSolver,
) -> MfResult<mf_mesh::FieldVector<R, 3>> {
    let conf = ctx.config();
    let mut state = solver.new_state();

    // 水深：h 与 stage 至多其一
    let depth_given = conf.count("h") > 0;
    let stage_given = conf.count("stage") > 0;
    if depth_given && stage_given {
        return Err(MfError::configuration(
            "初始条件冲突：h 与 stage 只能指定其一",
        ));
    }
    if depth_given {
        generate_field(ctx, queue, mesh, state.at_mut(0))?;
    } else if stage_given {
        // stage − zb 在双精度里计算后降转
        let mut stage64 = Field::<f64>::new(
            queue.clone(),
            "stage",
            mesh.clone(),
            Mapping::Cell,
            true,
            0.0,
        );
        generate_field(ctx, queue, mesh, &mut stage64)?;
        let zb64: Field<f64> = field_cast("zb64", solver.zbed().at(0))?;
        field_difference_to(&stage64, &zb64, state.at_mut(0))?;
    }

    // 速度：恰取一种指定方式
    let check_pair = |a: &str, b: &str| -> MfResult<bool> {
        match (conf.count(a) > 0, conf.count(b) > 0) {
            (true, true) => Ok(true),
            (false, false) => Ok(false),
            _ => Err(MfError::configuration(format!(
                "初始条件 {} 与 {} 必须成对指定",
                a, b
            ))),
        }
    };
    let uv_given = check_pair("u", "v")?;
    let q_given = check_pair("qx", "qy")?;
    let qth_given = check_pair("q", "theta")?;
    let kinds = [uv_given, q_given, qth_given].iter().filter(|&&b| b).count();
    if kinds > 1 {
        return Err(MfError::configuration(
            "初始条件冲突：速度只能用一种方式指定",
        ));
    }

    if uv_given {
        generate_field(ctx, queue, mesh, state.at_mut(1))?;
        generate_field(ctx, queue, mesh, state.at_mut(2))?;
    } else if q_given {
        let mut qx = Field::<R>::new(queue.clone(), "qx", mesh.clone(), Mapping::Cell, true, 0.0);
        let mut qy = Field::<R>::new(queue.clone(), "qy", mesh.clone(), Mapping::Cell, true, 0.0);
        generate_field(ctx, queue, mesh, &mut qx)?;
        generate_field(ctx, queue, mesh, &mut qy)?;
        let h = state.at(0).clone();
        field_quotient_to(&qx, &h, state.at_mut(1))?;
        field_quotient_to(&qy, &h, state.at_mut(2))?;
    } else if qth_given {
        return Err(MfError::not_implemented("(q, theta) 初速指定方式暂不可用"));
    }

    // 停用区域：zb 与 (h, u, v) 全部置 NaN
    for deact in conf.children("deactivate") {
        let selection = parse_selection(ctx, queue, mesh, Some(deact), Mapping::Cell)?;
        tracing::info!(cells = selection.size(), "停用网格区域");
        set_field_nan(&selection, solver.zbed_mut().at_mut(0))?;
        set_field_nan(&selection, state.at_mut(0))?;
        set_field_nan(&selection, state.at_mut(1))?;
        set_field_nan(&selection, state.at_mut(2))?;
    }

    Ok(state)
}

// =============================================================================
// 边界与输出
// =============================================================================

fn build_boundaries(
    ctx: &SimulationContext,
    queue: &Arc<DeviceQueue>,
    mesh: &Arc<Cartesian2dMesh>,
) -> MfResult<Vec<BoundaryCondition>> {
    let mut boundaries = Vec::new();
    for conf in ctx.config().children("boundary") {
        let variable = BoundaryVariable::from_name(conf.get_str("value")?)?;
        let name = conf.get_or::<String>("name", "anon".to_string())?;
        let selection =
            parse_selection(ctx, queue, mesh, conf.get_child("selection"), Mapping::Cell)?;
        let values = conf.child("values")?;
        let functor = parse_functor(ctx, values)?;
        let modifier = FieldModifier::new(
            name.clone(),
            selection,
            values.get_or::<f64>("offset", 0.0)?,
            values.get_or::<f64>("factor", 1.0)?,
            values.get_or::<f64>("minimum", f64::MIN)?,
            values.get_or::<f64>("maximum", f64::MAX)?,
            values.get_or::<f64>("nodata", f64::MIN)?,
        );
        tracing::info!(boundary = %name, ?variable, "创建边界条件");
        boundaries.push(BoundaryCondition::new(name, variable, modifier, functor));
    }
    Ok(boundaries)
}

fn build_outputs(
    ctx: &SimulationContext,
    run: &RunParameters,
) -> MfResult<Vec<Box<dyn OutputSink>>> {
    let mut outputs: Vec<Box<dyn OutputSink>> = Vec::new();
    for conf in ctx.config().children("output") {
        let style = GeometryStyle::from_name(&conf.get_or::<String>(
            "geometry",
            "xyz".to_string(),
        )?)?;
        let format_name = conf.get_or::<String>("format", "csv".to_string())?;
        let default_delim = match format_name.as_str() {
            "csv" => ", ",
            "tsv" => "\t",
            other => {
                return Err(MfError::configuration(format!(
                    "未知的输出格式: '{}'",
                    other
                )))
            }
        };
        let delimiter = conf
            .get_child("delimiter")
            .map(|n| n.value().to_string())
            .unwrap_or_else(|| default_delim.to_string());

        let directory = match conf.get_child("directory") {
            Some(node) => ctx.base_path().join(node.value()),
            None => ctx.output_directory()?,
        };
        let prefix = conf.get_or::<String>("prefix", String::new())?;
        let suffix = conf.get_or::<String>("suffix", ".txt".to_string())?;
        let format = CsvOutputFormat::new(style, delimiter, directory, prefix, suffix);

        let factor = ctx.time_unit_factor(conf)?;
        let start_time = match conf.get_child("start time") {
            Some(node) => {
                node.value().parse::<f64>().map_err(|_| {
                    MfError::configuration(format!(
                        "输出 start time '{}' 无法解析",
                        node.value()
                    ))
                })? * factor
            }
            None => run.start_time,
        };
        let end_time = match conf.get_child("end time") {
            Some(node) => {
                node.value().parse::<f64>().map_err(|_| {
                    MfError::configuration(format!(
                        "输出 end time '{}' 无法解析",
                        node.value()
                    ))
                })? * factor
            }
            None => run.end_time,
        };
        let interval = conf.get::<f64>("interval")? * factor;
        if interval <= 0.0 {
            return Err(MfError::configuration("输出 interval 必须为正"));
        }

        let variables: Vec<String> = conf
            .get_or::<String>("variables", "depth".to_string())?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        outputs.push(Box::new(OutputDriver::new(
            format, start_time, end_time, interval, factor, variables,
        )));
    }
    Ok(outputs)
}

// =============================================================================
// 总装
// =============================================================================

/// 从上下文装配完整仿真；一并返回解析好的运行参数
pub fn build_simulation(ctx: &SimulationContext) -> MfResult<(Simulation, RunParameters)> {
    let device = DeviceParameters::from_config(ctx.config())?;
    let queue = Arc::new(DeviceQueue::new(mf_runtime::queue::DeviceInfo {
        platform_id: device.platform_id,
        device_id: device.device_id,
        name: device.name.clone(),
        threads: device.threads,
    })?);

    let mesh_conf = ctx.config().child("mesh")?;
    let [nx, ny] = mesh_conf.get_fixed::<usize, 2>("cell count")?;
    let [x0, y0] = mesh_conf.get_fixed::<f64, 2>("origin")?;
    let [dx, dy] = mesh_conf.get_fixed::<f64, 2>("cell size")?;
    if nx == 0 || ny == 0 || dx <= 0.0 || dy <= 0.0 {
        return Err(MfError::configuration(format!(
            "网格参数退化: {}×{} 单元，尺寸 {}×{}",
            nx, ny, dx, dy
        )));
    }
    let mesh = Arc::new(Cartesian2dMesh::new(
        nx,
        ny,
        DVec2::new(x0, y0),
        DVec2::new(dx, dy),
    ));

    let mut solver = SvSolver::new(queue.clone(), mesh.clone());

    // 常量场
    generate_field(ctx, &queue, &mesh, solver.zbed_mut().at_mut(0))?;
    for i in 0..4 {
        generate_field(ctx, &queue, &mesh, solver.manning_mut().at_mut(i))?;
    }

    let state = build_initial_state(ctx, &queue, &mesh, &mut solver)?;
    let boundaries = build_boundaries(ctx, &queue, &mesh)?;

    let run = RunParameters::from_config(ctx.config(), ctx.global_time_factor())?;
    let ts = TimestepParameters::from_config(ctx.config())?;
    if ts.kind == DtKind::Fixed {
        return Err(MfError::not_implemented("固定步长模式暂不可用"));
    }

    let tableau = ButcherTableau::from_name(&ts.scheme_method, ts.scheme_alpha)?;
    tableau.print();
    let scheme = RungeKuttaScheme::new(tableau, state);

    let outputs = build_outputs(ctx, &run)?;

    let simulation = Simulation::new(
        solver,
        scheme,
        boundaries,
        outputs,
        TimestepControl {
            time_step: ts.time_step,
            max_time_step: ts.max_time_step,
            courant_target: ts.courant_target,
        },
    );

    Ok((simulation, run))
}

/// 按 `check files` 配置写出检查文件
pub fn write_check_files(ctx: &SimulationContext, simulation: &Simulation) -> MfResult<()> {
    let conf = match ctx.config().get_child("check files") {
        None => return Ok(()),
        Some(c) => c,
    };
    let check_path = ctx.check_file_path()?;
    if conf.count("mesh") > 0 {
        mf_io::check::write_mesh_check_files(simulation.solver().mesh(), &check_path)?;
    }
    if conf.count("active") > 0 {
        mf_io::check::write_active_check(simulation.solver(), &check_path)?;
    }
    if conf.count("cell constants") > 0 {
        mf_io::check::write_constants_check(simulation.solver(), &check_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx(text: &str) -> SimulationContext {
        SimulationContext::new(
            Config::parse(text).unwrap(),
            PathBuf::from("."),
            "test".to_string(),
        )
        .unwrap()
    }

    const BASE: &str = r#"
mesh {
  cell count == 10 1
  origin == 0 0
  cell size == 1 1
}
run parameters {
  end time == 1
  sync step seconds == 0.5
}
timestep parameters {
  time step == 0.05
  max time step == 0.2
  courant target == 0.9
  ddt scheme {
    runge kutta {
      method == Heun
    }
  }
}
"#;

    #[test]
    fn test_minimal_build() {
        let c = ctx(BASE);
        let (sim, run) = build_simulation(&c).unwrap();
        assert_eq!(run.sync_step, 0.5);
        assert_eq!(sim.state().len(), 10);
        assert_eq!(sim.solver().mesh().cell_count(), 10);
    }

    #[test]
    fn test_initial_depth_from_config() {
        let text = format!(
            "{}\nh {{\n set {{\n  type == fixed value\n  value == 0.75\n }}\n}}",
            BASE
        );
        let c = ctx(&text);
        let (sim, _) = build_simulation(&c).unwrap();
        assert!(sim.state().at(0).slice().iter().all(|&h| h == 0.75));
    }

    #[test]
    fn test_stage_minus_bed() {
        let text = format!(
            "{}\nzb {{\n set {{\n  type == slope\n  origin == 0 0\n  slope == 0.01 0\n  origin value == 0\n }}\n}}\nstage {{\n set {{\n  type == fixed value\n  value == 0.5\n }}\n}}",
            BASE
        );
        let c = ctx(&text);
        let (sim, _) = build_simulation(&c).unwrap();
        let h = sim.state().at(0).slice();
        // h = 0.5 − zb(x)；第一个单元中心 x = 0.5
        assert!((h[0] - (0.5 - 0.005)).abs() < 1e-6);
        assert!((h[9] - (0.5 - 0.095)).abs() < 1e-6);
    }

    #[test]
    fn test_depth_and_stage_conflict() {
        let text = format!(
            "{}\nh {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}\nstage {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}",
            BASE
        );
        let err = build_simulation(&ctx(&text)).unwrap_err();
        assert!(matches!(err, MfError::Configuration { .. }));
    }

    #[test]
    fn test_velocity_pair_enforced() {
        let text = format!(
            "{}\nu {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}",
            BASE
        );
        let err = build_simulation(&ctx(&text)).unwrap_err();
        assert!(matches!(err, MfError::Configuration { .. }));
    }

    #[test]
    fn test_q_theta_not_implemented() {
        let text = format!(
            "{}\nq {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}\ntheta {{\n set {{\n  type == fixed value\n  value == 0\n }}\n}}",
            BASE
        );
        let err = build_simulation(&ctx(&text)).unwrap_err();
        assert!(matches!(err, MfError::NotImplemented { .. }));
    }

    #[test]
    fn test_fixed_timestep_not_implemented() {
        let text = BASE.replace("time step == 0.05", "value == fixed\n  time step == 0.05");
        let err = build_simulation(&ctx(&text)).unwrap_err();
        assert!(matches!(err, MfError::NotImplemented { .. }));
    }

    #[test]
    fn test_deactivate_sets_nan() {
        let text = format!(
            "{}\nh {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}\ndeactivate {{\n value == id list\n id == 3 4\n}}",
            BASE
        );
        let (sim, _) = build_simulation(&ctx(&text)).unwrap();
        let h = sim.state().at(0).slice();
        assert!(h[3].is_nan());
        assert!(h[4].is_nan());
        assert_eq!(h[0], 1.0);
        assert!(sim.solver().zbed().at(0).slice()[3].is_nan());
    }

    #[test]
    fn test_qx_qy_divided_by_depth() {
        let text = format!(
            "{}\nh {{\n set {{\n  type == fixed value\n  value == 2\n }}\n}}\nqx {{\n set {{\n  type == fixed value\n  value == 1\n }}\n}}\nqy {{\n set {{\n  type == fixed value\n  value == 0.5\n }}\n}}",
            BASE
        );
        let (sim, _) = build_simulation(&ctx(&text)).unwrap();
        assert!(sim
            .state()
            .at(1)
            .slice()
            .iter()
            .all(|&u| (u - 0.5).abs() < 1e-6));
        assert!(sim
            .state()
            .at(2)
            .slice()
            .iter()
            .all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_boundary_built_from_config() {
        let text = format!(
            "{}\nboundary {{\n value == source\n name == rain\n values {{\n  type == fixed value\n  value == 0.01\n }}\n}}",
            BASE
        );
        let (sim, run) = build_simulation(&ctx(&text)).unwrap();
        assert_eq!(run.display_every, 1);
        // 边界在装配后尚未写入；运行一步后 Q_in 被填充
        let mut sim = sim;
        sim.run(0.0, 0.5, 0.5, 1000).unwrap();
        assert!(sim.solver().q_in().at(0).slice().iter().all(|&q| q == 0.01));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let text = BASE.replace("method == Heun", "method == leapfrog");
        assert!(build_simulation(&ctx(&text)).is_err());
    }
}
