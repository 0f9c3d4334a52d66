use membrane_sim::simulation::field::{height, gradient, mechanical_energy};
use membrane_sim::simulation::forces::acceleration;
use membrane_sim::simulation::integrator::{step, Scheme};
use membrane_sim::simulation::events::{check, OutcomeKind};
use membrane_sim::simulation::runner::{run, Simulation, Status};
use membrane_sim::{NVec2, PhysicalParameters, Scenario, ScenarioConfig, SimError, SimulationConfig, State, StepResult};

/// Reference system: unit membrane, light ball, no drag
pub fn unit_membrane() -> PhysicalParameters {
    PhysicalParameters {
        central_mass: 1.0,
        central_radius: 0.01,
        membrane_radius: 1.0,
        tension: 1.0,
        gravity: 9.8,
        ball_mass: 0.001,
        drag: 0.0,
    }
}

/// Speed of a circular orbit; independent of radius for the log well
pub fn circular_speed(p: &PhysicalParameters) -> f64 {
    (p.gravity * p.field_coefficient()).sqrt()
}

pub fn rk4(dt: f64, t_max: f64) -> SimulationConfig {
    SimulationConfig::new(dt, t_max, Scheme::Rk4)
}

pub fn euler(dt: f64, t_max: f64) -> SimulationConfig {
    SimulationConfig::new(dt, t_max, Scheme::Euler)
}

fn state(x: f64, y: f64, vx: f64, vy: f64) -> State {
    State::new(0.0, NVec2::new(x, y), NVec2::new(vx, vy))
}

// ==================================================================================
// Deformation field tests
// ==================================================================================

#[test]
fn field_is_zero_on_rim_and_sinks_toward_centre() {
    let p = unit_membrane();

    assert!(height(&p, 1.0, 0.0).unwrap().abs() < 1e-15);
    let z_mid = height(&p, 0.5, 0.0).unwrap();
    let z_deep = height(&p, 0.1, 0.0).unwrap();
    assert!(z_mid < 0.0);
    assert!(z_deep < z_mid, "membrane should deepen toward the centre");

    // axisymmetric
    let z_diag = height(&p, 0.5 / 2f64.sqrt(), 0.5 / 2f64.sqrt()).unwrap();
    assert!((z_diag - z_mid).abs() < 1e-12);
}

#[test]
fn field_gradient_is_radial_with_magnitude_k_over_r() {
    let p = unit_membrane();
    let pos = NVec2::new(0.3, -0.4);
    let grad = gradient(&p, pos.x, pos.y).unwrap();

    let expected = p.field_coefficient() / pos.norm();
    assert!((grad.norm() - expected).abs() < 1e-12);
    // parallel to the position vector, uphill toward the rim
    assert!((grad.x * pos.y - grad.y * pos.x).abs() < 1e-12);
    assert!(grad.dot(&pos) > 0.0);
}

#[test]
fn field_rejects_forbidden_core() {
    let p = unit_membrane();

    assert!(matches!(height(&p, 0.0, 0.0), Err(SimError::Domain { .. })));
    assert!(matches!(gradient(&p, 0.004, 0.0), Err(SimError::Domain { .. })));
    // between r_c / 2 and r_c is still evaluable
    assert!(gradient(&p, 0.006, 0.0).is_ok());
}

// ==================================================================================
// Force model tests
// ==================================================================================

#[test]
fn slope_pulls_toward_centre() {
    let p = unit_membrane();
    let s = state(0.5, 0.0, 0.0, 0.0);
    let a = acceleration(&p, &s).unwrap();

    let expected = p.gravity * p.field_coefficient() / 0.5;
    assert!(a.x < 0.0);
    assert!((a.x + expected).abs() < 1e-12);
    assert!(a.y.abs() < 1e-15);
}

#[test]
fn drag_opposes_velocity() {
    let mut p = unit_membrane();
    p.drag = 0.002;
    let still = state(0.5, 0.0, 0.0, 0.0);
    let moving = state(0.5, 0.0, 0.0, 3.0);

    let diff = acceleration(&p, &moving).unwrap() - acceleration(&p, &still).unwrap();
    // -(c / m_p) v = -2 * 3
    assert!(diff.x.abs() < 1e-12);
    assert!((diff.y + 6.0).abs() < 1e-12);
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn euler_updates_velocity_before_position() {
    let p = unit_membrane();
    let s = state(0.5, 0.0, 0.0, 0.6);
    let dt = 0.01;
    let a = acceleration(&p, &s).unwrap();

    let next = step(&p, &euler(dt, 1.0), &s).unwrap();
    let vel = s.vel + dt * a;
    let pos = s.pos + dt * vel;

    assert_eq!(next.state.vel, vel);
    assert_eq!(next.state.pos, pos);
    assert!((next.state.t - dt).abs() < 1e-15);
    assert!((next.r - pos.norm()).abs() < 1e-15);
}

#[test]
fn step_is_deterministic() {
    let mut p = unit_membrane();
    p.drag = 0.0003;
    let s = state(0.42, -0.17, 1.1, 2.3);

    for config in [euler(0.003, 1.0), rk4(0.003, 1.0)] {
        let a: StepResult = step(&p, &config, &s).unwrap();
        let b: StepResult = step(&p, &config, &s).unwrap();
        assert_eq!(a.state.pos.x.to_bits(), b.state.pos.x.to_bits());
        assert_eq!(a.state.pos.y.to_bits(), b.state.pos.y.to_bits());
        assert_eq!(a.state.vel.x.to_bits(), b.state.vel.x.to_bits());
        assert_eq!(a.state.vel.y.to_bits(), b.state.vel.y.to_bits());
        assert_eq!(a.r.to_bits(), b.r.to_bits());
    }
}

#[test]
fn rk4_is_fourth_order() {
    let p = unit_membrane();
    let v = circular_speed(&p);
    let s = state(0.5, 0.0, 0.0, v);

    // the exact circular orbit is known in closed form
    let omega = v / 0.5;
    let t_end = 0.1;
    let exact = NVec2::new(0.5 * (omega * t_end).cos(), 0.5 * (omega * t_end).sin());

    let error = |dt: f64| {
        let traj = run(&p, &rk4(dt, t_end), s).unwrap();
        (traj.final_state().pos - exact).norm()
    };
    let ratio = error(0.01) / error(0.005);
    assert!(ratio > 12.0 && ratio < 20.0, "error ratio {ratio}");
}

#[test]
fn rk4_conserves_energy_without_drag() {
    let p = unit_membrane();
    let v = circular_speed(&p);
    let s = state(0.5, 0.0, 0.0, v);
    let dt = 1e-3;
    let omega = v / 0.5;

    let traj = run(&p, &rk4(dt, 0.5), s).unwrap();
    let energies = traj.energies(&p).unwrap();
    let e0 = energies[0];
    let drift = energies.iter().map(|e| (e - e0).abs()).fold(0.0, f64::max);

    let tol = 100.0 * (dt * omega).powi(4) * e0.abs();
    assert!(drift < tol, "RK4 energy drift {drift:e} above {tol:e}");
}

#[test]
fn symplectic_euler_conserves_energy_approximately() {
    let p = unit_membrane();
    let v = circular_speed(&p);
    let s = state(0.5, 0.0, 0.0, v);
    let dt = 1e-3;
    let omega = v / 0.5;

    let traj = run(&p, &euler(dt, 0.5), s).unwrap();
    let e0 = mechanical_energy(&p, &s).unwrap();
    let drift = traj
        .energies(&p)
        .unwrap()
        .iter()
        .map(|e| (e - e0).abs())
        .fold(0.0, f64::max);

    let tol = 50.0 * (dt * omega).powi(2) * e0.abs();
    assert!(drift < tol, "Euler energy drift {drift:e} above {tol:e}");
}

// ==================================================================================
// Event detector tests
// ==================================================================================

#[test]
fn check_ignores_steps_inside_annulus() {
    let p = unit_membrane();
    let config = rk4(1e-3, 1.0);
    let s = state(0.5, 0.0, 0.0, 0.6);
    let next = step(&p, &config, &s).unwrap();

    assert!(check(&p, &config, &s, &next).unwrap().is_none());
}

#[test]
fn check_refines_escape_to_boundary() {
    let p = unit_membrane();
    let config = rk4(0.05, 1.0);
    let prev = state(0.9, 0.0, 4.0, 0.5);
    let next = step(&p, &config, &prev).unwrap();
    assert!(next.r > 1.0, "coarse step should overshoot the rim");

    let outcome = check(&p, &config, &prev, &next).unwrap().expect("escape");
    assert_eq!(outcome.kind, OutcomeKind::Escaped);
    assert!((outcome.state.radius() - 1.0).abs() <= 1e-6);
    assert!(outcome.time > prev.t && outcome.time < next.state.t);
    assert_eq!(outcome.time, outcome.state.t);
}

#[test]
fn check_catches_step_through_central_mass() {
    let p = unit_membrane();
    let config = euler(0.005, 1.0);
    // fast radial plunge: one coarse step jumps from one side of the centre to the other
    let prev = state(0.02, 0.0, -10.0, 0.0);
    let next = step(&p, &config, &prev).unwrap();
    assert!(next.state.pos.x < 0.0 && next.r > p.central_radius);

    let outcome = check(&p, &config, &prev, &next).unwrap().expect("collision");
    assert_eq!(outcome.kind, OutcomeKind::Collided);
    assert!((outcome.state.radius() - p.central_radius).abs() < 2e-6);
    assert!(outcome.state.pos.x > 0.0, "collision reported on the far side");
    assert!(outcome.time > prev.t && outcome.time < next.state.t);
}

#[test]
fn check_ignores_close_pass_outside_collision_radius() {
    let p = unit_membrane();
    let config = rk4(1e-3, 1.0);
    // tangential pass at twice the collision radius
    let prev = state(0.02, -0.004, 0.0, 4.0);
    let next = step(&p, &config, &prev).unwrap();

    assert!(check(&p, &config, &prev, &next).unwrap().is_none());
}

#[test]
fn collision_radius_inside_core_is_rejected() {
    let p = unit_membrane();
    let config = rk4(1e-3, 1.0).with_boundaries(0.004, 1.0);
    assert!(matches!(
        run(&p, &config, state(0.5, 0.0, 0.0, 0.0)),
        Err(SimError::InvalidBoundary { .. })
    ));
}

#[test]
fn check_rejects_inverted_boundaries() {
    let p = unit_membrane();
    let config = rk4(1e-3, 1.0).with_boundaries(0.6, 0.4);
    let s = state(0.5, 0.0, 0.0, 0.0);
    let next = StepResult::from(s);

    assert!(matches!(
        check(&p, &config, &s, &next),
        Err(SimError::InvalidBoundary { .. })
    ));
    assert!(matches!(run(&p, &config, s), Err(SimError::InvalidBoundary { .. })));
}

// ==================================================================================
// Trajectory runner tests
// ==================================================================================

#[test]
fn ball_resting_on_central_mass_collides_immediately() {
    let p = unit_membrane();
    let s = state(p.central_radius, 0.0, 0.0, 0.0);

    let traj = run(&p, &rk4(1e-3, 10.0), s).unwrap();
    assert_eq!(traj.outcome.kind, OutcomeKind::Collided);
    assert_eq!(traj.outcome.time, 0.0);
    assert_eq!(traj.len(), 1);
    assert_eq!(*traj.final_state(), s);
}

#[test]
fn initial_state_outside_annulus_is_rejected() {
    let p = unit_membrane();
    let config = rk4(1e-3, 1.0);

    for s in [state(1.5, 0.0, 0.0, 0.0), state(0.0, 0.005, 0.0, 0.0)] {
        assert!(matches!(run(&p, &config, s), Err(SimError::InvalidInitialState { .. })));
    }
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut p = unit_membrane();
    p.tension = 0.0;
    assert!(matches!(
        run(&p, &rk4(1e-3, 1.0), state(0.5, 0.0, 0.0, 0.0)),
        Err(SimError::InvalidParameters { .. })
    ));
}

#[test]
fn timed_out_run_ends_exactly_at_horizon() {
    let p = unit_membrane();
    let s = State::new(2.0, NVec2::new(0.5, 0.0), NVec2::new(0.0, circular_speed(&p)));

    // 0.25 is not a multiple of dt, so the last step is shortened
    let traj = run(&p, &rk4(0.01, 0.255), s).unwrap();
    assert_eq!(traj.outcome.kind, OutcomeKind::TimedOut);
    assert!((traj.outcome.time - 2.255).abs() < 1e-12);
    assert!(traj.states.windows(2).all(|w| w[1].t > w[0].t));
    assert_eq!(traj.len(), 27);
}

#[test]
fn escape_time_is_stable_under_step_refinement() {
    let p = unit_membrane();
    let s = state(0.5, 0.0, 6.0, 0.0);

    for (scheme, dt, tol) in [(Scheme::Rk4, 0.01, 5e-4), (Scheme::Euler, 0.01, 0.005)] {
        let coarse = run(&p, &SimulationConfig::new(dt, 1.0, scheme), s).unwrap();
        let fine = run(&p, &SimulationConfig::new(dt / 2.0, 1.0, scheme), s).unwrap();

        assert_eq!(coarse.outcome.kind, OutcomeKind::Escaped);
        assert_eq!(fine.outcome.kind, OutcomeKind::Escaped);
        let gap = (coarse.outcome.time - fine.outcome.time).abs();
        assert!(gap < tol, "{scheme:?}: escape times differ by {gap}");
        assert!((coarse.outcome.state.radius() - 1.0).abs() <= 1e-6);
    }
}

#[test]
fn collision_time_is_stable_under_step_refinement() {
    let p = unit_membrane();

    // straight and nearly straight falls onto the central mass
    for vy in [0.0, 0.05] {
        let s = state(0.5, 0.0, 0.0, vy);
        for (scheme, dt, tol) in [(Scheme::Rk4, 0.01, 2e-4), (Scheme::Euler, 0.005, 0.0025)] {
            let coarse = run(&p, &SimulationConfig::new(dt, 10.0, scheme), s).unwrap();
            let fine = run(&p, &SimulationConfig::new(dt / 2.0, 10.0, scheme), s).unwrap();

            assert_eq!(coarse.outcome.kind, OutcomeKind::Collided, "{scheme:?} dt {dt}");
            assert_eq!(fine.outcome.kind, OutcomeKind::Collided, "{scheme:?} dt {}", dt / 2.0);
            let gap = (coarse.outcome.time - fine.outcome.time).abs();
            assert!(gap < tol, "{scheme:?}: collision times differ by {gap}");
            assert!((coarse.outcome.state.radius() - p.central_radius).abs() < 2e-6);
            assert!((fine.outcome.state.radius() - p.central_radius).abs() < 2e-6);
        }
    }
}

#[test]
fn rk4_fall_into_core_reports_collision() -> anyhow::Result<()> {
    let p = unit_membrane();

    // stages of the last coarse step land inside r_c / 2
    for (vy, dt) in [(0.0, 0.01), (0.0, 0.001), (0.05, 0.001), (0.05, 0.0005)] {
        let traj = run(&p, &rk4(dt, 10.0), state(0.5, 0.0, 0.0, vy))?;
        assert_eq!(traj.outcome.kind, OutcomeKind::Collided);
        assert!((traj.outcome.time - 0.1595).abs() < 1e-3, "collided at {}", traj.outcome.time);
        assert!((traj.final_state().radius() - p.central_radius).abs() < 2e-6);
    }
    Ok(())
}

#[test]
fn radial_fall_collides_on_boundary() {
    let p = unit_membrane();
    let config = rk4(1e-3, 2.0).with_boundaries(0.05, 1.0);
    let s = state(0.2, 0.0, 0.0, 0.0);

    let traj = run(&p, &config, s).unwrap();
    assert_eq!(traj.outcome.kind, OutcomeKind::Collided);
    assert!((traj.outcome.state.radius() - 0.05).abs() <= 1e-6);
    assert_eq!(traj.states.last(), Some(&traj.outcome.state));

    // every recorded state before the last stays outside the collision radius
    let n = traj.len();
    assert!(traj.states[..n - 1].iter().all(|s| s.radius() > 0.05));
}

#[test]
fn drag_spirals_ball_into_centre() {
    let mut p = unit_membrane();
    p.drag = 0.0005;
    let s = state(0.5, 0.0, 0.0, circular_speed(&p));

    let traj = run(&p, &rk4(1e-3, 30.0), s).unwrap();
    assert_eq!(traj.outcome.kind, OutcomeKind::Collided);

    let energies = traj.energies(&p).unwrap();
    assert!(energies.last().unwrap() < &energies[0]);
}

#[test]
fn reference_orbit_stays_bound() {
    // m_c = 1, r_c = 0.01, R = 1, T = 1, g = 9.8, m_p = 0.001, c = 0
    let p = unit_membrane();
    let s = state(0.5, 0.0, 0.0, 0.6);

    let traj = run(&p, &rk4(0.001, 10.0), s).unwrap();

    assert_eq!(traj.outcome.kind, OutcomeKind::TimedOut);
    assert!((traj.outcome.time - 10.0).abs() < 1e-9);
    assert!(traj.min_radius() > 0.02, "periapsis {}", traj.min_radius());
    assert!(traj.max_radius() < 0.65, "apoapsis {}", traj.max_radius());

    // returns near the launch radius again and again
    let radii = traj.radii();
    let returns = radii
        .windows(3)
        .filter(|w| w[1] >= w[0] && w[1] > w[2] && w[1] > 0.4)
        .count();
    assert!(returns >= 5, "only {returns} returns to the outer radius");
}

#[test]
fn simulation_can_be_stepped_and_abandoned() {
    let p = unit_membrane();
    let s = state(0.5, 0.0, 0.0, 0.6);
    let mut sim = Simulation::new(&p, &rk4(1e-3, 10.0), s).unwrap();

    for _ in 0..100 {
        assert_eq!(sim.advance().unwrap(), Status::Running);
    }
    assert_eq!(sim.states().len(), 101);
    assert!((sim.current().t - 0.1).abs() < 1e-9);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn scenario_from_yaml_runs() -> anyhow::Result<()> {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
physical:
  central_mass: 0.5
  central_radius: 0.05
  membrane_radius: 0.5
  tension: 10.0
  gravity: 9.81
  ball_mass: 0.01
  drag: 0.003
simulation:
  dt: 0.001
  t_max: 2.0
  scheme: "rk4"
initial:
  position: [0.49, 0.0]
  speed: 0.5
  angle_deg: 90.0
"#,
    )?;
    let scenario = Scenario::build_scenario(cfg)?;

    // 90 degrees from inward radial is the counter-clockwise tangent
    assert!(scenario.initial.vel.x.abs() < 1e-12);
    assert!((scenario.initial.vel.y - 0.5).abs() < 1e-12);
    assert!(scenario.calibration.is_none());

    let traj = scenario.run()?;
    assert!(traj.len() > 1);
    assert!(traj.states.windows(2).all(|w| w[1].t > w[0].t));
    Ok(())
}

#[test]
fn scenario_rejects_bad_boundaries() -> anyhow::Result<()> {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
physical: { central_mass: 1.0, central_radius: 0.01, membrane_radius: 1.0, tension: 1.0, gravity: 9.8, ball_mass: 0.001 }
simulation: { collision_radius: 2.0 }
initial: { position: [0.5, 0.0], velocity: [0.0, 0.6] }
"#,
    )?;
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::InvalidBoundary { .. })));
    Ok(())
}
