//! End-to-end torque law through the controller.

use koko_common::controller::fault::JointFault;
use koko_controller::cycle::JointController;

use super::common::{DT, JointToml, load, rig};

#[test]
fn reference_single_joint_scenario() {
    // p=2, d=0.1, id=1; target 0, at 0.1 rad moving 0.5 rad/s, 0.2 N·m feedforward.
    let loaded = load(&[JointToml::new("j0").gains(2.0, 0.1, 1.0)], &[], false);
    let mut io = rig(&["j0"], &[0.1], &[0.5], &[0.2]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[0.0]).unwrap();

    ctl.step(&mut io, DT);

    let joint = ctl.joints()[0];
    assert!((joint.error - -0.1).abs() < 1e-12);
    assert!((io.actuator.torques()[0] - -0.05).abs() < 1e-12);
    assert!(joint.fault.is_empty());
}

#[test]
fn zero_period_zeroes_all_joints() {
    let loaded = load(
        &[JointToml::new("a"), JointToml::new("b"), JointToml::new("c")],
        &[0, 1],
        false,
    );
    let mut io = rig(&["a", "b", "c"], &[0.0, 0.5, -0.5], &[1.0, -1.0, 2.0], &[1.0, 1.0, 1.0]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[1.0, -1.0, 2.0]).unwrap();

    let summary = ctl.step(&mut io, 0.0);

    assert_eq!(io.actuator.torques(), &[0.0, 0.0, 0.0]);
    assert_eq!(summary.forced_zero, 3);
    assert!(ctl.joints().iter().all(|j| j.fault.contains(JointFault::ZERO_DT)));
}

#[test]
fn non_finite_feedback_isolated_to_its_joint() {
    let loaded = load(&[JointToml::new("a"), JointToml::new("b")], &[], false);
    let mut io = rig(&["a", "b"], &[0.0, 0.0], &[0.0, 0.0], &[]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[0.5, 0.5]).unwrap();

    io.state.positions[0] = f64::NAN;
    ctl.step(&mut io, DT);

    assert_eq!(io.actuator.torques()[0], 0.0);
    assert!(ctl.joints()[0].fault.contains(JointFault::NON_FINITE_ERROR));
    assert!((io.actuator.torques()[1] - 1.0).abs() < 1e-12);

    // Sensor recovers: next cycle computes normally again.
    io.state.positions[0] = 0.0;
    ctl.step(&mut io, DT);
    assert!((io.actuator.torques()[0] - 1.0).abs() < 1e-12);
    assert!(ctl.joints()[0].fault.is_empty());
}

#[test]
fn nan_command_yields_zero_torque() {
    let loaded = load(&[JointToml::new("a")], &[], false);
    let mut io = rig(&["a"], &[0.2], &[0.3], &[0.4]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[f64::NAN]).unwrap();

    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques()[0], 0.0);
}

#[test]
fn zero_gravity_output_is_compensation_only() {
    let joints = [
        JointToml::new("a").gains(50.0, 5.0, 0.5),
        JointToml::new("b").gains(0.0, 0.0, 0.5),
    ];
    let loaded = load(&joints, &[], true);
    // Same compensation, very different error and velocity.
    let mut io = rig(&["a", "b"], &[-1.0, 0.0], &[3.0, 0.0], &[2.0, 2.0]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[1.0, 0.0]).unwrap();

    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[1.0, 1.0]);

    // Leaving zero-gravity brings the feedback terms back next cycle.
    ctl.handle().set_zero_gravity(false);
    ctl.step(&mut io, DT);
    assert!(io.actuator.torques()[0] > 1.0);
}

#[test]
fn unpaired_torque_clamped_to_limits() {
    // p = 10 so a 0.7 rad error asks for 7 N·m against a 5 N·m limit.
    let joints = [
        JointToml::new("a").gains(10.0, 0.0, 0.0),
        JointToml::new("b").gains(10.0, 0.0, 0.0),
    ];
    let loaded = load(&joints, &[], false);
    let mut io = rig(&["a", "b"], &[0.0, 0.0], &[0.0, 0.0], &[]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[0.7, -0.9]).unwrap();

    let summary = ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[5.0, -5.0]);
    assert_eq!(summary.clamped, 2);
}

#[test]
fn error_wraps_across_pi() {
    let loaded = load(&[JointToml::new("a").gains(1.0, 0.0, 0.0).max_angle(3.2)], &[], false);
    let mut io = rig(&["a"], &[-3.1], &[0.0], &[]);
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[3.1]).unwrap();

    ctl.step(&mut io, DT);
    // 3.1 and −3.1 are 2π − 6.2 ≈ 0.083 rad apart, going backwards.
    let expected = -(2.0 * std::f64::consts::PI - 6.2);
    assert!((ctl.joints()[0].error - expected).abs() < 1e-9);
}

#[test]
fn gravity_vector_scales_compensation() {
    use koko_controller::io::IoParts;
    use koko_controller::io::actuator::LastTorques;
    use koko_controller::io::compensation::GravityCompensation;

    let loaded = load(&[JointToml::new("lift").gains(2.0, 0.0, 1.0)], &[], true);
    let state = rig(&["lift"], &[0.0], &[0.0], &[]).state;
    let compensation = GravityCompensation::new(&[0.1]);
    let gravity = compensation.gravity_input();
    let mut io = IoParts {
        state,
        compensation,
        actuator: LastTorques::default(),
    };
    let mut ctl = JointController::activate(&loaded, &mut io).unwrap();

    ctl.step(&mut io, DT);
    let upright = io.actuator.torques()[0];
    assert!((upright - 0.1 * 9.81).abs() < 1e-9, "torque = {upright}");

    // Base tilted 60°: half the downward component.
    gravity.set(0.0, 9.81 * 0.75_f64.sqrt(), -9.81 * 0.5);
    ctl.step(&mut io, DT);
    assert!((io.actuator.torques()[0] - upright * 0.5).abs() < 1e-9);
}
