//! Closed loop against the simulated arm.

use koko_controller::control::pairing::combined_effort;
use koko_controller::cycle::JointController;
use koko_controller::sim::SimulatedArm;

use super::common::{DT, JointToml, load};

const LOAD: f64 = 0.05;

fn settle(ctl: &mut JointController, arm: &mut SimulatedArm, cycles: usize) {
    for _ in 0..cycles {
        ctl.step(arm, DT);
    }
}

#[test]
fn reaches_target_under_gravity() {
    let loaded = load(&[JointToml::new("lift").gains(20.0, 2.0, 1.0)], &[], false);
    let mut arm = SimulatedArm::from_config(&loaded.config).with_load_moments(&[LOAD]);
    let mut ctl = JointController::activate(&loaded, &mut arm).unwrap();

    ctl.handle().set_commands(&[1.0]).unwrap();
    settle(&mut ctl, &mut arm, 3000);

    let joint = &arm.joints()[0];
    assert!((joint.position - 1.0).abs() < 1e-3, "position = {}", joint.position);
    assert!(joint.velocity.abs() < 1e-3);
    // Holding torque is the gravity load alone.
    let expected = LOAD * 9.81 * 1.0_f64.cos();
    assert!((ctl.joints()[0].torque - expected).abs() < 1e-2);
}

#[test]
fn without_compensation_the_joint_sags() {
    let loaded = load(&[JointToml::new("lift").gains(20.0, 2.0, 0.0)], &[], false);
    let mut arm = SimulatedArm::from_config(&loaded.config).with_load_moments(&[LOAD]);
    let mut ctl = JointController::activate(&loaded, &mut arm).unwrap();

    ctl.handle().set_commands(&[0.0]).unwrap();
    settle(&mut ctl, &mut arm, 3000);

    // Steady state: p·e = m·g·cos(q) ≈ 0.49 N·m, so about 0.0245 rad low.
    let position = arm.joints()[0].position;
    assert!(position < -0.02 && position > -0.03, "position = {position}");
}

#[test]
fn zero_gravity_holds_and_floats() {
    let loaded = load(&[JointToml::new("lift").gains(20.0, 2.0, 1.0)], &[], true);
    let mut arm = SimulatedArm::from_config(&loaded.config)
        .with_positions(&[0.7])
        .with_load_moments(&[LOAD]);
    let mut ctl = JointController::activate(&loaded, &mut arm).unwrap();

    // A target is ignored in zero-gravity mode.
    ctl.handle().set_commands(&[-1.0]).unwrap();
    settle(&mut ctl, &mut arm, 500);
    assert!((arm.joints()[0].position - 0.7).abs() < 1e-9);

    // Pushed by hand, the joint drifts and friction stops it.
    if let Some(joint) = arm.joint_mut(0) {
        joint.velocity = 0.5;
    }
    settle(&mut ctl, &mut arm, 3000);
    let joint = &arm.joints()[0];
    assert!(joint.position > 0.75, "position = {}", joint.position);
    assert!(joint.velocity.abs() < 0.01);
}

#[test]
fn leaving_zero_gravity_resumes_tracking() {
    let loaded = load(&[JointToml::new("lift").gains(20.0, 2.0, 1.0)], &[], true);
    let mut arm = SimulatedArm::from_config(&loaded.config).with_load_moments(&[LOAD]);
    let mut ctl = JointController::activate(&loaded, &mut arm).unwrap();
    let handle = ctl.handle();

    handle.set_commands(&[0.5]).unwrap();
    settle(&mut ctl, &mut arm, 200);
    assert!(arm.joints()[0].position.abs() < 1e-9);

    handle.set_zero_gravity(false);
    settle(&mut ctl, &mut arm, 3000);
    assert!((arm.joints()[0].position - 0.5).abs() < 1e-3);
}

#[test]
fn paired_joints_stay_in_budget_while_moving() {
    let joints = [
        JointToml::new("lift").gains(30.0, 2.0, 1.0).max_torque(4.0),
        JointToml::new("roll").gains(30.0, 2.0, 1.0).max_torque(4.0),
    ];
    let loaded = load(&joints, &[0, 1], false);
    let budget = 8.0;
    let mut arm = SimulatedArm::from_config(&loaded.config).with_load_moments(&[LOAD, 0.0]);
    let mut ctl = JointController::activate(&loaded, &mut arm).unwrap();

    ctl.handle().set_commands(&[1.2, 0.9]).unwrap();
    let mut scaled = 0;
    for _ in 0..4000 {
        let summary = ctl.step(&mut arm, DT);
        scaled += summary.scaled_pairs;
        let t = ctl.joints();
        assert!(combined_effort(t[0].torque, t[1].torque) <= budget + 1e-9);
    }

    assert!(scaled > 0);
    assert!((arm.joints()[0].position - 1.2).abs() < 1e-3);
    assert!((arm.joints()[1].position - 0.9).abs() < 1e-3);
}
