//! Live gain updates from another thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use koko_controller::cycle::JointController;
use koko_controller::state::inputs::{GainUpdate, InputError, InputSnapshot};

use super::common::{DT, JointToml, load, rig};

fn three_joints() -> (JointController, super::common::Rig) {
    let loaded = load(
        &[
            JointToml::new("a").gains(2.0, 0.0, 1.0),
            JointToml::new("b").gains(2.0, 0.0, 1.0),
            JointToml::new("c").gains(2.0, 0.0, 1.0),
        ],
        &[],
        false,
    );
    let mut io = rig(&["a", "b", "c"], &[0.0; 3], &[0.0; 3], &[]);
    let ctl = JointController::activate(&loaded, &mut io).unwrap();
    ctl.handle().set_commands(&[0.5, 0.5, 0.5]).unwrap();
    (ctl, io)
}

#[test]
fn update_applies_to_next_cycle_and_one_joint() {
    let (mut ctl, mut io) = three_joints();

    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[1.0, 1.0, 1.0]);

    ctl.handle().update_gains(GainUpdate::p(1, 6.0)).unwrap();
    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[1.0, 3.0, 1.0]);

    // Compensation gain untouched.
    assert_eq!(ctl.handle().gains(1).unwrap().compensation_gain, 1.0);
}

#[test]
fn d_only_update_keeps_p() {
    let (mut ctl, mut io) = three_joints();
    io.state.velocities = vec![0.0, 1.0, 0.0];

    ctl.handle().update_gains(GainUpdate::d(1, 0.5)).unwrap();
    ctl.step(&mut io, DT);
    // 2·0.5 − 0.5·1.0
    assert!((io.actuator.torques()[1] - 0.5).abs() < 1e-12);
    assert_eq!(ctl.handle().gains(1).unwrap().p_gain, 2.0);
}

#[test]
fn flat_gain_arrays_target_leading_joints() {
    let (mut ctl, mut io) = three_joints();
    let handle = ctl.handle();

    handle.set_p_gains(&[4.0, 8.0]).unwrap();
    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[2.0, 4.0, 1.0]);

    let err = handle.set_d_gains(&[0.1; 4]).unwrap_err();
    assert!(matches!(err, InputError::TooManyValues { got: 4, joints: 3, .. }));
    assert_eq!(handle.gains(0).unwrap().d_gain, 0.0);
}

#[test]
fn out_of_range_joint_rejected() {
    let (ctl, _io) = three_joints();
    let err = ctl.handle().update_gains(GainUpdate::pd(3, 1.0, 1.0)).unwrap_err();
    assert_eq!(err, InputError::JointIndex { index: 3, joints: 3 });
}

#[test]
fn concurrent_update_never_tears() {
    // Writer keeps p == d on every joint; a snapshot must never see them differ.
    let (ctl, _io) = three_joints();
    let handle = ctl.handle();
    handle.set_d_gains(&[2.0, 2.0, 2.0]).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let handle = handle.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut k = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let v = f64::from(k % 97) + 1.0;
                for joint in 0..3 {
                    handle.update_gains(GainUpdate::pd(joint, v, v)).unwrap();
                }
                k = k.wrapping_add(1);
            }
        })
    };

    let mut snapshot = InputSnapshot::default();
    for _ in 0..20_000 {
        handle.snapshot(&mut snapshot);
        for gains in &snapshot.gains[..3] {
            assert_eq!(gains.p_gain, gains.d_gain);
        }
    }

    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn concurrent_commands_land_whole() {
    // Whole-message writes: every snapshot sees all three joints from one message.
    let (ctl, _io) = three_joints();
    let handle = ctl.handle();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let handle = handle.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut k = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let v = f64::from(k % 20) * 0.1;
                handle.set_commands(&[v, v, v]).unwrap();
                k = k.wrapping_add(1);
            }
        })
    };

    let mut snapshot = InputSnapshot::default();
    for _ in 0..20_000 {
        handle.snapshot(&mut snapshot);
        assert_eq!(snapshot.commanded[0], snapshot.commanded[1]);
        assert_eq!(snapshot.commanded[1], snapshot.commanded[2]);
    }

    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}
