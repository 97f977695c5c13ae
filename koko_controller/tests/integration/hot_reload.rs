//! Config hot reload through a file on disk.

use std::io::Write;

use koko_controller::config::{ReloadResult, atomic_config_swap, load_config};
use koko_controller::cycle::JointController;
use tempfile::NamedTempFile;

use super::common::{DT, JointToml, config_toml, rig};

fn rewrite(file: &mut NamedTempFile, src: &str) -> String {
    let f = file.as_file_mut();
    f.set_len(0).unwrap();
    std::io::Seek::rewind(f).unwrap();
    f.write_all(src.as_bytes()).unwrap();
    f.flush().unwrap();
    std::fs::read_to_string(file.path()).unwrap()
}

fn joints(p: f64) -> [JointToml<'static>; 2] {
    [
        JointToml::new("lift").gains(p, 0.0, 1.0),
        JointToml::new("roll").gains(p, 0.0, 1.0),
    ]
}

#[test]
fn reloaded_gains_take_effect_next_cycle() {
    let mut file = NamedTempFile::new().unwrap();
    rewrite(&mut file, &config_toml(&joints(2.0), &[], false));
    let mut active = load_config(file.path()).unwrap();

    let mut io = rig(&["lift", "roll"], &[0.0, 0.0], &[0.0, 0.0], &[]);
    let mut ctl = JointController::activate(&active, &mut io).unwrap();
    ctl.handle().set_commands(&[0.5, -0.5]).unwrap();
    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[1.0, -1.0]);

    let src = rewrite(&mut file, &config_toml(&joints(4.0), &[], false));
    assert_eq!(
        atomic_config_swap(&mut active, &src, &ctl.handle()),
        ReloadResult::Success
    );
    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[2.0, -2.0]);
}

#[test]
fn reload_can_enter_zero_gravity() {
    let mut file = NamedTempFile::new().unwrap();
    rewrite(&mut file, &config_toml(&joints(2.0), &[], false));
    let mut active = load_config(file.path()).unwrap();

    let mut io = rig(&["lift", "roll"], &[0.0, 0.0], &[0.0, 0.0], &[0.3, 0.0]);
    let mut ctl = JointController::activate(&active, &mut io).unwrap();
    ctl.handle().set_commands(&[0.5, 0.5]).unwrap();

    let src = rewrite(&mut file, &config_toml(&joints(2.0), &[], true));
    assert_eq!(
        atomic_config_swap(&mut active, &src, &ctl.handle()),
        ReloadResult::Success
    );
    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[0.3, 0.0]);
}

#[test]
fn structural_change_rejected_and_gains_kept() {
    let mut file = NamedTempFile::new().unwrap();
    rewrite(&mut file, &config_toml(&joints(2.0), &[], false));
    let mut active = load_config(file.path()).unwrap();

    let mut io = rig(&["lift", "roll"], &[0.0, 0.0], &[0.0, 0.0], &[]);
    let mut ctl = JointController::activate(&active, &mut io).unwrap();
    ctl.handle().set_commands(&[0.5, 0.5]).unwrap();

    // New gains together with a new pair list: all or nothing.
    let src = rewrite(&mut file, &config_toml(&joints(4.0), &[0, 1], false));
    let result = atomic_config_swap(&mut active, &src, &ctl.handle());
    match result {
        ReloadResult::ValidationFailed(reason) => {
            assert!(reason.starts_with("ERR_RELOAD_SCOPE_VIOLATION"), "got: {reason}")
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    ctl.step(&mut io, DT);
    assert_eq!(io.actuator.torques(), &[1.0, 1.0]);
    assert!(active.config.paired_constraints.is_empty());
}

#[test]
fn broken_file_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    rewrite(&mut file, &config_toml(&joints(2.0), &[], false));
    let mut active = load_config(file.path()).unwrap();
    let mut io = rig(&["lift", "roll"], &[0.0, 0.0], &[0.0, 0.0], &[]);
    let ctl = JointController::activate(&active, &mut io).unwrap();

    let src = rewrite(&mut file, "cycle_time_us = ");
    let result = atomic_config_swap(&mut active, &src, &ctl.handle());
    assert!(
        matches!(&result, ReloadResult::ValidationFailed(r) if r.starts_with("ERR_RELOAD_VALIDATION_FAILED")),
        "got: {result:?}"
    );
    assert_eq!(ctl.handle().gains(0).unwrap().p_gain, 2.0);
}
