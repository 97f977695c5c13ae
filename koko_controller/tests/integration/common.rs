//! Shared fixtures: config builders and a scripted joint rig.

use koko_controller::config::{LoadedConfig, load_config_from_str};
use koko_controller::io::actuator::LastTorques;
use koko_controller::io::compensation::ConstantCompensation;
use koko_controller::io::feedback::JointStateMsg;
use koko_controller::io::IoParts;

/// One `[[joints]]` table.
pub struct JointToml<'a> {
    pub name: &'a str,
    pub p: f64,
    pub d: f64,
    pub id: f64,
    pub max_angle: f64,
    pub max_torque: f64,
}

impl<'a> JointToml<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            p: 2.0,
            d: 0.1,
            id: 1.0,
            max_angle: 3.0,
            max_torque: 5.0,
        }
    }

    pub fn gains(mut self, p: f64, d: f64, id: f64) -> Self {
        self.p = p;
        self.d = d;
        self.id = id;
        self
    }

    pub fn max_torque(mut self, max_torque: f64) -> Self {
        self.max_torque = max_torque;
        self
    }

    pub fn max_angle(mut self, max_angle: f64) -> Self {
        self.max_angle = max_angle;
        self
    }

    fn render(&self) -> String {
        format!(
            r#"
[[joints]]
name = "{}"
p = {:?}
d = {:?}
id = {:?}
min_angle = {:?}
max_angle = {:?}
min_torque = {:?}
max_torque = {:?}
"#,
            self.name,
            self.p,
            self.d,
            self.id,
            -self.max_angle,
            self.max_angle,
            -self.max_torque,
            self.max_torque,
        )
    }
}

/// Render a full controller config.
pub fn config_toml(joints: &[JointToml<'_>], pairs: &[usize], zero_g: bool) -> String {
    let mut src = format!(
        "cycle_time_us = 1000\nzero_g_mode = {zero_g}\ndiagnostics_interval = 1\npaired_constraints = {pairs:?}\n"
    );
    for joint in joints {
        src.push_str(&joint.render());
    }
    src
}

pub fn load(joints: &[JointToml<'_>], pairs: &[usize], zero_g: bool) -> LoadedConfig {
    load_config_from_str(&config_toml(joints, pairs, zero_g)).expect("valid test config")
}

pub type Rig = IoParts<JointStateMsg, ConstantCompensation, LastTorques>;

/// Scripted joint state + fixed compensation + torque recorder.
pub fn rig(names: &[&str], positions: &[f64], velocities: &[f64], compensation: &[f64]) -> Rig {
    IoParts {
        state: JointStateMsg {
            names: names.iter().map(|n| n.to_string()).collect(),
            positions: positions.to_vec(),
            velocities: velocities.to_vec(),
        },
        compensation: ConstantCompensation::new(compensation),
        actuator: LastTorques::default(),
    }
}

pub const DT: f64 = 0.001;
