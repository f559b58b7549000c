#![allow(dead_code)]

use assetrun::exec::{ProcessSupervisor, SupervisorSettings};
use assetrun::types::LaunchPolicy;

pub use assetrun_test_utils::{init_tracing, with_timeout};

pub fn supervisor(policy: LaunchPolicy) -> ProcessSupervisor {
    ProcessSupervisor::new(SupervisorSettings {
        policy,
        ..SupervisorSettings::default()
    })
}
