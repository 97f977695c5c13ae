//! TOML configuration loader with validation.
//!
//! Loads [`ControllerConfig`] and builds the structures fixed at activation:
//! the joint model and the pair table. Validates parameter bounds, joint name
//! uniqueness, joint limits and the pair list.
//!
//! Hot reload parses a shadow config, validates it with the same rules, and
//! checks that only reloadable fields changed (gains, `zero_g_mode`,
//! `log_level`). Anything structural needs a restart.

use std::path::Path;
use std::sync::Arc;

use koko_common::config::{ConfigError as LoadError, ConfigLoader};
use koko_common::controller::config::ControllerConfig;
use thiserror::Error;
use tracing::{info, warn};

use crate::control::pairing::{PairError, PairTable};
use crate::state::inputs::ControllerHandle;
use crate::state::joint::JointModel;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// File missing, unreadable or not valid TOML for the schema.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Parameter or joint validation error.
    #[error("config validation: {0}")]
    ValidationError(String),

    /// Invalid `paired_constraints`.
    #[error("config validation: {0}")]
    Pairs(#[from] PairError),

    /// Hot-reload validation failed (shadow config rejected).
    #[error("ERR_RELOAD_VALIDATION_FAILED: {0}")]
    ReloadValidationFailed(String),

    /// Hot-reload scope violation (non-reloadable field changed).
    #[error("ERR_RELOAD_SCOPE_VIOLATION: {0}")]
    ReloadScopeViolation(String),
}

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration with its activation-time structures.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ControllerConfig,
    pub model: Arc<JointModel>,
    pub pairs: PairTable,
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let config = ControllerConfig::load(path)?;
    let loaded = build_loaded(config)?;
    info!(
        path = %path.display(),
        joints = loaded.model.len(),
        pairs = loaded.pairs.len(),
        "controller config loaded"
    );
    Ok(loaded)
}

/// Load config from a TOML string.
pub fn load_config_from_str(toml_src: &str) -> Result<LoadedConfig, ConfigError> {
    let config = ControllerConfig::from_toml_str(toml_src)?;
    build_loaded(config)
}

fn build_loaded(config: ControllerConfig) -> Result<LoadedConfig, ConfigError> {
    let (model, pairs) = validate_controller_config(&config)?;
    Ok(LoadedConfig {
        config,
        model: Arc::new(model),
        pairs,
    })
}

/// Run every startup rule and build the joint model and pair table.
pub fn validate_controller_config(
    config: &ControllerConfig,
) -> Result<(JointModel, PairTable), ConfigError> {
    config.validate().map_err(ConfigError::ValidationError)?;
    let model = JointModel::from_config(&config.joints).map_err(ConfigError::ValidationError)?;
    let pairs = PairTable::from_flat(&config.paired_constraints, &model)?;
    Ok((model, pairs))
}

// ─── Hot-Reload: Shadow Config ──────────────────────────────────────

/// A parsed and fully validated reload candidate.
#[derive(Debug, Clone)]
pub struct ShadowConfig {
    pub config: ControllerConfig,
}

/// Parse and validate a shadow configuration.
///
/// 1. Parse.
/// 2. Full validation, same rules as startup.
/// 3. Reloadable-scope check against the active config.
///
/// Any failure discards the shadow config.
pub fn parse_shadow_config(
    toml_src: &str,
    active: &LoadedConfig,
) -> Result<ShadowConfig, ConfigError> {
    let shadow = ControllerConfig::from_toml_str(toml_src)
        .map_err(|e| ConfigError::ReloadValidationFailed(format!("parse: {e}")))?;

    validate_controller_config(&shadow)
        .map_err(|e| ConfigError::ReloadValidationFailed(format!("validation: {e}")))?;

    validate_reload_scope(&active.config, &shadow)?;

    Ok(ShadowConfig { config: shadow })
}

/// Validate that the shadow config only changes reloadable fields.
///
/// **Reloadable**: p/d/id gains, `zero_g_mode`, `log_level`.
///
/// **NOT reloadable** (require restart):
/// - cycle period and diagnostics interval
/// - joint count, names and order
/// - joint limits
/// - pair list
pub fn validate_reload_scope(
    active: &ControllerConfig,
    shadow: &ControllerConfig,
) -> Result<(), ConfigError> {
    if active.cycle_time_us != shadow.cycle_time_us {
        return Err(ConfigError::ReloadScopeViolation(format!(
            "cycle_time_us changed: {} → {} (requires restart)",
            active.cycle_time_us, shadow.cycle_time_us,
        )));
    }
    if active.diagnostics_interval != shadow.diagnostics_interval {
        return Err(ConfigError::ReloadScopeViolation(format!(
            "diagnostics_interval changed: {} → {} (requires restart)",
            active.diagnostics_interval, shadow.diagnostics_interval,
        )));
    }
    if active.joints.len() != shadow.joints.len() {
        return Err(ConfigError::ReloadScopeViolation(format!(
            "joint count changed: {} → {} (requires restart)",
            active.joints.len(),
            shadow.joints.len(),
        )));
    }

    for (i, (a, s)) in active.joints.iter().zip(shadow.joints.iter()).enumerate() {
        if a.name != s.name {
            return Err(ConfigError::ReloadScopeViolation(format!(
                "joint[{i}] name changed: '{}' → '{}' (requires restart)",
                a.name, s.name,
            )));
        }
        if a.limits != s.limits {
            return Err(ConfigError::ReloadScopeViolation(format!(
                "joint '{}' limits changed (requires restart)",
                a.name,
            )));
        }
    }

    if active.paired_constraints != shadow.paired_constraints {
        return Err(ConfigError::ReloadScopeViolation(format!(
            "paired_constraints changed: {:?} → {:?} (requires restart)",
            active.paired_constraints, shadow.paired_constraints,
        )));
    }

    Ok(())
}

/// Atomic config swap result.
#[derive(Debug, PartialEq, Eq)]
pub enum ReloadResult {
    /// Config swapped and gains applied.
    Success,
    /// Validation failed; active config and gains unchanged.
    ValidationFailed(String),
}

/// Validate a reload candidate and, if accepted, apply it.
///
/// On success the new gains reach the cycle through `handle` (effective
/// next cycle) and `zero_g_mode` is applied if the file changed it. On
/// failure nothing changes.
pub fn atomic_config_swap(
    active: &mut LoadedConfig,
    toml_src: &str,
    handle: &ControllerHandle,
) -> ReloadResult {
    let shadow = match parse_shadow_config(toml_src, active) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "config reload rejected");
            return ReloadResult::ValidationFailed(format!("{e}"));
        }
    };

    if let Err(e) = handle.load_gains(&shadow.config.joints) {
        return ReloadResult::ValidationFailed(format!("{e}"));
    }
    if shadow.config.zero_g_mode != active.config.zero_g_mode {
        handle.set_zero_gravity(shadow.config.zero_g_mode);
    }

    active.config = shadow.config;
    info!("config reloaded");
    ReloadResult::Success
}
