use crate::core::crystal::Crystal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const DEFAULT_TAPER: f64 = 0.9;
const DEFAULT_BUFFER: f64 = 2.0;
const DEFAULT_LAMBDA_ALPHA: f64 = 0.05;
const DEFAULT_LAMBDA_EXPONENT: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Options of the non-bonded engine.
///
/// Keys are kebab-case; the upper-case keyword spellings are accepted as
/// aliases so existing keyword files translate one to one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NonbondedConfig {
    /// `None` derives the cutoff from the crystal.
    #[serde(alias = "VDW_CUTOFF")]
    pub vdw_cutoff: Option<f64>,
    /// Fraction of the cutoff at which the switch starts.
    #[serde(alias = "VDW_TAPER")]
    pub vdw_taper: f64,
    #[serde(alias = "VDW_BUFFER")]
    pub vdw_buffer: f64,
    #[serde(alias = "VDW_LAMBDA_ALPHA")]
    pub vdw_lambda_alpha: f64,
    #[serde(alias = "VDW_LAMBDA_EXPONENT")]
    pub vdw_lambda_exponent: f64,
    #[serde(alias = "INTERMOLECULAR_SOFTCORE")]
    pub intermolecular_softcore: bool,
    #[serde(rename = "vdw-lr-term", alias = "VDWLRTERM")]
    pub vdw_lr_term: bool,
    #[serde(alias = "LAMBDATERM")]
    pub lambda_term: bool,
    #[serde(alias = "DESCREEN_VDW")]
    pub descreen_vdw: bool,
    #[serde(alias = "DESCREEN_HYDROGEN")]
    pub descreen_hydrogen: bool,
    #[serde(rename = "descreen-12", alias = "DESCREEN_12")]
    pub descreen_12: bool,
    /// `None` uses the vdW cutoff.
    #[serde(alias = "GK_CUTOFF")]
    pub gk_cutoff: Option<f64>,
    #[serde(alias = "NATIVE_ENVIRONMENT_APPROXIMATION")]
    pub native_environment_approximation: bool,
    #[serde(alias = "LOAD_BALANCE")]
    pub load_balance: f64,
    /// `None` uses the available parallelism.
    pub threads: Option<usize>,
}

impl Default for NonbondedConfig {
    fn default() -> Self {
        Self {
            vdw_cutoff: None,
            vdw_taper: DEFAULT_TAPER,
            vdw_buffer: DEFAULT_BUFFER,
            vdw_lambda_alpha: DEFAULT_LAMBDA_ALPHA,
            vdw_lambda_exponent: DEFAULT_LAMBDA_EXPONENT,
            intermolecular_softcore: false,
            vdw_lr_term: false,
            lambda_term: false,
            descreen_vdw: false,
            descreen_hydrogen: true,
            descreen_12: true,
            gk_cutoff: None,
            native_environment_approximation: false,
            load_balance: 1.0,
            threads: None,
        }
    }
}

impl NonbondedConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })
    }

    /// Floors the softcore parameters and resets an out-of-range taper,
    /// warning about each adjustment.
    pub fn normalized(mut self) -> Self {
        if self.vdw_lambda_alpha < 0.0 {
            warn!(alpha = self.vdw_lambda_alpha, "Negative softcore alpha floored at 0.");
            self.vdw_lambda_alpha = 0.0;
        }
        if self.vdw_lambda_exponent < 1.0 {
            warn!(
                exponent = self.vdw_lambda_exponent,
                "Softcore exponent below 1 floored at 1."
            );
            self.vdw_lambda_exponent = 1.0;
        }
        if !(self.vdw_taper > 0.0 && self.vdw_taper < 1.0) {
            warn!(taper = self.vdw_taper, "vdW taper outside (0, 1) reset to {DEFAULT_TAPER}.");
            self.vdw_taper = DEFAULT_TAPER;
        }
        self
    }

    /// Rejects values that no normalization can repair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &'static str, value: Option<f64>| match value {
            Some(v) if !(v.is_finite() && v > 0.0) => Err(ConfigError::InvalidValue {
                key,
                reason: format!("must be a positive number, got {v}"),
            }),
            _ => Ok(()),
        };
        positive("vdw-cutoff", self.vdw_cutoff)?;
        positive("gk-cutoff", self.gk_cutoff)?;
        if !(self.vdw_buffer.is_finite() && self.vdw_buffer >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "vdw-buffer",
                reason: format!("must be non-negative, got {}", self.vdw_buffer),
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "threads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn vdw_cutoff_for(&self, crystal: &Crystal) -> f64 {
        self.vdw_cutoff.unwrap_or_else(|| crystal.default_vdw_cutoff())
    }

    pub fn gk_cutoff_for(&self, crystal: &Crystal) -> f64 {
        self.gk_cutoff.unwrap_or_else(|| self.vdw_cutoff_for(crystal))
    }

    pub fn resolved_threads(&self) -> usize {
        self.threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }
}

#[derive(Default)]
pub struct NonbondedConfigBuilder {
    vdw_cutoff: Option<f64>,
    vdw_taper: Option<f64>,
    vdw_buffer: Option<f64>,
    vdw_lambda_alpha: Option<f64>,
    vdw_lambda_exponent: Option<f64>,
    intermolecular_softcore: Option<bool>,
    vdw_lr_term: Option<bool>,
    lambda_term: Option<bool>,
    descreen_vdw: Option<bool>,
    descreen_hydrogen: Option<bool>,
    descreen_12: Option<bool>,
    gk_cutoff: Option<f64>,
    native_environment_approximation: Option<bool>,
    load_balance: Option<f64>,
    threads: Option<usize>,
}

impl NonbondedConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vdw_cutoff(mut self, cutoff: f64) -> Self {
        self.vdw_cutoff = Some(cutoff);
        self
    }
    pub fn vdw_taper(mut self, taper: f64) -> Self {
        self.vdw_taper = Some(taper);
        self
    }
    pub fn vdw_buffer(mut self, buffer: f64) -> Self {
        self.vdw_buffer = Some(buffer);
        self
    }
    pub fn vdw_lambda_alpha(mut self, alpha: f64) -> Self {
        self.vdw_lambda_alpha = Some(alpha);
        self
    }
    pub fn vdw_lambda_exponent(mut self, exponent: f64) -> Self {
        self.vdw_lambda_exponent = Some(exponent);
        self
    }
    pub fn intermolecular_softcore(mut self, enabled: bool) -> Self {
        self.intermolecular_softcore = Some(enabled);
        self
    }
    pub fn vdw_lr_term(mut self, enabled: bool) -> Self {
        self.vdw_lr_term = Some(enabled);
        self
    }
    pub fn lambda_term(mut self, enabled: bool) -> Self {
        self.lambda_term = Some(enabled);
        self
    }
    pub fn descreen_vdw(mut self, enabled: bool) -> Self {
        self.descreen_vdw = Some(enabled);
        self
    }
    pub fn descreen_hydrogen(mut self, enabled: bool) -> Self {
        self.descreen_hydrogen = Some(enabled);
        self
    }
    pub fn descreen_12(mut self, enabled: bool) -> Self {
        self.descreen_12 = Some(enabled);
        self
    }
    pub fn gk_cutoff(mut self, cutoff: f64) -> Self {
        self.gk_cutoff = Some(cutoff);
        self
    }
    pub fn native_environment_approximation(mut self, enabled: bool) -> Self {
        self.native_environment_approximation = Some(enabled);
        self
    }
    pub fn load_balance(mut self, percentage: f64) -> Self {
        self.load_balance = Some(percentage);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn build(self) -> Result<NonbondedConfig, ConfigError> {
        let defaults = NonbondedConfig::default();
        let config = NonbondedConfig {
            vdw_cutoff: self.vdw_cutoff,
            vdw_taper: self.vdw_taper.unwrap_or(defaults.vdw_taper),
            vdw_buffer: self.vdw_buffer.unwrap_or(defaults.vdw_buffer),
            vdw_lambda_alpha: self.vdw_lambda_alpha.unwrap_or(defaults.vdw_lambda_alpha),
            vdw_lambda_exponent: self
                .vdw_lambda_exponent
                .unwrap_or(defaults.vdw_lambda_exponent),
            intermolecular_softcore: self
                .intermolecular_softcore
                .unwrap_or(defaults.intermolecular_softcore),
            vdw_lr_term: self.vdw_lr_term.unwrap_or(defaults.vdw_lr_term),
            lambda_term: self.lambda_term.unwrap_or(defaults.lambda_term),
            descreen_vdw: self.descreen_vdw.unwrap_or(defaults.descreen_vdw),
            descreen_hydrogen: self.descreen_hydrogen.unwrap_or(defaults.descreen_hydrogen),
            descreen_12: self.descreen_12.unwrap_or(defaults.descreen_12),
            gk_cutoff: self.gk_cutoff,
            native_environment_approximation: self
                .native_environment_approximation
                .unwrap_or(defaults.native_environment_approximation),
            load_balance: self.load_balance.unwrap_or(defaults.load_balance),
            threads: self.threads,
        };
        config.validate()?;
        Ok(config.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = NonbondedConfig::default();
        assert_eq!(config.vdw_cutoff, None);
        assert_eq!(config.vdw_taper, 0.9);
        assert_eq!(config.vdw_buffer, 2.0);
        assert_eq!(config.vdw_lambda_alpha, 0.05);
        assert_eq!(config.vdw_lambda_exponent, 1.0);
        assert!(!config.intermolecular_softcore);
        assert!(!config.vdw_lr_term);
        assert!(!config.lambda_term);
        assert!(!config.descreen_vdw);
        assert!(config.descreen_hydrogen);
        assert!(config.descreen_12);
    }

    #[test]
    fn parse_accepts_kebab_case_and_keyword_aliases() {
        let config = NonbondedConfig::parse(
            r#"
            vdw-cutoff = 10.0
            VDW_LAMBDA_ALPHA = 0.7
            VDW_LAMBDA_EXPONENT = 3.0
            LAMBDATERM = true
            VDWLRTERM = true
            descreen-12 = false
            DESCREEN_HYDROGEN = false
            threads = 4
            "#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.vdw_cutoff, Some(10.0));
        assert_eq!(config.vdw_lambda_alpha, 0.7);
        assert_eq!(config.vdw_lambda_exponent, 3.0);
        assert!(config.lambda_term);
        assert!(config.vdw_lr_term);
        assert!(!config.descreen_12);
        assert!(!config.descreen_hydrogen);
        assert_eq!(config.resolved_threads(), 4);
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let result = NonbondedConfig::parse("vdw-cutof = 10.0", "inline");
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn normalized_floors_softcore_parameters() {
        let config = NonbondedConfig {
            vdw_lambda_alpha: -1.0,
            vdw_lambda_exponent: 0.5,
            vdw_taper: 1.5,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.vdw_lambda_alpha, 0.0);
        assert_eq!(config.vdw_lambda_exponent, 1.0);
        assert_eq!(config.vdw_taper, 0.9);
    }

    #[test]
    fn builder_applies_overrides_and_validates() {
        let config = NonbondedConfigBuilder::new()
            .vdw_cutoff(8.0)
            .lambda_term(true)
            .vdw_lambda_alpha(-0.2)
            .threads(2)
            .build()
            .unwrap();
        assert_eq!(config.vdw_cutoff, Some(8.0));
        assert_eq!(config.vdw_lambda_alpha, 0.0);
        assert_eq!(config.threads, Some(2));

        let result = NonbondedConfigBuilder::new().vdw_cutoff(-3.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "vdw-cutoff", .. })
        ));
        let result = NonbondedConfigBuilder::new().threads(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "threads", .. })));
    }

    #[test]
    fn cutoffs_fall_back_to_crystal_defaults() {
        let config = NonbondedConfig::default();
        let periodic = Crystal::new(30.0, 30.0, 30.0, 90.0, 90.0, 90.0, "P1").unwrap();
        assert_eq!(config.vdw_cutoff_for(&periodic), 9.0);
        assert_eq!(config.gk_cutoff_for(&periodic), 9.0);
        let gas = Crystal::aperiodic(40.0);
        assert_eq!(config.vdw_cutoff_for(&gas), 17.0);
    }
}
