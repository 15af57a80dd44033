//! Runtime configuration, parsed once at init and immutable thereafter
//! (spec.md §6, §9's "explicit context values" redesign note).

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("min_unit_size ({min}) must be <= max_unit_size ({max})")]
    UnitSizeOrder { min: u32, max: u32 },
    #[error("max_unit_size ({0}) exceeds the encoded size limit of 255")]
    UnitSizeTooLarge(u32),
    #[error("min_coverage ({0}) must be within [0, 1]")]
    CoverageOutOfRange(f64),
    #[error("sampling portion ({0}) must be within [0, 1]")]
    SamplingPortionOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Off,
    Portion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    Auto,
    Fixed(usize),
}

/// Encoding types the statistics engine and selector will try, per
/// `preproc.xform` (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XformSet {
    All,
    Only(Vec<String>),
}

impl XformSet {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            XformSet::All => true,
            XformSet::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Validated, immutable configuration threaded through the rest of the
/// pipeline as `Context` (spec.md §9).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub nr_threads: usize,
    pub cpu_affinity: Vec<usize>,
    pub xform: XformSet,
    pub sampling: Sampling,
    pub sampling_portion: f64,
    pub sampling_nr_samples: usize,
    pub window_size: WindowSize,
    /// Selects `λ` in the selector's score formula (spec.md §4.3):
    /// `1.0` in "new heuristic" mode (the default, favouring fewer
    /// patterns), `0.0` in the legacy mode that scores purely on coverage.
    pub new_heuristic: bool,
    pub symmetric: bool,
    pub split_blocks: bool,
    pub full_colind: bool,
    pub min_unit_size: u32,
    pub max_unit_size: u32,
    pub min_coverage: f64,
    /// Block dimensions tried by block-row/block-col instantiations.
    pub block_dims: Vec<u8>,
    /// Unrecognised key/value pairs encountered during `apply`, surfaced as
    /// a `warn!`-logged recoverable failure rather than a hard error
    /// (spec.md §7's "unknown tuning option strings").
    pub unknown_keys: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            nr_threads: 1,
            cpu_affinity: Vec::new(),
            xform: XformSet::All,
            sampling: Sampling::Off,
            sampling_portion: 1.0,
            sampling_nr_samples: 0,
            window_size: WindowSize::Auto,
            new_heuristic: true,
            symmetric: false,
            split_blocks: false,
            full_colind: false,
            min_unit_size: 4,
            max_unit_size: 255,
            min_coverage: 0.1,
            block_dims: vec![2, 3, 4, 5, 6, 7, 8],
            unknown_keys: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = RuntimeConfig::default();
        for (k, v) in pairs {
            cfg.apply(k.as_ref(), v.as_ref())?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read the same key set from environment variables, upper-cased and
    /// dot-replaced-by-underscore (`rt.nr_threads` -> `RT_NR_THREADS`).
    pub fn from_env(keys: &[&str]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        for &key in keys {
            let env_name = key.to_uppercase().replace('.', "_");
            if let Ok(value) = env::var(&env_name) {
                cfg.apply(key, &value)?;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply one `key = value` pair, matching spec.md §6's table exactly.
    /// Unknown keys are recorded rather than rejected outright: the caller
    /// decides whether to treat `unknown_keys` as fatal.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "rt.nr_threads" => self.nr_threads = value.parse().map_err(|_| invalid())?,
            "rt.cpu_affinity" => {
                self.cpu_affinity = value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.trim().parse::<usize>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| invalid())?;
            }
            "preproc.xform" => {
                self.xform = if value == "all" {
                    XformSet::All
                } else {
                    XformSet::Only(value.split(',').map(|s| s.trim().to_string()).collect())
                };
            }
            "preproc.sampling" => {
                self.sampling = match value {
                    "off" => Sampling::Off,
                    "portion" => Sampling::Portion,
                    _ => return Err(invalid()),
                };
            }
            "preproc.sampling.portion" => {
                self.sampling_portion = value.parse().map_err(|_| invalid())?;
            }
            "preproc.sampling.nr_samples" => {
                self.sampling_nr_samples = value.parse().map_err(|_| invalid())?;
            }
            "preproc.window_size" => {
                self.window_size = if value == "auto" {
                    WindowSize::Auto
                } else {
                    WindowSize::Fixed(value.parse().map_err(|_| invalid())?)
                };
            }
            "preproc.new_heuristic" => self.new_heuristic = parse_bool(value).ok_or_else(invalid)?,
            "matrix.symmetric" => self.symmetric = parse_bool(value).ok_or_else(invalid)?,
            "matrix.split_blocks" => self.split_blocks = parse_bool(value).ok_or_else(invalid)?,
            "matrix.full_colind" => self.full_colind = parse_bool(value).ok_or_else(invalid)?,
            "matrix.min_unit_size" => self.min_unit_size = value.parse().map_err(|_| invalid())?,
            "matrix.max_unit_size" => self.max_unit_size = value.parse().map_err(|_| invalid())?,
            "matrix.min_coverage" => self.min_coverage = value.parse().map_err(|_| invalid())?,
            _ => {
                log::warn!("unknown configuration key: {key}");
                self.unknown_keys.push(key.to_string());
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_unit_size > self.max_unit_size {
            return Err(ConfigError::UnitSizeOrder {
                min: self.min_unit_size,
                max: self.max_unit_size,
            });
        }
        if self.max_unit_size > 255 {
            return Err(ConfigError::UnitSizeTooLarge(self.max_unit_size));
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(ConfigError::CoverageOutOfRange(self.min_coverage));
        }
        if !(0.0..=1.0).contains(&self.sampling_portion) {
            return Err(ConfigError::SamplingPortionOutOfRange(self.sampling_portion));
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.min_unit_size, 4);
        assert_eq!(cfg.max_unit_size, 255);
        assert!((cfg.min_coverage - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_inverted_unit_sizes() {
        let pairs = [("matrix.min_unit_size", "10"), ("matrix.max_unit_size", "5")];
        assert!(RuntimeConfig::from_pairs(pairs).is_err());
    }

    #[test]
    fn unknown_key_is_recorded_not_rejected() {
        let cfg = RuntimeConfig::from_pairs([("rt.bogus", "1")]).unwrap();
        assert_eq!(cfg.unknown_keys, vec!["rt.bogus".to_string()]);
    }

    #[test]
    fn parses_cpu_affinity_list() {
        let cfg = RuntimeConfig::from_pairs([("rt.cpu_affinity", "0,2,4")]).unwrap();
        assert_eq!(cfg.cpu_affinity, vec![0, 2, 4]);
    }

    #[test]
    fn new_heuristic_defaults_on_and_is_configurable() {
        assert!(RuntimeConfig::default().new_heuristic);
        let cfg = RuntimeConfig::from_pairs([("preproc.new_heuristic", "off")]).unwrap();
        assert!(!cfg.new_heuristic);
    }
}
