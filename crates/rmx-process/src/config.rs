use rmx_core::errors::{ErrorInfo, RmError};
use rmx_kernel::backends::BackendSelection;
use serde::{Deserialize, Serialize};

fn config_error(code: &str, err: impl ToString) -> RmError {
    RmError::Config(ErrorInfo::new(code, err.to_string()))
}

/// Options shared by every estimator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOpts {
    /// Backend request; defaults to preferring the native tier.
    #[serde(default)]
    pub backend: BackendSelection,
    /// Worker threads for parallel backends; `None` uses all available cores.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Measured sub-range of the register; `None` measures every bit.
    #[serde(default)]
    pub measure: Option<(i64, i64)>,
}

impl Default for ProcessOpts {
    fn default() -> Self {
        Self {
            backend: BackendSelection::default(),
            workers: None,
            measure: None,
        }
    }
}

impl ProcessOpts {
    /// Parses options from YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self, RmError> {
        serde_yaml::from_str(text).map_err(|err| config_error("opts_yaml", err))
    }

    /// Parses options from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, RmError> {
        serde_json::from_slice(bytes).map_err(|err| config_error("opts_json", err))
    }

    /// Returns a copy with the given backend request.
    pub fn with_backend(mut self, backend: BackendSelection) -> Self {
        self.backend = backend;
        self
    }

    /// Returns a copy with the given worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Returns a copy with the given measure range.
    pub fn with_measure(mut self, start: i64, end: i64) -> Self {
        self.measure = Some((start, end));
        self
    }
}
