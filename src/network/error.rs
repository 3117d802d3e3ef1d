use thiserror::Error;

use crate::config::ConfigError;
use crate::vm::VMError;

/// Error type for network simulation failures
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A computer's VM hit a fatal error
    #[error("Computer {id} failed: {source}")]
    Vm {
        id: i64,
        #[source]
        source: VMError,
    },

    /// The network settings are unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
