use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, Result};

/// Environment variable consulted by [`MatrixConfig::from_env`].
pub const MAX_PARALLELISM_ENV: &str = "EXPMAT_MAX_PARALLELISM";

/// Execution settings carried by every matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Upper bound on concurrently running workers in one bulk operation.
    pub max_degree_of_parallelism: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            max_degree_of_parallelism: rayon::current_num_threads().max(1),
        }
    }
}

impl MatrixConfig {
    /// Creates a configuration with an explicit degree of parallelism.
    pub fn new(max_degree_of_parallelism: usize) -> Result<Self> {
        if max_degree_of_parallelism == 0 {
            return Err(MatrixError::InvalidConfiguration(
                "max_degree_of_parallelism must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_degree_of_parallelism,
        })
    }

    /// Reads the degree of parallelism from `EXPMAT_MAX_PARALLELISM`, falling back to
    /// the host concurrency when the variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(MAX_PARALLELISM_ENV) {
            Ok(raw) => Self::parse_degree(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn parse_degree(raw: &str) -> Result<Self> {
        let degree = raw.trim().parse::<usize>().map_err(|_| {
            MatrixError::InvalidConfiguration(format!(
                "{} must be a positive integer, got '{}'",
                MAX_PARALLELISM_ENV, raw
            ))
        })?;
        log::debug!("{} set to {}", MAX_PARALLELISM_ENV, degree);
        Self::new(degree)
    }
}
