//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_firmware;
pub use validate::run_validate;

use std::path::Path;

use contracts::FirmwareConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load the configuration at `path`, or the built-in defaults
fn load_config(path: Option<&Path>) -> Result<FirmwareConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(FirmwareConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    info!(config = %path.display(), "Loading configuration");
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), FirmwareConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/flightd.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scheduler]\ntick_rate_hz = 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
