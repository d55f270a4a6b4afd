//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::FirmwareConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::firmware::module_catalog;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    tick_rate_hz: u32,
    max_tasks: usize,
    stack_pool_words: u32,
    enabled_modules: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(firmware) => {
            let warnings = collect_warnings(&firmware);
            let enabled_modules = module_catalog(&firmware)
                .into_iter()
                .filter(|module| module.enabled)
                .map(|module| module.name.to_string())
                .collect();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    tick_rate_hz: firmware.scheduler.tick_rate_hz,
                    max_tasks: firmware.scheduler.max_tasks,
                    stack_pool_words: firmware.scheduler.stack_pool_words,
                    enabled_modules,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(firmware: &FirmwareConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let tick_rate = firmware.scheduler.tick_rate();
    let enabled: Vec<_> = module_catalog(firmware)
        .into_iter()
        .filter(|module| module.enabled)
        .collect();

    if enabled.is_empty() {
        warnings.push("No module enabled - nothing will be published".to_string());
    }

    for module in &enabled {
        let exact_ticks = module.period_ms as u64 * tick_rate.hz as u64;
        if exact_ticks % 1000 != 0 {
            warnings.push(format!(
                "Module '{}': {} ms is not a whole number of ticks at {} Hz, period is {} ticks",
                module.name, module.period_ms, tick_rate.hz, module.period_ticks
            ));
        }
    }

    if enabled.len() > firmware.scheduler.max_tasks {
        warnings.push(format!(
            "{} modules enabled but only {} task slots",
            enabled.len(),
            firmware.scheduler.max_tasks
        ));
    }

    let stack_needed: u32 = enabled.iter().map(|module| module.stack_words).sum();
    if stack_needed > firmware.scheduler.stack_pool_words {
        warnings.push(format!(
            "Enabled modules need {} stack words, pool has {}",
            stack_needed, firmware.scheduler.stack_pool_words
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Tick rate: {} Hz", summary.tick_rate_hz);
            println!("  Max tasks: {}", summary.max_tasks);
            println!("  Stack pool: {} words", summary.stack_pool_words);
            println!("  Modules: {}", summary.enabled_modules.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(collect_warnings(&FirmwareConfig::default()).is_empty());
    }

    #[test]
    fn test_warns_on_truncated_period_and_small_pool() {
        let mut firmware = FirmwareConfig::default();
        firmware.scheduler.tick_rate_hz = 250;
        firmware.scheduler.stack_pool_words = 100;

        let warnings = collect_warnings(&firmware);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("not a whole number of ticks"));
        assert!(warnings[1].contains("stack words"));
    }

    #[test]
    fn test_warns_when_nothing_enabled() {
        let mut firmware = FirmwareConfig::default();
        firmware.modules.altitude.enabled = false;

        let warnings = collect_warnings(&firmware);
        assert_eq!(warnings, vec!["No module enabled - nothing will be published"]);
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/flightd.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
