use super::{
    types::{Config, RunMode},
    ConfigError,
};

/// Validate configuration for a run mode.
///
/// Every mode needs a usable generator setup. Publishing additionally needs
/// credentials for every external system, checked here so a run never
/// starts external work it cannot finish.
pub fn validate_config(config: &Config, mode: RunMode) -> Result<(), ConfigError> {
    let generator = &config.generator;
    if generator.port_min >= generator.port_max {
        return Err(ConfigError::ValidationError(format!(
            "generator port range {}..{} is empty",
            generator.port_min, generator.port_max
        )));
    }
    if generator.window_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "generator.window_minutes cannot be 0".to_string(),
        ));
    }
    let span = generator.backup_end_hour.abs_diff(generator.backup_start_hour) * 60;
    if span <= generator.window_minutes
        || span - generator.window_minutes <= generator.backup_start_hour * 60
    {
        return Err(ConfigError::ValidationError(format!(
            "backup window range for hours {}..{} with {} minute windows is empty",
            generator.backup_start_hour, generator.backup_end_hour, generator.window_minutes
        )));
    }

    if mode != RunMode::Terraform {
        return Ok(());
    }

    let required = [
        ("GITHUB_TOKEN", "github.token", &config.github.token),
        ("CIRCLE_TOKEN", "circleci.token", &config.circleci.token),
        ("SN_INSTANCE", "servicenow.instance", &config.servicenow.instance),
        ("SN_USER", "servicenow.username", &config.servicenow.username),
        ("SN_PASSWORD", "servicenow.password", &config.servicenow.password),
    ];
    for (var, key, value) in required {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "environment variable {} ({}) must be set if format is 'terraform'",
                var, key
            )));
        }
    }

    if config.github.owner.is_empty() {
        return Err(ConfigError::ValidationError(
            "github.owner must be set if format is 'terraform'".to_string(),
        ));
    }
    if config.workflow.review_poll_interval_secs == 0
        || config.workflow.build_poll_interval_secs == 0
    {
        return Err(ConfigError::ValidationError(
            "poll intervals cannot be 0".to_string(),
        ));
    }

    Ok(())
}
