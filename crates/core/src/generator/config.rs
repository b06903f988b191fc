//! Generator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the Terraform document generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Lowest port that may be drawn (inclusive).
    #[serde(default = "default_port_min")]
    pub port_min: u16,

    /// Highest port that may be drawn (exclusive).
    #[serde(default = "default_port_max")]
    pub port_max: u16,

    /// Earliest hour (UTC) a backup window may start.
    #[serde(default = "default_backup_start_hour")]
    pub backup_start_hour: u32,

    /// Hour (UTC) bounding the backup window draw.
    /// Windows never wrap a day boundary, so keep this conservative.
    #[serde(default = "default_backup_end_hour")]
    pub backup_end_hour: u32,

    /// Length of both the backup and the maintenance window.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// Weekday label of the maintenance window.
    #[serde(default = "default_maintenance_day")]
    pub maintenance_day: String,

    /// Name of the network module the document references but does not declare.
    #[serde(default = "default_network_module")]
    pub network_module: String,

    /// Emit an SSM parameter holding the master password.
    #[serde(default = "default_true")]
    pub password_parameter: bool,

    /// Replace the builtin engine catalog with this TOML file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Fixed parameters of the RDS module block.
    #[serde(default)]
    pub module_defaults: ModuleDefaults,
}

fn default_port_min() -> u16 {
    1150
}

fn default_port_max() -> u16 {
    65535
}

fn default_backup_start_hour() -> u32 {
    3 // 0300 UTC, 11:00PM ET
}

fn default_backup_end_hour() -> u32 {
    9 // 0900 UTC, 5:00AM ET
}

fn default_window_minutes() -> u32 {
    30
}

fn default_maintenance_day() -> String {
    "Thu".to_string()
}

fn default_network_module() -> String {
    "network".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            port_min: default_port_min(),
            port_max: default_port_max(),
            backup_start_hour: default_backup_start_hour(),
            backup_end_hour: default_backup_end_hour(),
            window_minutes: default_window_minutes(),
            maintenance_day: default_maintenance_day(),
            network_module: default_network_module(),
            password_parameter: true,
            catalog_path: None,
            module_defaults: ModuleDefaults::default(),
        }
    }
}

/// Parameters every generated RDS module block starts from.
///
/// Ticket values override `monitoring_interval` and the performance
/// insights settings when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDefaults {
    pub source: String,
    pub version: String,
    /// Days.
    pub backup_retention_period: u32,
    pub create_db_option_group: bool,
    pub create_db_parameter_group: bool,
    pub create_monitoring_role: bool,
    pub deletion_protection: bool,
    /// Seconds between enhanced monitoring samples.
    pub monitoring_interval: u32,
    pub performance_insights_enabled: bool,
    /// Days.
    pub performance_insights_retention_period: u32,
    pub publicly_accessible: bool,
    pub storage_encrypted: bool,
}

impl Default for ModuleDefaults {
    fn default() -> Self {
        Self {
            source: "terraform-aws-modules/rds/aws".to_string(),
            version: "~> 2.0".to_string(),
            backup_retention_period: 31,
            create_db_option_group: false,
            create_db_parameter_group: false,
            create_monitoring_role: true,
            deletion_protection: true,
            monitoring_interval: 5,
            performance_insights_enabled: true,
            performance_insights_retention_period: 7,
            publicly_accessible: false,
            storage_encrypted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.port_min, 1150);
        assert_eq!(config.port_max, 65535);
        assert_eq!(config.backup_start_hour, 3);
        assert_eq!(config.backup_end_hour, 9);
        assert_eq!(config.window_minutes, 30);
        assert_eq!(config.maintenance_day, "Thu");
        assert!(config.password_parameter);
        assert_eq!(config.module_defaults.backup_retention_period, 31);
        assert!(config.module_defaults.storage_encrypted);
        assert!(config.module_defaults.deletion_protection);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            maintenance_day = "Sun"
            password_parameter = false

            [module_defaults]
            monitoring_interval = 60
        "#;
        let config: GeneratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.maintenance_day, "Sun");
        assert!(!config.password_parameter);
        assert_eq!(config.port_min, 1150);
        assert_eq!(config.module_defaults.monitoring_interval, 60);
        assert_eq!(config.module_defaults.backup_retention_period, 31);
        assert_eq!(config.module_defaults.source, "terraform-aws-modules/rds/aws");
    }
}
