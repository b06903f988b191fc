use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment variables overriding any setting.
const ENV_PREFIX: &str = "RDSPROV_";

/// Credential variables read under their conventional names.
const CREDENTIAL_VARS: [(&str, &str); 5] = [
    ("GITHUB_TOKEN", "github.token"),
    ("CIRCLE_TOKEN", "circleci.token"),
    ("SN_INSTANCE", "servicenow.instance"),
    ("SN_USER", "servicenow.username"),
    ("SN_PASSWORD", "servicenow.password"),
];

/// Load configuration: defaults, then the optional file, then environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(credential_env())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Map the conventional credential variables onto their config keys.
fn credential_env() -> Env {
    let names: Vec<&str> = CREDENTIAL_VARS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        CREDENTIAL_VARS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
            .unwrap_or_else(|| key.as_str().to_string().into())
    })
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[github]
owner = "example-org"

[workflow]
review_poll_interval_secs = 30
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.github.owner, "example-org");
        assert_eq!(config.workflow.review_poll_interval_secs, 30);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[workflow]
review_poll_interval_secs = "soon"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/provisioner.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[circleci]
target_job = "terraform_apply"
list_limit = 10

[generator]
maintenance_day = "Sat"
"#
        )
        .unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.circleci.target_job, "terraform_apply");
        assert_eq!(config.circleci.list_limit, 10);
        assert_eq!(config.generator.maintenance_day, "Sat");
        assert_eq!(config.github.base_branch, "master");
    }

    #[test]
    fn test_credential_vars_are_mapped() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GITHUB_TOKEN", "gh-token");
            jail.set_env("SN_INSTANCE", "example.service-now.com");
            jail.set_env("RDSPROV_CIRCLECI__TARGET_JOB", "deploy");

            let config = load_config(None).unwrap();
            assert_eq!(config.github.token, "gh-token");
            assert_eq!(config.servicenow.instance, "example.service-now.com");
            assert_eq!(config.circleci.target_job, "deploy");
            Ok(())
        });
    }
}
