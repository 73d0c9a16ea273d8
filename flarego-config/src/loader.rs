use std::path::Path;

use config::{Environment, File};

use crate::error::{ConfigLoadError, Result};
use crate::models::Config;

/// Loads [`Config`] from a TOML file overlaid with `FLAREGO_`-prefixed
/// environment variables. Discovery beyond this single explicit path is out
/// of scope; callers resolve the path themselves.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigLoadError::MissingConfig {
            path: path.to_path_buf(),
        });
    }

    let built = config::Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix("FLAREGO").separator("__"))
        .build()?;

    Ok(built.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_explicitly() {
        let err = load("/nonexistent/flarego.toml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn loads_a_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flarego.toml");
        std::fs::write(
            &path,
            r#"
            [builder]
            root_name = "root"

            [gateway]
            listen_addr = "127.0.0.1:9090"
            "#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.builder.root_name, "root");
        assert_eq!(config.collector.hz, 1000);
        assert_eq!(config.gateway.max_subscribers, 256);
        assert!(config.alert_rules.is_empty());
    }

    #[test]
    fn loads_alert_rules_with_renamed_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flarego.toml");
        std::fs::write(
            &path,
            r#"
            [builder]
            root_name = "root"

            [gateway]
            listen_addr = "127.0.0.1:9090"

            [[alert_rules]]
            name = "blocked"
            expr = "blocked_goroutines > 150"
            for = "1s"
            sinks = ["log"]
            "#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.alert_rules.len(), 1);
        assert_eq!(config.alert_rules[0].for_, std::time::Duration::from_secs(1));
    }
}
