use indoc::indoc;
use statica_core::config::{RewriteConfig, Rules, SafeNavigationTemps};
use statica_core::errors::ConfigError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statica.yaml");
    fs::write(
        &path,
        indoc! {"
            rules: SAFE_NAVIGATION | ARRAY_INDEX
            safeNavigationTemps: always
            syntheticLocalPrefix: built
        "},
    )
    .unwrap();

    let config = RewriteConfig::from_file(&path).unwrap();
    assert_eq!(config.rules, Rules::SAFE_NAVIGATION | Rules::ARRAY_INDEX);
    assert_eq!(config.safe_navigation_temps, SafeNavigationTemps::Always);
    assert_eq!(config.synthetic_local_prefix, "built");
    assert_eq!(config.temporary_prefix, "tmp");
}

#[test]
fn test_load_yml_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statica.yml");
    fs::write(&path, "temporaryPrefix: t\n").unwrap();

    let config = RewriteConfig::from_file(&path).unwrap();
    assert_eq!(config.temporary_prefix, "t");
    assert_eq!(config.rules, Rules::all());
}

#[test]
fn test_load_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statica.json");
    fs::write(
        &path,
        indoc! {r#"
            {
                "rules": "STATIC_CALLS | NAMED_CONSTRUCTORS",
                "safeNavigationTemps": "when-impure"
            }
        "#},
    )
    .unwrap();

    let config = RewriteConfig::from_file(&path).unwrap();
    assert!(config.is_enabled(Rules::STATIC_CALLS));
    assert!(config.is_enabled(Rules::NAMED_CONSTRUCTORS));
    assert!(!config.is_enabled(Rules::SAFE_NAVIGATION));
    assert_eq!(config.safe_navigation_temps, SafeNavigationTemps::WhenImpure);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("statica.toml");
    fs::write(&path, "rules = 1\n").unwrap();

    let err = RewriteConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "toml"));
    assert_eq!(err.to_string(), "unsupported config file extension: toml");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = RewriteConfig::from_file(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_unknown_policy_is_yaml_error() {
    let err = RewriteConfig::from_yaml_str("safeNavigationTemps: sometimes\n").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_config_round_trips_through_yaml() {
    let config = RewriteConfig {
        rules: Rules::BINARY_OPERATORS,
        safe_navigation_temps: SafeNavigationTemps::Always,
        synthetic_local_prefix: "o".to_string(),
        temporary_prefix: "t".to_string(),
    };
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert_eq!(RewriteConfig::from_yaml_str(&yaml).unwrap(), config);
}
