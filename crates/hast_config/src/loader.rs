//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::HardwareGenerationConfig;
use std::collections::HashSet;
use std::path::Path;

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<HardwareGenerationConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HardwareGenerationConfig, ConfigError> {
    let config: HardwareGenerationConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and the consistency of the instance count overrides.
pub fn validate_config(config: &HardwareGenerationConfig) -> Result<(), ConfigError> {
    if config.device_name.trim().is_empty() {
        return Err(ConfigError::MissingField("device_name".to_string()));
    }

    let mut prefixes = HashSet::new();
    for entry in &config.transformer.member_invocation_instance_counts {
        if entry.member_name_prefix.is_empty() {
            return Err(ConfigError::MissingField(
                "transformer.member_invocation_instance_counts.member_name_prefix".to_string(),
            ));
        }
        if !prefixes.insert(entry.member_name_prefix.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate member name prefix '{}'",
                entry.member_name_prefix
            )));
        }
        if entry.max_invocation_instance_count() < 1 {
            return Err(ConfigError::ValidationError(format!(
                "'{}' would have no instances: max_recursion_depth + max_degree_of_parallelism must be at least 1",
                entry.member_name_prefix
            )));
        }
    }

    let mut entry_points = HashSet::new();
    for member in &config.hardware_entry_point_members {
        if !entry_points.insert(member.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "hardware entry point '{member}' is listed twice"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hast_vhdl::NameShortening;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(r#"device_name = "Nexys A7""#).unwrap();
        assert_eq!(config.device_name, "Nexys A7");
        assert!(config.use_simple_memory);
        assert!(config.transformer.member_invocation_instance_counts.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
device_name = "Nexys A7"
hardware_entry_point_members = ["Samples.PrimeCalculator::IsPrime(u32)"]
use_simple_memory = false

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Samples.Parallel"
max_degree_of_parallelism = 5
max_recursion_depth = 0

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Samples.Recursive"
max_recursion_depth = 3

[vhdl]
format_code = true
omit_comments = false
name_shortener = "readable"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.hardware_entry_point_members.len(), 1);
        assert!(!config.use_simple_memory);
        let counts = &config.transformer.member_invocation_instance_counts;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].max_invocation_instance_count(), 5);
        assert_eq!(counts[1].max_degree_of_parallelism, 1);
        assert_eq!(counts[1].max_invocation_instance_count(), 4);
        assert!(config.vhdl.format_code);
        assert!(!config.vhdl.omit_comments);
        assert_eq!(config.vhdl.name_shortener, NameShortening::Readable);
    }

    #[test]
    fn missing_device_name_errors() {
        let err = load_config_from_str(r#"device_name = " ""#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn zero_instances_rejected() {
        let toml = r#"
device_name = "Nexys A7"

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Samples.Never"
max_degree_of_parallelism = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn duplicate_prefix_rejected() {
        let toml = r#"
device_name = "Nexys A7"

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Samples"

[[transformer.member_invocation_instance_counts]]
member_name_prefix = "Samples"
max_recursion_depth = 2
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate member name prefix 'Samples'"));
    }

    #[test]
    fn empty_prefix_rejected() {
        let toml = r#"
device_name = "Nexys A7"

[[transformer.member_invocation_instance_counts]]
member_name_prefix = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "device_name = \"Nexys A7\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.device_name, "Nexys A7");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
