use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

pub const DEFAULT_VALIDATE_IMPORT: &str = "buf/validate/validate.proto";
pub const DEFAULT_GENERATED_MODULE: &str = "crate::pb";
pub const DEFAULT_CONVERTER_FILE: &str = "convert.rs";

/// Package-wide generation settings, owned by the package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Proto package every file declares, e.g. `acme.user.v1`.
    pub package:          String,
    /// Rust path of the prost-generated types the converter targets.
    pub generated_module: String,
    /// Name of the converter artifact.
    pub converter_file:   String,
    /// Import path of the field validation extension.
    pub validate_import:  String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            package:          String::new(),
            generated_module: DEFAULT_GENERATED_MODULE.to_string(),
            converter_file:   DEFAULT_CONVERTER_FILE.to_string(),
            validate_import:  DEFAULT_VALIDATE_IMPORT.to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn new(package: impl Into<String>) -> Self {
        GeneratorConfig {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProtoError> {
        let config: GeneratorConfig = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Rejects settings that could only produce broken output.
    pub fn check(&self) -> Result<(), ProtoError> {
        if self.package.is_empty() {
            return Err(ProtoError::Config("package must not be empty".to_string()));
        }
        if !self.package.split('.').all(crate::verifier::is_identifier) {
            return Err(ProtoError::Config(format!(
                "package {} is not a dotted identifier",
                crate::utils::quote(&self.package)
            )));
        }
        if self.generated_module.is_empty() || self.converter_file.is_empty() {
            return Err(ProtoError::Config(
                "generated_module and converter_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
