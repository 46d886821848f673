//! Generator configuration types (csgen.toml format).

use crate::{ConfigError, Result};
use csgen_clang::CS_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Root generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenConfig {
    /// Front-end settings.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Translation policy.
    #[serde(default)]
    pub translate: TranslateConfig,

    /// Output wrapping and layout.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings passed to libclang.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    /// C standard (e.g., "c99", "c11").
    #[serde(default)]
    pub std: Option<String>,

    /// Include directories.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Preprocessor definitions.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Additional raw compiler arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Function names added to the built-in skip set.
    #[serde(default)]
    pub skip: Vec<String>,

    /// Parameter renames added to the built-in ones.
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Namespace wrapping the generated class.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Partial class holding the generated methods.
    #[serde(default)]
    pub class: Option<String>,

    /// Prefix for each body line (default: none).
    #[serde(default)]
    pub indent: Option<String>,
}

impl GenConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Compiler arguments for libclang.
    pub fn clang_args(&self) -> Vec<String> {
        let std = self.parser.std.as_deref().unwrap_or("c99");
        let mut args = vec!["-x".to_string(), "c".to_string(), format!("-std={}", std)];
        args.extend(self.parser.includes.iter().map(|dir| format!("-I{}", dir)));
        args.extend(self.parser.defines.iter().map(|def| format!("-D{}", def)));
        args.extend(self.parser.args.iter().cloned());
        args
    }

    /// Check rename targets and indentation.
    pub fn validate(&self) -> Result<()> {
        for (from, to) in &self.translate.renames {
            if to.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rename of `{}` has an empty target",
                    from
                )));
            }
            if CS_KEYWORDS.contains(&to.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "rename of `{}` targets the reserved name `{}`",
                    from, to
                )));
            }
        }

        if let Some(indent) = &self.output.indent {
            if !indent.chars().all(|c| c == ' ' || c == '\t') {
                return Err(ConfigError::Validation(format!(
                    "indent must contain only spaces and tabs, got {:?}",
                    indent
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for GenConfig {
    type Err = ConfigError;

    /// Parse and validate configuration from TOML text.
    fn from_str(s: &str) -> Result<Self> {
        let config: GenConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[parser]
std = "c11"
includes = ["include", "/opt/stb"]
defines = ["NDEBUG", "STBI_ONLY_PNG"]
args = ["-w"]

[translate]
skip = ["stbi__shiftsigned"]
renames = { in = "input" }

[output]
namespace = "StbSharp"
class = "StbImage"
indent = "\t"
        "#;

        let config = GenConfig::from_str(toml).unwrap();

        assert_eq!(config.parser.std, Some("c11".to_string()));
        assert_eq!(config.translate.skip, vec!["stbi__shiftsigned"]);
        assert_eq!(config.translate.renames.get("in").map(String::as_str), Some("input"));
        assert_eq!(config.output.class.as_deref(), Some("StbImage"));
        assert_eq!(config.output.indent.as_deref(), Some("\t"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GenConfig::from_str("").unwrap();
        assert!(config.parser.includes.is_empty());
        assert!(config.translate.renames.is_empty());
        assert_eq!(config.output.namespace, None);
        assert_eq!(config.clang_args(), vec!["-x", "c", "-std=c99"]);
    }

    #[test]
    fn test_clang_args() {
        let config = GenConfig {
            parser: ParserConfig {
                std: Some("c11".to_string()),
                includes: vec!["include".to_string()],
                defines: vec!["STBI_NO_STDIO".to_string()],
                args: vec!["-w".to_string()],
            },
            ..Default::default()
        };

        assert_eq!(
            config.clang_args(),
            vec!["-x", "c", "-std=c11", "-Iinclude", "-DSTBI_NO_STDIO", "-w"]
        );
    }

    #[test]
    fn test_rename_validation() {
        let empty = GenConfig::from_str("[translate]\nrenames = { in = \" \" }\n");
        assert!(matches!(empty, Err(ConfigError::Validation(_))));

        let reserved = GenConfig::from_str("[translate]\nrenames = { in = \"out\" }\n");
        match reserved {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("`out`")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_indent_validation() {
        let bad = GenConfig::from_str("[output]\nindent = \"->\"\n");
        assert!(matches!(bad, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = GenConfig::from_str("[parser\nstd = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[translate]\nskip = [\"my_helper\"]").unwrap();

        let config = GenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.translate.skip, vec!["my_helper"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = GenConfig::from_file(&dir.path().join("csgen.toml"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}
