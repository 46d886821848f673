//! Configuration for the csgen C to C# translator.
//!
//! # Example
//!
//! ```toml
//! # csgen.toml
//! [parser]
//! std = "c99"
//! includes = ["include"]
//! defines = ["STBI_NO_STDIO"]
//!
//! [translate]
//! skip = ["stbi__shiftsigned"]
//! renames = { in = "input" }
//!
//! [output]
//! namespace = "StbSharp"
//! class = "StbImage"
//! indent = "\t"
//! ```

mod config;
mod error;

pub use config::{GenConfig, OutputConfig, ParserConfig, TranslateConfig};
pub use error::{ConfigError, Result};
