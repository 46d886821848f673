//! C to C# source translation over the libclang AST.
//!
//! This crate provides:
//! - C source parsing via libclang into an owned syntax tree
//! - C type classification and mapping to C# type names
//! - Expression and statement translation to C# text
//! - Per-function emission and a translation-unit driver
//!
//! # Architecture
//!
//! ```text
//! C Source → libclang → SyntaxTree → TranslationUnitDriver → FunctionEmitter → Translator → C#
//! ```

mod ast;
mod driver;
mod emit;
mod error;
mod parse;
mod translate;
mod types;

pub use ast::{BinaryOp, NodeKind, Param, SourceLocation, SyntaxNode, SyntaxTree, UnaryOp};
pub use driver::{EmittedFunction, FunctionFailure, OutputOptions, TranslationReport, TranslationUnitDriver};
pub use emit::{EmitOptions, FunctionEmitter, CS_KEYWORDS, DEFAULT_RENAMES, DEFAULT_SKIP_SET};
pub use error::{Result, TranslateError};
pub use parse::{ClangParser, DEFAULT_ARGS};
pub use translate::{ensure_statement_finished, FunctionContext, NodeInfo, Translation, Translator};
pub use types::{CType, CTypeKind, ADDRESS_TYPE, OBJECT_TYPE, POINTER_WRAPPER};

use std::path::Path;

/// Parse a C source file and translate every function it defines.
pub fn translate_file(path: &Path, args: Vec<String>, options: EmitOptions) -> miette::Result<TranslationReport> {
    let parser = ClangParser::new()?.with_args(args);
    let tree = parser.parse_file(path)?;
    Ok(TranslationUnitDriver::new(options).run(&tree))
}
