//! Translation-unit driver.

use crate::ast::{NodeKind, SyntaxNode, SyntaxTree};
use crate::emit::{EmitOptions, FunctionEmitter};
use crate::error::TranslateError;
use tracing::{debug, info, warn};

/// A translated function.
#[derive(Debug, Clone)]
pub struct EmittedFunction {
    pub name: String,
    pub text: String,
}

/// A function whose translation aborted.
#[derive(Debug)]
pub struct FunctionFailure {
    pub name: String,
    pub error: TranslateError,
}

/// Outcome of translating one translation unit.
#[derive(Debug, Default)]
pub struct TranslationReport {
    /// Emitted functions, in source order
    pub functions: Vec<EmittedFunction>,
    /// Names excluded by the skip set
    pub skipped: Vec<String>,
    pub failures: Vec<FunctionFailure>,
}

/// Wrapping applied around the emitted functions.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub namespace: Option<String>,
    pub class: Option<String>,
}

impl TranslationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Render the final C# text.
    pub fn render(&self, output: &OutputOptions) -> String {
        let mut out = String::new();

        if let Some(namespace) = &output.namespace {
            out.push_str(&format!("namespace {}\n{{\n", namespace));
        }
        if let Some(class) = &output.class {
            out.push_str(&format!("unsafe partial class {}\n{{\n", class));
        }

        for function in &self.functions {
            out.push_str(&function.text);
            out.push('\n');
        }

        if output.class.is_some() {
            out.push_str("}\n");
        }
        if output.namespace.is_some() {
            out.push_str("}\n");
        }

        out
    }
}

/// Walks a translation unit and emits every eligible function.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnitDriver {
    emitter: FunctionEmitter,
}

impl TranslationUnitDriver {
    pub fn new(options: EmitOptions) -> Self {
        Self {
            emitter: FunctionEmitter::new(options),
        }
    }

    /// Translate every function defined in `tree`.
    ///
    /// A failing function is recorded in the report and never stops the
    /// remaining functions from being emitted.
    pub fn run(&self, tree: &SyntaxTree) -> TranslationReport {
        let mut report = TranslationReport::default();
        self.visit(&tree.translation_unit, &mut report);
        report
    }

    fn visit(&self, node: &SyntaxNode, report: &mut TranslationReport) {
        if node.in_system_header {
            return;
        }

        match &node.kind {
            NodeKind::FunctionDecl {
                name,
                is_definition: false,
                ..
            } => {
                debug!(function = name.as_str(), "skipping forward declaration");
            }
            NodeKind::FunctionDecl { name, .. } => self.process_function(node, name, report),
            _ => {
                for child in &node.children {
                    self.visit(child, report);
                }
            }
        }
    }

    fn process_function(&self, node: &SyntaxNode, name: &str, report: &mut TranslationReport) {
        if self.emitter.is_skipped(name) {
            debug!(function = name, "skipping function in skip set");
            report.skipped.push(name.to_string());
            return;
        }

        match self.emitter.emit(node) {
            Ok(Some(text)) => {
                info!(function = name, "translated function");
                report.functions.push(EmittedFunction {
                    name: name.to_string(),
                    text,
                });
            }
            Ok(None) => {
                debug!(function = name, "function has no body");
            }
            Err(error) => {
                warn!(function = name, %error, "failed to translate function");
                report.failures.push(FunctionFailure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }
}
