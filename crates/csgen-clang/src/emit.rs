//! Function emission.
//!
//! Writes a `private static` C# method for each C function definition,
//! running the [`Translator`] over every statement of the body.

use crate::ast::{NodeKind, Param, SyntaxNode};
use crate::error::Result;
use crate::translate::{ensure_statement_finished, FunctionContext, Translator};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

/// Functions with hand-written replacements in the runtime support library.
pub const DEFAULT_SKIP_SET: &[&str] = &[
    "stbi__malloc",
    "stbi_image_free",
    "stbi_failure_reason",
    "stbi__err",
    "stbi_is_hdr_from_memory",
    "stbi_is_hdr_from_callbacks",
];

/// C# keywords that are legal C identifiers.
pub const CS_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "byte", "catch", "checked", "class", "decimal",
    "delegate", "event", "explicit", "false", "finally", "fixed", "foreach", "implicit",
    "in", "interface", "internal", "is", "lock", "namespace", "new", "null", "object",
    "operator", "out", "override", "params", "private", "protected", "public", "readonly",
    "ref", "sbyte", "sealed", "stackalloc", "string", "this", "throw", "true", "try",
    "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
];

/// C identifiers that are reserved words in C#, with their replacements.
pub const DEFAULT_RENAMES: &[(&str, &str)] = &[("out", "output")];

/// Options controlling function emission.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Function names that are never emitted
    pub skip: FxHashSet<String>,
    /// Parameter name substitutions
    pub renames: FxHashMap<String, String>,
    /// Prefix written before every body line
    pub indent: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP_SET.iter().map(|s| s.to_string()).collect(),
            renames: DEFAULT_RENAMES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            indent: String::new(),
        }
    }
}

impl EmitOptions {
    /// Add a name to the skip set.
    pub fn with_skip(mut self, name: impl Into<String>) -> Self {
        self.skip.insert(name.into());
        self
    }

    /// Add a parameter rename.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// Emits one C# method per C function definition.
#[derive(Debug, Clone, Default)]
pub struct FunctionEmitter {
    options: EmitOptions,
}

impl FunctionEmitter {
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Whether `name` is in the skip set.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.options.skip.contains(name)
    }

    /// Emit a function definition.
    ///
    /// Returns `Ok(None)` when nothing is written: the node is not a
    /// function, has no body, or is in the skip set.
    pub fn emit(&self, function: &SyntaxNode) -> Result<Option<String>> {
        let NodeKind::FunctionDecl {
            name,
            return_type,
            params,
            ..
        } = &function.kind
        else {
            return Ok(None);
        };

        if self.is_skipped(name) {
            return Ok(None);
        }

        let Some(body) = function.find_child(|k| matches!(k, NodeKind::CompoundStmt)) else {
            return Ok(None);
        };

        let context = FunctionContext::new(return_type);
        let translator = Translator::new(&context);

        let mut out = format!(
            "private static {} {}({})\n{{\n",
            context.return_type,
            name,
            self.parameter_list(params)
        );

        for statement in &body.children {
            let translation = translator.translate(statement)?;
            if translation.text.is_empty() {
                continue;
            }
            self.write_indented(&mut out, &ensure_statement_finished(&translation.text));
        }

        out.push_str("}\n");
        Ok(Some(out))
    }

    fn parameter_list(&self, params: &[Param]) -> String {
        params
            .iter()
            .map(|param| format!("{} {}", param.ty.to_cs_type_str(), self.parameter_name(&param.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Configured renames win; any other C# keyword is escaped with `@`.
    fn parameter_name(&self, name: &str) -> String {
        if let Some(renamed) = self.options.renames.get(name) {
            return renamed.clone();
        }
        if CS_KEYWORDS.contains(&name) {
            warn!(parameter = name, "parameter name is a C# keyword, escaping it");
            return format!("@{}", name);
        }
        name.to_string()
    }

    fn write_indented(&self, out: &mut String, text: &str) {
        for line in text.lines() {
            out.push_str(&self.options.indent);
            out.push_str(line);
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::types::{CType, CTypeKind};

    fn make_function(name: &str, return_type: CType, params: Vec<Param>, body: Option<Vec<SyntaxNode>>) -> SyntaxNode {
        let mut node = SyntaxNode::new(NodeKind::FunctionDecl {
            name: name.into(),
            return_type,
            params: params.clone(),
            is_definition: body.is_some(),
        });
        for param in params {
            node = node.with_child(
                SyntaxNode::new(NodeKind::ParmDecl)
                    .with_spelling(param.name)
                    .with_type(param.ty),
            );
        }
        if let Some(stmts) = body {
            node = node.with_child(SyntaxNode::new(NodeKind::CompoundStmt).with_children(stmts));
        }
        node
    }

    fn param(name: &str, ty: CType) -> Param {
        Param { name: name.into(), ty }
    }

    fn int_ref(name: &str) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Unexposed("UnexposedExpr".into()))
            .with_type(CType::int())
            .with_child(SyntaxNode::new(NodeKind::DeclRefExpr).with_spelling(name).with_type(CType::int()))
    }

    fn add_function() -> SyntaxNode {
        let sum = SyntaxNode::new(NodeKind::BinaryOperator(BinaryOp::Add))
            .with_type(CType::int())
            .with_child(int_ref("a"))
            .with_child(int_ref("b"));
        make_function(
            "add",
            CType::int(),
            vec![param("a", CType::int()), param("b", CType::int())],
            Some(vec![SyntaxNode::new(NodeKind::ReturnStmt).with_child(sum)]),
        )
    }

    #[test]
    fn test_emit_add() {
        let emitter = FunctionEmitter::default();
        let out = emitter.emit(&add_function()).unwrap();
        assert_eq!(
            out.as_deref(),
            Some("private static int add(int a, int b)\n{\nreturn (int)(a + b);\n}\n")
        );
    }

    #[test]
    fn test_emit_with_indent() {
        let emitter = FunctionEmitter::new(EmitOptions::default().with_indent("    "));
        let out = emitter.emit(&add_function()).unwrap().unwrap();
        assert_eq!(out, "private static int add(int a, int b)\n{\n    return (int)(a + b);\n}\n");
    }

    #[test]
    fn test_forward_declaration_emits_nothing() {
        let decl = make_function("f", CType::void(), vec![], None);
        assert!(FunctionEmitter::default().emit(&decl).unwrap().is_none());
    }

    #[test]
    fn test_skip_set() {
        let emitter = FunctionEmitter::default();
        for name in DEFAULT_SKIP_SET {
            assert!(emitter.is_skipped(name));
            let f = make_function(name, CType::void(), vec![], Some(vec![]));
            assert!(emitter.emit(&f).unwrap().is_none());
        }

        let custom = FunctionEmitter::new(EmitOptions::default().with_skip("add"));
        assert!(custom.emit(&add_function()).unwrap().is_none());
    }

    #[test]
    fn test_reserved_parameter_rename() {
        let f = make_function(
            "copy",
            CType::void(),
            vec![
                param("out", CType::builtin(CTypeKind::UChar).ptr()),
                param("in", CType::builtin(CTypeKind::UChar).into_const().ptr()),
            ],
            Some(vec![]),
        );
        let out = FunctionEmitter::default().emit(&f).unwrap().unwrap();
        assert_eq!(
            out,
            "private static void copy(Pointer<byte> output, Pointer<byte> @in)\n{\n}\n"
        );

        let renamed = FunctionEmitter::new(EmitOptions::default().with_rename("in", "input"));
        let out = renamed.emit(&f).unwrap().unwrap();
        assert!(out.starts_with("private static void copy(Pointer<byte> output, Pointer<byte> input)"));
    }

    #[test]
    fn test_keyword_parameters_are_escaped() {
        let f = make_function(
            "f",
            CType::void(),
            vec![param("base", CType::int()), param("params", CType::int()), param("n", CType::int())],
            Some(vec![]),
        );
        let out = FunctionEmitter::default().emit(&f).unwrap().unwrap();
        assert!(out.starts_with("private static void f(int @base, int @params, int n)\n"));
    }

    #[test]
    fn test_empty_statements_are_dropped() {
        let f = make_function(
            "f",
            CType::void(),
            vec![],
            Some(vec![
                SyntaxNode::new(NodeKind::Unexposed("TypeRef".into())),
                SyntaxNode::new(NodeKind::BreakStmt),
            ]),
        );
        let out = FunctionEmitter::default().emit(&f).unwrap().unwrap();
        assert_eq!(out, "private static void f()\n{\nbreak;\n}\n");
    }

    #[test]
    fn test_failure_propagates() {
        let broken = SyntaxNode::new(NodeKind::BinaryOperator(BinaryOp::Add)).with_type(CType::int());
        let f = make_function("f", CType::int(), vec![], Some(vec![broken]));
        assert!(FunctionEmitter::default().emit(&f).is_err());
    }

    #[test]
    fn test_non_function_emits_nothing() {
        let node = SyntaxNode::new(NodeKind::TranslationUnit);
        assert!(FunctionEmitter::default().emit(&node).unwrap().is_none());
    }
}
