//! C parsing using libclang.
//!
//! The translation unit is converted eagerly into an owned [`SyntaxTree`];
//! no libclang handle outlives a call to [`ClangParser::parse_file`] or
//! [`ClangParser::parse_string`].

use crate::ast::{
    BinaryOp, NodeKind, Param, SourceLocation, SyntaxNode, SyntaxTree, UnaryOp,
};
use crate::types::{CType, CTypeKind};
use miette::{miette, Result};
use smol_str::SmolStr;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint, c_ulong};
use std::path::Path;
use std::ptr;
use tracing::debug;

/// Compiler arguments used when none are given.
pub const DEFAULT_ARGS: &[&str] = &["-x", "c", "-std=c99"];

/// Parser that uses libclang to parse C source files.
pub struct ClangParser {
    index: clang_sys::CXIndex,
    args: Vec<String>,
}

impl ClangParser {
    /// Create a new Clang parser, loading libclang if needed.
    pub fn new() -> Result<Self> {
        if !clang_sys::is_loaded() {
            clang_sys::load().map_err(|e| miette!("Failed to load libclang: {}", e))?;
        }

        unsafe {
            let index = clang_sys::clang_createIndex(0, 0);
            if index.is_null() {
                return Err(miette!("Failed to create clang index"));
            }
            Ok(Self {
                index,
                args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Replace the compiler arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Parse a C source file.
    pub fn parse_file(&self, path: &Path) -> Result<SyntaxTree> {
        let path_str = path.to_string_lossy();
        let c_path =
            CString::new(path_str.as_ref()).map_err(|_| miette!("Invalid path: {}", path_str))?;

        self.parse(&c_path, &mut [])
            .map_err(|e| miette!("Failed to parse {}: {}", path_str, e))
    }

    /// Parse C source code held in memory.
    pub fn parse_string(&self, source: &str, filename: &str) -> Result<SyntaxTree> {
        let c_filename =
            CString::new(filename).map_err(|_| miette!("Invalid file name: {}", filename))?;
        let c_source =
            CString::new(source).map_err(|_| miette!("Source contains an interior NUL byte"))?;

        let mut unsaved = [clang_sys::CXUnsavedFile {
            Filename: c_filename.as_ptr(),
            Contents: c_source.as_ptr(),
            Length: source.len() as c_ulong,
        }];

        self.parse(&c_filename, &mut unsaved)
    }

    fn parse(
        &self,
        filename: &CStr,
        unsaved: &mut [clang_sys::CXUnsavedFile],
    ) -> Result<SyntaxTree> {
        let args = self
            .args
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| miette!("Invalid compiler argument: {}", a)))
            .collect::<Result<Vec<_>>>()?;
        let c_args: Vec<*const c_char> = args.iter().map(|s| s.as_ptr()).collect();

        unsafe {
            let tu = clang_sys::clang_parseTranslationUnit(
                self.index,
                filename.as_ptr(),
                c_args.as_ptr(),
                c_args.len() as c_int,
                if unsaved.is_empty() {
                    ptr::null_mut()
                } else {
                    unsaved.as_mut_ptr()
                },
                unsaved.len() as c_uint,
                clang_sys::CXTranslationUnit_None,
            );

            if tu.is_null() {
                return Err(miette!("libclang could not create a translation unit"));
            }

            let num_diagnostics = clang_sys::clang_getNumDiagnostics(tu);
            for i in 0..num_diagnostics {
                let diag = clang_sys::clang_getDiagnostic(tu, i);
                let severity = clang_sys::clang_getDiagnosticSeverity(diag);

                if severity >= clang_sys::CXDiagnostic_Error {
                    let spelling = clang_sys::clang_getDiagnosticSpelling(diag);
                    let msg = cx_string_to_string(spelling);
                    clang_sys::clang_disposeDiagnostic(diag);
                    clang_sys::clang_disposeTranslationUnit(tu);
                    return Err(miette!("Clang error: {}", msg));
                }
                clang_sys::clang_disposeDiagnostic(diag);
            }

            let cursor = clang_sys::clang_getTranslationUnitCursor(tu);
            let root = TreeBuilder { tu }.convert_cursor(cursor);

            clang_sys::clang_disposeTranslationUnit(tu);

            Ok(SyntaxTree {
                translation_unit: root,
            })
        }
    }
}

impl Drop for ClangParser {
    fn drop(&mut self) {
        unsafe {
            clang_sys::clang_disposeIndex(self.index);
        }
    }
}

/// Converts cursors of one translation unit into owned nodes.
struct TreeBuilder {
    tu: clang_sys::CXTranslationUnit,
}

/// Client data threaded through `clang_visitChildren`.
struct VisitState<'a> {
    builder: &'a TreeBuilder,
    children: Vec<SyntaxNode>,
}

extern "C" fn visit_child(
    child: clang_sys::CXCursor,
    _parent: clang_sys::CXCursor,
    data: clang_sys::CXClientData,
) -> clang_sys::CXChildVisitResult {
    unsafe {
        let state = &mut *(data as *mut VisitState<'_>);

        if clang_sys::clang_Cursor_isNull(child) != 0 {
            return clang_sys::CXChildVisit_Continue;
        }

        let node = state.builder.convert_cursor(child);
        state.children.push(node);
        clang_sys::CXChildVisit_Continue
    }
}

extern "C" fn visit_first_child(
    child: clang_sys::CXCursor,
    _parent: clang_sys::CXCursor,
    data: clang_sys::CXClientData,
) -> clang_sys::CXChildVisitResult {
    unsafe {
        let first = &mut *(data as *mut Option<clang_sys::CXCursor>);
        *first = Some(child);
        clang_sys::CXChildVisit_Break
    }
}

/// A token with its byte offset in the expansion file.
struct Token {
    spelling: String,
    offset: u32,
    is_punctuation: bool,
}

impl TreeBuilder {
    fn convert_cursor(&self, cursor: clang_sys::CXCursor) -> SyntaxNode {
        unsafe {
            let kind = clang_sys::clang_getCursorKind(cursor);
            let node_kind = self.convert_cursor_kind(cursor, kind);

            let tokens = match node_kind {
                NodeKind::IntegerLiteral
                | NodeKind::FloatingLiteral
                | NodeKind::CharacterLiteral
                | NodeKind::StringLiteral
                | NodeKind::UnaryExpr => self
                    .cursor_tokens(cursor)
                    .into_iter()
                    .map(|t| t.spelling)
                    .collect(),
                _ => Vec::new(),
            };

            let mut state = VisitState {
                builder: self,
                children: Vec::new(),
            };
            clang_sys::clang_visitChildren(
                cursor,
                visit_child,
                &mut state as *mut VisitState<'_> as clang_sys::CXClientData,
            );

            let cursor_location = clang_sys::clang_getCursorLocation(cursor);

            SyntaxNode {
                kind: node_kind,
                ty: self.convert_type(clang_sys::clang_getCursorType(cursor)),
                spelling: SmolStr::new(cursor_spelling(cursor)),
                tokens,
                children: state.children,
                location: get_location(cursor),
                in_system_header: clang_sys::clang_Location_isInSystemHeader(cursor_location) != 0,
            }
        }
    }

    fn convert_cursor_kind(
        &self,
        cursor: clang_sys::CXCursor,
        kind: clang_sys::CXCursorKind,
    ) -> NodeKind {
        unsafe {
            match kind {
                clang_sys::CXCursor_TranslationUnit => NodeKind::TranslationUnit,

                // Declarations
                clang_sys::CXCursor_FunctionDecl => {
                    let name = SmolStr::new(cursor_spelling(cursor));
                    let return_type = self.convert_type(clang_sys::clang_getCursorResultType(cursor));
                    let num_args = clang_sys::clang_Cursor_getNumArguments(cursor);

                    let mut params = Vec::new();
                    for i in 0..num_args.max(0) {
                        let arg = clang_sys::clang_Cursor_getArgument(cursor, i as c_uint);
                        params.push(Param {
                            name: SmolStr::new(cursor_spelling(arg)),
                            ty: self.convert_type(clang_sys::clang_getCursorType(arg)),
                        });
                    }

                    let is_definition = clang_sys::clang_isCursorDefinition(cursor) != 0;

                    NodeKind::FunctionDecl {
                        name,
                        return_type,
                        params,
                        is_definition,
                    }
                }
                clang_sys::CXCursor_ParmDecl => NodeKind::ParmDecl,
                clang_sys::CXCursor_VarDecl => {
                    let init = clang_sys::clang_Cursor_getVarDeclInitializer(cursor);
                    NodeKind::VarDecl {
                        has_init: clang_sys::clang_Cursor_isNull(init) == 0,
                    }
                }

                // Statements
                clang_sys::CXCursor_CompoundStmt => NodeKind::CompoundStmt,
                clang_sys::CXCursor_DeclStmt => NodeKind::DeclStmt,
                clang_sys::CXCursor_ReturnStmt => NodeKind::ReturnStmt,
                clang_sys::CXCursor_IfStmt => NodeKind::IfStmt,
                clang_sys::CXCursor_ForStmt => NodeKind::ForStmt,
                clang_sys::CXCursor_WhileStmt => NodeKind::WhileStmt,
                clang_sys::CXCursor_DoStmt => NodeKind::DoStmt,
                clang_sys::CXCursor_SwitchStmt => NodeKind::SwitchStmt,
                clang_sys::CXCursor_CaseStmt => NodeKind::CaseStmt,
                clang_sys::CXCursor_DefaultStmt => NodeKind::DefaultStmt,
                clang_sys::CXCursor_BreakStmt => NodeKind::BreakStmt,
                clang_sys::CXCursor_ContinueStmt => NodeKind::ContinueStmt,
                clang_sys::CXCursor_GotoStmt => NodeKind::GotoStmt,
                clang_sys::CXCursor_LabelStmt => NodeKind::LabelStmt,
                clang_sys::CXCursor_LabelRef => NodeKind::LabelRef,
                clang_sys::CXCursor_NullStmt => NodeKind::NullStmt,

                // Expressions
                clang_sys::CXCursor_IntegerLiteral => NodeKind::IntegerLiteral,
                clang_sys::CXCursor_FloatingLiteral => NodeKind::FloatingLiteral,
                clang_sys::CXCursor_CharacterLiteral => NodeKind::CharacterLiteral,
                clang_sys::CXCursor_StringLiteral => NodeKind::StringLiteral,
                clang_sys::CXCursor_DeclRefExpr => NodeKind::DeclRefExpr,
                clang_sys::CXCursor_UnaryExpr => NodeKind::UnaryExpr,
                clang_sys::CXCursor_BinaryOperator => match self.binary_op(cursor) {
                    Some(op) => NodeKind::BinaryOperator(op),
                    None => unexposed(kind),
                },
                clang_sys::CXCursor_CompoundAssignOperator => match self.binary_op(cursor) {
                    Some(op) => NodeKind::CompoundAssignOperator(op),
                    None => unexposed(kind),
                },
                clang_sys::CXCursor_UnaryOperator => match self.unary_op(cursor) {
                    Some(op) => NodeKind::UnaryOperator(op),
                    None => unexposed(kind),
                },
                clang_sys::CXCursor_CallExpr => NodeKind::CallExpr,
                clang_sys::CXCursor_ConditionalOperator => NodeKind::ConditionalOperator,
                clang_sys::CXCursor_MemberRefExpr => NodeKind::MemberRefExpr,
                clang_sys::CXCursor_ArraySubscriptExpr => NodeKind::ArraySubscriptExpr,
                clang_sys::CXCursor_InitListExpr => NodeKind::InitListExpr,
                clang_sys::CXCursor_ParenExpr => NodeKind::ParenExpr,
                clang_sys::CXCursor_CStyleCastExpr => NodeKind::CStyleCastExpr,

                _ => unexposed(kind),
            }
        }
    }

    /// Convert a Clang type to our type representation.
    fn convert_type(&self, ty: clang_sys::CXType) -> CType {
        unsafe {
            let kind = match ty.kind {
                clang_sys::CXType_Invalid | clang_sys::CXType_Void => CTypeKind::Void,
                clang_sys::CXType_Bool => CTypeKind::Bool,
                clang_sys::CXType_Char_S => CTypeKind::CharS,
                clang_sys::CXType_Char_U => CTypeKind::CharU,
                clang_sys::CXType_SChar => CTypeKind::SChar,
                clang_sys::CXType_UChar => CTypeKind::UChar,
                clang_sys::CXType_Short => CTypeKind::Short,
                clang_sys::CXType_UShort => CTypeKind::UShort,
                clang_sys::CXType_Int => CTypeKind::Int,
                clang_sys::CXType_UInt => CTypeKind::UInt,
                clang_sys::CXType_Long => CTypeKind::Long,
                clang_sys::CXType_ULong => CTypeKind::ULong,
                clang_sys::CXType_LongLong => CTypeKind::LongLong,
                clang_sys::CXType_ULongLong => CTypeKind::ULongLong,
                clang_sys::CXType_Float => CTypeKind::Float,
                clang_sys::CXType_Double => CTypeKind::Double,
                clang_sys::CXType_NullPtr => CTypeKind::NullPtr,

                clang_sys::CXType_Pointer => {
                    let pointee = clang_sys::clang_getPointeeType(ty);
                    CTypeKind::Pointer(Box::new(self.convert_type(pointee)))
                }

                clang_sys::CXType_ConstantArray => {
                    let element = clang_sys::clang_getArrayElementType(ty);
                    let len = clang_sys::clang_getArraySize(ty).max(0) as u64;
                    CTypeKind::ConstantArray {
                        element: Box::new(self.convert_type(element)),
                        len,
                    }
                }

                clang_sys::CXType_IncompleteArray => {
                    let element = clang_sys::clang_getArrayElementType(ty);
                    CTypeKind::IncompleteArray(Box::new(self.convert_type(element)))
                }

                clang_sys::CXType_Record => CTypeKind::Record,
                clang_sys::CXType_Enum => CTypeKind::Enum,

                clang_sys::CXType_Typedef => {
                    let canonical = clang_sys::clang_getCanonicalType(ty);
                    CTypeKind::Typedef(Box::new(self.convert_type(canonical)))
                }

                clang_sys::CXType_Elaborated => {
                    let named = clang_sys::clang_Type_getNamedType(ty);
                    CTypeKind::Elaborated(Box::new(self.convert_type(named)))
                }

                clang_sys::CXType_FunctionProto | clang_sys::CXType_FunctionNoProto => {
                    CTypeKind::FunctionProto
                }

                clang_sys::CXType_Unexposed => {
                    let canonical = clang_sys::clang_getCanonicalType(ty);
                    if canonical.kind == clang_sys::CXType_Unexposed {
                        CTypeKind::Unexposed(None)
                    } else {
                        CTypeKind::Unexposed(Some(Box::new(self.convert_type(canonical))))
                    }
                }

                _ => CTypeKind::Other,
            };

            let size = clang_sys::clang_Type_getSizeOf(ty);

            CType {
                kind,
                is_const: clang_sys::clang_isConstQualifiedType(ty) != 0,
                spelling: cx_string_to_string(clang_sys::clang_getTypeSpelling(ty)),
                size: u64::try_from(size).ok(),
            }
        }
    }

    /// Recover a binary operator from the first operator token after the
    /// left operand.
    fn binary_op(&self, cursor: clang_sys::CXCursor) -> Option<BinaryOp> {
        let tokens = self.cursor_tokens(cursor);
        let lhs_end = self.first_child(cursor).map(|lhs| unsafe {
            let extent = clang_sys::clang_getCursorExtent(lhs);
            location_offset(clang_sys::clang_getRangeEnd(extent))
        });

        let op = tokens
            .iter()
            .filter(|t| t.is_punctuation && lhs_end.map_or(true, |end| t.offset >= end))
            .find_map(|t| BinaryOp::from_token(&t.spelling));

        if op.is_none() {
            debug!("operator token not found after left operand");
        }
        op
    }

    /// Recover a unary operator from the leading or trailing token.
    fn unary_op(&self, cursor: clang_sys::CXCursor) -> Option<UnaryOp> {
        let tokens = self.cursor_tokens(cursor);
        let prefix = tokens.first().and_then(|t| UnaryOp::from_prefix_token(&t.spelling));
        prefix.or_else(|| tokens.last().and_then(|t| UnaryOp::from_postfix_token(&t.spelling)))
    }

    fn first_child(&self, cursor: clang_sys::CXCursor) -> Option<clang_sys::CXCursor> {
        let mut first: Option<clang_sys::CXCursor> = None;
        unsafe {
            clang_sys::clang_visitChildren(
                cursor,
                visit_first_child,
                &mut first as *mut Option<clang_sys::CXCursor> as clang_sys::CXClientData,
            );
        }
        first
    }

    fn cursor_tokens(&self, cursor: clang_sys::CXCursor) -> Vec<Token> {
        unsafe {
            let extent = clang_sys::clang_getCursorExtent(cursor);
            let mut raw: *mut clang_sys::CXToken = ptr::null_mut();
            let mut count: c_uint = 0;
            clang_sys::clang_tokenize(self.tu, extent, &mut raw, &mut count);

            if raw.is_null() {
                return Vec::new();
            }

            let tokens = std::slice::from_raw_parts(raw, count as usize)
                .iter()
                .map(|&token| Token {
                    spelling: cx_string_to_string(clang_sys::clang_getTokenSpelling(self.tu, token)),
                    offset: location_offset(clang_sys::clang_getTokenLocation(self.tu, token)),
                    is_punctuation: clang_sys::clang_getTokenKind(token)
                        == clang_sys::CXToken_Punctuation,
                })
                .collect();

            clang_sys::clang_disposeTokens(self.tu, raw, count);
            tokens
        }
    }
}

fn unexposed(kind: clang_sys::CXCursorKind) -> NodeKind {
    unsafe {
        let kind_spelling = clang_sys::clang_getCursorKindSpelling(kind);
        NodeKind::Unexposed(cx_string_to_string(kind_spelling))
    }
}

/// Get source location from cursor.
fn get_location(cursor: clang_sys::CXCursor) -> SourceLocation {
    unsafe {
        let loc = clang_sys::clang_getCursorLocation(cursor);
        let mut file: clang_sys::CXFile = ptr::null_mut();
        let mut line: c_uint = 0;
        let mut column: c_uint = 0;

        clang_sys::clang_getSpellingLocation(loc, &mut file, &mut line, &mut column, ptr::null_mut());

        let file_name = if !file.is_null() {
            Some(cx_string_to_string(clang_sys::clang_getFileName(file)))
        } else {
            None
        };

        SourceLocation {
            file: file_name,
            line,
            column,
        }
    }
}

fn location_offset(location: clang_sys::CXSourceLocation) -> u32 {
    let mut offset: c_uint = 0;
    unsafe {
        clang_sys::clang_getExpansionLocation(
            location,
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
            &mut offset,
        );
    }
    offset
}

/// Convert a CXString to a Rust String.
fn cx_string_to_string(cx_string: clang_sys::CXString) -> String {
    unsafe {
        let c_str = clang_sys::clang_getCString(cx_string);
        let result = if c_str.is_null() {
            String::new()
        } else {
            CStr::from_ptr(c_str).to_string_lossy().into_owned()
        };
        clang_sys::clang_disposeString(cx_string);
        result
    }
}

fn cursor_spelling(cursor: clang_sys::CXCursor) -> String {
    unsafe { cx_string_to_string(clang_sys::clang_getCursorSpelling(cursor)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Option<ClangParser> {
        match ClangParser::new() {
            Ok(parser) => Some(parser),
            Err(e) => {
                eprintln!("skipping: {}", e);
                None
            }
        }
    }

    fn find<'a>(node: &'a SyntaxNode, pred: &dyn Fn(&NodeKind) -> bool) -> Option<&'a SyntaxNode> {
        if pred(&node.kind) {
            return Some(node);
        }
        node.children.iter().find_map(|c| find(c, pred))
    }

    #[test]
    fn test_parse_simple_function() {
        let Some(parser) = parser() else { return };
        let tree = parser
            .parse_string("int add(int a, int b) { return a + b; }", "add.c")
            .unwrap();

        assert!(matches!(tree.translation_unit.kind, NodeKind::TranslationUnit));
        let func = find(&tree.translation_unit, &|k| matches!(k, NodeKind::FunctionDecl { .. })).unwrap();
        match &func.kind {
            NodeKind::FunctionDecl {
                name,
                params,
                is_definition,
                ..
            } => {
                assert_eq!(name.as_str(), "add");
                assert_eq!(params.len(), 2);
                assert_eq!(params[1].name.as_str(), "b");
                assert!(*is_definition);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_operator_recovery() {
        let Some(parser) = parser() else { return };
        let tree = parser
            .parse_string(
                "void f(int *p, int n) { n <<= 2; *p++ = -n; n = n >= 3; }",
                "ops.c",
            )
            .unwrap();
        let root = &tree.translation_unit;

        assert!(find(root, &|k| matches!(k, NodeKind::CompoundAssignOperator(BinaryOp::ShlAssign))).is_some());
        assert!(find(root, &|k| matches!(k, NodeKind::UnaryOperator(UnaryOp::PostInc))).is_some());
        assert!(find(root, &|k| matches!(k, NodeKind::UnaryOperator(UnaryOp::Deref))).is_some());
        assert!(find(root, &|k| matches!(k, NodeKind::UnaryOperator(UnaryOp::Minus))).is_some());
        assert!(find(root, &|k| matches!(k, NodeKind::BinaryOperator(BinaryOp::Ge))).is_some());
    }

    #[test]
    fn test_macro_operator_is_not_guessed() {
        let Some(parser) = parser() else { return };
        let tree = parser
            .parse_string(
                "#define LESS <\nint f(int a, int b) { return a - 1 LESS b; }",
                "macro_op.c",
            )
            .unwrap();
        let ret = find(&tree.translation_unit, &|k| matches!(k, NodeKind::ReturnStmt)).unwrap();

        assert!(matches!(ret.children[0].kind, NodeKind::Unexposed(_)));
        assert!(find(ret, &|k| matches!(k, NodeKind::BinaryOperator(BinaryOp::Sub))).is_some());
        assert!(find(ret, &|k| matches!(k, NodeKind::BinaryOperator(BinaryOp::Lt))).is_none());
    }

    #[test]
    fn test_var_decl_initializer() {
        let Some(parser) = parser() else { return };
        let tree = parser
            .parse_string("void f(void) { int a[4]; int b = 1; }", "vars.c")
            .unwrap();

        let mut inits = Vec::new();
        fn collect(node: &SyntaxNode, out: &mut Vec<(String, bool)>) {
            if let NodeKind::VarDecl { has_init } = node.kind {
                out.push((node.spelling.to_string(), has_init));
            }
            for child in &node.children {
                collect(child, out);
            }
        }
        collect(&tree.translation_unit, &mut inits);

        assert_eq!(inits, [("a".to_string(), false), ("b".to_string(), true)]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let Some(parser) = parser() else { return };
        let result = parser.parse_string("int f( { return; }", "broken.c");
        assert!(result.is_err());
    }
}
