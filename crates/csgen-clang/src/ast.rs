//! Owned syntax tree produced by the libclang front end.
//!
//! The translator only ever reads this tree; every FFI handle is released
//! once the front end has converted a translation unit.

use crate::types::CType;
use smol_str::SmolStr;
use std::fmt;

/// A parsed translation unit.
#[derive(Debug)]
pub struct SyntaxTree {
    /// Root translation unit
    pub translation_unit: SyntaxNode,
}

/// A node in the syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    /// Kind of this node
    pub kind: NodeKind,
    /// Type of the expression or declaration (void for statements)
    pub ty: CType,
    /// Identifier text (declared name, referenced name, member name)
    pub spelling: SmolStr,
    /// Raw source tokens, captured for literals and `sizeof`-style expressions
    pub tokens: Vec<String>,
    /// Child nodes
    pub children: Vec<SyntaxNode>,
    /// Source location info (for error messages)
    pub location: SourceLocation,
    /// Whether the node comes from a system header
    pub in_system_header: bool,
}

/// Source location for error reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "<unknown>:{}:{}", self.line, self.column),
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: SmolStr,
    pub ty: CType,
}

/// Kinds of syntax nodes the translator distinguishes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Translation unit (root)
    TranslationUnit,

    // Declarations
    /// Function declaration/definition
    FunctionDecl {
        name: SmolStr,
        return_type: CType,
        params: Vec<Param>,
        is_definition: bool,
    },
    /// Parameter declaration
    ParmDecl,
    /// Variable declaration
    VarDecl { has_init: bool },

    // Statements
    /// Compound statement (block)
    CompoundStmt,
    /// Declaration statement
    DeclStmt,
    ReturnStmt,
    IfStmt,
    ForStmt,
    WhileStmt,
    DoStmt,
    SwitchStmt,
    CaseStmt,
    DefaultStmt,
    BreakStmt,
    ContinueStmt,
    GotoStmt,
    /// Label statement; the label name is the node spelling
    LabelStmt,
    /// Reference to a label from a `goto`
    LabelRef,
    /// Empty statement (`;`)
    NullStmt,

    // Expressions
    IntegerLiteral,
    FloatingLiteral,
    CharacterLiteral,
    StringLiteral,
    /// Reference to a declared entity
    DeclRefExpr,
    /// `sizeof`/`_Alignof` and similar
    UnaryExpr,
    BinaryOperator(BinaryOp),
    CompoundAssignOperator(BinaryOp),
    UnaryOperator(UnaryOp),
    CallExpr,
    /// Conditional operator (a ? b : c)
    ConditionalOperator,
    /// Member access (a.b or a->b); the member name is the node spelling
    MemberRefExpr,
    ArraySubscriptExpr,
    InitListExpr,
    ParenExpr,
    CStyleCastExpr,

    /// Any other cursor kind, keeping the clang spelling of the kind
    Unexposed(String),
}

impl NodeKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::TranslationUnit => "TranslationUnit",
            NodeKind::FunctionDecl { .. } => "FunctionDecl",
            NodeKind::ParmDecl => "ParmDecl",
            NodeKind::VarDecl { .. } => "VarDecl",
            NodeKind::CompoundStmt => "CompoundStmt",
            NodeKind::DeclStmt => "DeclStmt",
            NodeKind::ReturnStmt => "ReturnStmt",
            NodeKind::IfStmt => "IfStmt",
            NodeKind::ForStmt => "ForStmt",
            NodeKind::WhileStmt => "WhileStmt",
            NodeKind::DoStmt => "DoStmt",
            NodeKind::SwitchStmt => "SwitchStmt",
            NodeKind::CaseStmt => "CaseStmt",
            NodeKind::DefaultStmt => "DefaultStmt",
            NodeKind::BreakStmt => "BreakStmt",
            NodeKind::ContinueStmt => "ContinueStmt",
            NodeKind::GotoStmt => "GotoStmt",
            NodeKind::LabelStmt => "LabelStmt",
            NodeKind::LabelRef => "LabelRef",
            NodeKind::NullStmt => "NullStmt",
            NodeKind::IntegerLiteral => "IntegerLiteral",
            NodeKind::FloatingLiteral => "FloatingLiteral",
            NodeKind::CharacterLiteral => "CharacterLiteral",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::DeclRefExpr => "DeclRefExpr",
            NodeKind::UnaryExpr => "UnaryExpr",
            NodeKind::BinaryOperator(_) => "BinaryOperator",
            NodeKind::CompoundAssignOperator(_) => "CompoundAssignOperator",
            NodeKind::UnaryOperator(_) => "UnaryOperator",
            NodeKind::CallExpr => "CallExpr",
            NodeKind::ConditionalOperator => "ConditionalOperator",
            NodeKind::MemberRefExpr => "MemberRefExpr",
            NodeKind::ArraySubscriptExpr => "ArraySubscriptExpr",
            NodeKind::InitListExpr => "InitListExpr",
            NodeKind::ParenExpr => "ParenExpr",
            NodeKind::CStyleCastExpr => "CStyleCastExpr",
            NodeKind::Unexposed(kind) => kind,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Bitwise
    And,
    Or,
    Xor,
    Shl,
    Shr,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    LAnd,
    LOr,
    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    // Comma
    Comma,
}

impl BinaryOp {
    /// Operator for a source token.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "&" => BinaryOp::And,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::LAnd,
            "||" => BinaryOp::LOr,
            "=" => BinaryOp::Assign,
            "+=" => BinaryOp::AddAssign,
            "-=" => BinaryOp::SubAssign,
            "*=" => BinaryOp::MulAssign,
            "/=" => BinaryOp::DivAssign,
            "%=" => BinaryOp::RemAssign,
            "&=" => BinaryOp::AndAssign,
            "|=" => BinaryOp::OrAssign,
            "^=" => BinaryOp::XorAssign,
            "<<=" => BinaryOp::ShlAssign,
            ">>=" => BinaryOp::ShrAssign,
            "," => BinaryOp::Comma,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::Comma => ",",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LAnd | BinaryOp::LOr)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Prefix increment (++x)
    PreInc,
    /// Prefix decrement (--x)
    PreDec,
    /// Postfix increment (x++)
    PostInc,
    /// Postfix decrement (x--)
    PostDec,
    /// Address-of (&x)
    AddrOf,
    /// Dereference (*x)
    Deref,
    /// Unary plus (+x)
    Plus,
    /// Unary minus (-x)
    Minus,
    /// Bitwise not (~x)
    Not,
    /// Logical not (!x)
    LNot,
}

impl UnaryOp {
    /// Operator for a token found before the operand.
    pub fn from_prefix_token(token: &str) -> Option<Self> {
        let op = match token {
            "++" => UnaryOp::PreInc,
            "--" => UnaryOp::PreDec,
            "&" => UnaryOp::AddrOf,
            "*" => UnaryOp::Deref,
            "+" => UnaryOp::Plus,
            "-" => UnaryOp::Minus,
            "~" => UnaryOp::Not,
            "!" => UnaryOp::LNot,
            _ => return None,
        };
        Some(op)
    }

    /// Operator for a token found after the operand.
    pub fn from_postfix_token(token: &str) -> Option<Self> {
        match token {
            "++" => Some(UnaryOp::PostInc),
            "--" => Some(UnaryOp::PostDec),
            _ => None,
        }
    }

    /// Canonical source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
            UnaryOp::AddrOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "~",
            UnaryOp::LNot => "!",
        }
    }

    /// Whether the operator is written before its operand.
    pub fn is_prefix(self) -> bool {
        !matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

impl SyntaxNode {
    /// Create a new node with the given kind and a `void` type.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ty: CType::void(),
            spelling: SmolStr::default(),
            tokens: Vec::new(),
            children: Vec::new(),
            location: SourceLocation::default(),
            in_system_header: false,
        }
    }

    /// Set the node type.
    pub fn with_type(mut self, ty: CType) -> Self {
        self.ty = ty;
        self
    }

    /// Set the spelling.
    pub fn with_spelling(mut self, spelling: impl Into<SmolStr>) -> Self {
        self.spelling = spelling.into();
        self
    }

    /// Set the raw source tokens.
    pub fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.tokens = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Add a child node.
    pub fn with_child(mut self, child: SyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    /// Add multiple child nodes.
    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    /// Set the source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Child at `index`, if present.
    pub fn child(&self, index: usize) -> Option<&SyntaxNode> {
        self.children.get(index)
    }

    /// First direct child of the given kind.
    pub fn find_child(&self, predicate: impl Fn(&NodeKind) -> bool) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| predicate(&c.kind))
    }

    /// Write an indented outline of the subtree.
    pub fn dump(&self, out: &mut String, depth: usize) {
        use std::fmt::Write;

        for _ in 0..depth {
            out.push_str("  ");
        }
        let _ = write!(out, "{}", self.kind.name());
        match &self.kind {
            NodeKind::BinaryOperator(op) | NodeKind::CompoundAssignOperator(op) => {
                let _ = write!(out, " `{}`", op.as_str());
            }
            NodeKind::UnaryOperator(op) => {
                let _ = write!(out, " `{}`", op.as_str());
            }
            _ => {}
        }
        if !self.spelling.is_empty() {
            let _ = write!(out, " '{}'", self.spelling);
        }
        if !self.ty.spelling.is_empty() && !self.ty.is_void() {
            let _ = write!(out, " : {}", self.ty.spelling);
        }
        out.push('\n');
        for child in &self.children {
            child.dump(out, depth + 1);
        }
    }
}
