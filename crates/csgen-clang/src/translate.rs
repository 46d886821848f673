//! Expression and statement translation.
//!
//! [`Translator::translate`] turns one syntax node into C# source text. Rules
//! run post-order: every rule translates the children it needs first and
//! builds its own text from theirs.

use crate::ast::{BinaryOp, NodeKind, SyntaxNode, UnaryOp};
use crate::error::{Result, TranslateError};
use crate::types::{CType, CTypeKind, POINTER_WRAPPER};

/// Per-function state visible to the rules.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    /// Mapped C# return type
    pub return_type: String,
}

impl FunctionContext {
    pub fn new(return_type: &CType) -> Self {
        Self {
            return_type: return_type.to_cs_type_str(),
        }
    }

    /// Returned values get an explicit cast unless the function returns
    /// nothing or a pointer wrapper.
    fn casts_returns(&self) -> bool {
        self.return_type != "void" && !self.return_type.starts_with(POINTER_WRAPPER)
    }
}

/// Read-only facts about one node, computed once per visit.
#[derive(Debug, Clone)]
pub struct NodeInfo<'a> {
    pub node: &'a SyntaxNode,
    /// Mapped C# type of the node
    pub cs_type: String,
    pub is_pointer: bool,
    pub is_c_pointer: bool,
    pub is_record: bool,
    pub is_primitive_numeric: bool,
}

impl<'a> NodeInfo<'a> {
    pub fn new(node: &'a SyntaxNode) -> Self {
        let ty = &node.ty;
        Self {
            node,
            cs_type: ty.to_cs_type_str(),
            is_pointer: ty.is_pointer(),
            is_c_pointer: ty.is_c_pointer(),
            is_record: ty.is_record(),
            is_primitive_numeric: ty.is_primitive_numeric(),
        }
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node.kind
    }

    pub fn spelling(&self) -> &'a str {
        self.node.spelling.as_str()
    }
}

/// A node together with its translated text.
#[derive(Debug, Clone)]
pub struct Translation<'a> {
    pub info: NodeInfo<'a>,
    pub text: String,
}

/// Translates the nodes of one function body.
pub struct Translator<'ctx> {
    context: &'ctx FunctionContext,
}

impl<'ctx> Translator<'ctx> {
    pub fn new(context: &'ctx FunctionContext) -> Self {
        Self { context }
    }

    /// Translate a node and its subtree.
    pub fn translate<'a>(&self, node: &'a SyntaxNode) -> Result<Translation<'a>> {
        let info = NodeInfo::new(node);
        let text = self.translate_info(&info)?;
        Ok(Translation { info, text })
    }

    /// Translate a child that the rule requires.
    fn child<'a>(&self, node: &'a SyntaxNode, index: usize) -> Result<Translation<'a>> {
        match node.child(index) {
            Some(child) => self.translate(child),
            None => Err(TranslateError::MissingChild {
                index,
                parent: node.kind.name().to_string(),
                location: node.location.clone(),
            }),
        }
    }

    /// Translate a child that may be absent.
    fn optional_child<'a>(&self, node: &'a SyntaxNode, index: usize) -> Result<Option<Translation<'a>>> {
        node.child(index).map(|child| self.translate(child)).transpose()
    }

    fn last_child<'a>(&self, node: &'a SyntaxNode) -> Result<Translation<'a>> {
        let index = node.children.len().saturating_sub(1);
        self.child(node, index)
    }

    /// Make a C truth value explicit: numbers compare against zero, pointers
    /// against null. Binary operator results are left alone.
    pub fn normalize_truthiness<'a>(&self, mut operand: Translation<'a>) -> Result<Translation<'a>> {
        match operand.info.kind() {
            NodeKind::BinaryOperator(_) => return Ok(operand),
            NodeKind::UnaryOperator(UnaryOp::LNot) => {
                let inner = self.child(operand.info.node, 0)?;
                operand.text = format!("({} == 0)", inner.text);
                return Ok(operand);
            }
            _ => {}
        }

        if operand.info.is_primitive_numeric {
            operand.text = format!("({}) != 0", operand.text);
        } else if operand.info.is_pointer {
            operand.text = format!("({}) != null", operand.text);
        }

        Ok(operand)
    }

    fn translate_info(&self, info: &NodeInfo<'_>) -> Result<String> {
        let node = info.node;
        match info.kind() {
            NodeKind::IntegerLiteral | NodeKind::FloatingLiteral | NodeKind::CharacterLiteral => {
                Ok(literal_text(node))
            }
            NodeKind::StringLiteral => Ok(string_literal_text(node)),
            NodeKind::DeclRefExpr | NodeKind::LabelRef => Ok(info.spelling().to_string()),
            NodeKind::UnaryExpr => self.translate_unary_expr(node),
            NodeKind::BinaryOperator(op) | NodeKind::CompoundAssignOperator(op) => {
                self.translate_binary(info, *op)
            }
            NodeKind::UnaryOperator(op) => self.translate_unary(node, *op),
            NodeKind::CallExpr => self.translate_call(node),
            NodeKind::ReturnStmt => self.translate_return(node),
            NodeKind::IfStmt => self.translate_if(node),
            NodeKind::ForStmt => self.translate_for(node),
            NodeKind::WhileStmt => {
                let cond = self.normalize_truthiness(self.child(node, 0)?)?;
                let body = self.child(node, 1)?;
                Ok(format!("while ({}) {}", cond.text, body.text))
            }
            NodeKind::DoStmt => {
                let body = self.child(node, 0)?;
                let cond = self.normalize_truthiness(self.child(node, 1)?)?;
                Ok(format!(
                    "do {} while ({})",
                    ensure_statement_finished(&body.text),
                    cond.text
                ))
            }
            NodeKind::SwitchStmt => {
                let expr = self.child(node, 0)?;
                let body = self.child(node, 1)?;
                Ok(format!("switch ({}) {}", expr.text, body.text))
            }
            NodeKind::CaseStmt => {
                let label = self.child(node, 0)?;
                let body = self.child(node, 1)?;
                Ok(format!("case {}: {}", label.text, body.text))
            }
            NodeKind::DefaultStmt => {
                let body = self.child(node, 0)?;
                Ok(format!("default: {}", body.text))
            }
            NodeKind::LabelStmt => {
                let mut text = format!("{}:;\n", info.spelling());
                for child in &node.children {
                    text.push_str(&self.translate(child)?.text);
                }
                Ok(text)
            }
            NodeKind::GotoStmt => {
                let label = self.child(node, 0)?;
                Ok(format!("goto {}", label.text))
            }
            NodeKind::ConditionalOperator => self.translate_conditional(node),
            NodeKind::MemberRefExpr => {
                let base = self.child(node, 0)?;
                Ok(format!("{}.{}", base.text, info.spelling()))
            }
            NodeKind::ArraySubscriptExpr => {
                let base = self.child(node, 0)?;
                let index = self.child(node, 1)?;
                Ok(format!("{}[{}]", base.text, index.text))
            }
            NodeKind::InitListExpr => {
                let elements = self.translate_all(&node.children)?;
                if elements.is_empty() {
                    Ok("{ }".to_string())
                } else {
                    Ok(format!("{{ {} }}", elements.join(", ")))
                }
            }
            NodeKind::ParenExpr => {
                let inner = self.optional_child(node, 0)?;
                Ok(format!("({})", inner.map(|t| t.text).unwrap_or_default()))
            }
            NodeKind::BreakStmt => Ok("break".to_string()),
            NodeKind::ContinueStmt => Ok("continue".to_string()),
            NodeKind::NullStmt => Ok(";".to_string()),
            NodeKind::VarDecl { has_init } => self.translate_var_decl(info, *has_init),
            NodeKind::DeclStmt => {
                let mut text = String::new();
                for child in &node.children {
                    text.push_str(&ensure_statement_finished(&self.translate(child)?.text));
                }
                Ok(text)
            }
            NodeKind::CompoundStmt => {
                let mut text = String::from("{\n");
                for child in &node.children {
                    let stmt = self.translate(child)?;
                    if !stmt.text.is_empty() {
                        text.push_str(&ensure_statement_finished(&stmt.text));
                        text.push('\n');
                    }
                }
                text.push_str("}\n");
                Ok(text)
            }
            NodeKind::CStyleCastExpr => self.translate_cast(info),
            NodeKind::TranslationUnit
            | NodeKind::FunctionDecl { .. }
            | NodeKind::ParmDecl
            | NodeKind::Unexposed(_) => {
                // Structural passthrough: the last child carries the value
                if node.children.is_empty() {
                    return Ok(String::new());
                }
                Ok(self.last_child(node)?.text)
            }
        }
    }

    fn translate_all(&self, nodes: &[SyntaxNode]) -> Result<Vec<String>> {
        nodes.iter().map(|n| self.translate(n).map(|t| t.text)).collect()
    }

    fn translate_unary_expr(&self, node: &SyntaxNode) -> Result<String> {
        match self.optional_child(node, 0)? {
            Some(expr) if !expr.text.is_empty() => {
                if is_eight_byte_unsigned(&node.ty) {
                    Ok(format!("{}.Size", expr.text))
                } else {
                    Ok(expr.text)
                }
            }
            _ => Ok(node.tokens.join(" ")),
        }
    }

    fn translate_binary(&self, info: &NodeInfo<'_>, op: BinaryOp) -> Result<String> {
        let mut lhs = self.child(info.node, 0)?;
        let mut rhs = self.child(info.node, 1)?;

        if op.is_logical() {
            lhs = self.normalize_truthiness(lhs)?;
            rhs = self.normalize_truthiness(rhs)?;
        }

        if op == BinaryOp::Assign && !info.is_pointer {
            rhs.text = format!("({}) ({})", info.cs_type, rhs.text);
        }

        Ok(format!("{} {} {}", lhs.text, op.as_str(), rhs.text))
    }

    fn translate_unary(&self, node: &SyntaxNode, op: UnaryOp) -> Result<String> {
        let operand = self.child(node, 0)?;

        if op == UnaryOp::Deref {
            // *p++ reads and advances in one step
            if let NodeKind::UnaryOperator(_) = operand.info.kind() {
                let inner = self.child(operand.info.node, 0)?;
                return Ok(format!("{}.GetAndMove()", inner.text));
            }
        }

        let mut text = operand.text;
        if op == UnaryOp::Deref && operand.info.is_pointer && !operand.info.is_record {
            text.push_str(".CurrentValue");
        }

        let token = match op {
            UnaryOp::AddrOf | UnaryOp::Deref => "",
            _ => op.as_str(),
        };

        if op.is_prefix() {
            Ok(format!("{}{}", token, text))
        } else {
            Ok(format!("{}{}", text, token))
        }
    }

    fn translate_call(&self, node: &SyntaxNode) -> Result<String> {
        let callee = self.child(node, 0)?;
        let name: String = callee.text.chars().filter(|c| *c != '(' && *c != ')').collect();
        let args = self.translate_all(&node.children[1..])?;
        Ok(format!("{}({})", name, args.join(", ")))
    }

    fn translate_return(&self, node: &SyntaxNode) -> Result<String> {
        match self.optional_child(node, 0)? {
            Some(expr) if !expr.text.is_empty() => {
                if self.context.casts_returns() {
                    Ok(format!("return ({})({})", self.context.return_type, expr.text))
                } else {
                    Ok(format!("return {}", expr.text))
                }
            }
            _ => Ok("return".to_string()),
        }
    }

    fn translate_if(&self, node: &SyntaxNode) -> Result<String> {
        let cond = self.normalize_truthiness(self.child(node, 0)?)?;
        let then_branch = self.child(node, 1)?;
        let else_branch = self.optional_child(node, 2)?;

        let mut text = format!("if ({}) {}", cond.text, then_branch.text);
        if let Some(else_branch) = else_branch {
            text = ensure_statement_finished(&text);
            text.push_str(" else ");
            text.push_str(&else_branch.text);
        }
        Ok(text)
    }

    /// The front end drops absent clauses, so the child count decides which
    /// clauses are present.
    fn translate_for(&self, node: &SyntaxNode) -> Result<String> {
        let (init, cond, step, body) = match node.children.len() {
            0 | 1 => (None, None, None, self.child(node, 0)?),
            2 => (Some(self.child(node, 0)?), None, None, self.child(node, 1)?),
            3 => (
                Some(self.child(node, 0)?),
                None,
                Some(self.child(node, 1)?),
                self.child(node, 2)?,
            ),
            _ => (
                Some(self.child(node, 0)?),
                Some(self.child(node, 1)?),
                Some(self.child(node, 2)?),
                self.child(node, 3)?,
            ),
        };

        let init = init.map(|t| t.text).unwrap_or_default();
        let cond = cond.map(|t| t.text).unwrap_or_default();
        let step = step.map(|t| t.text).unwrap_or_default();

        Ok(format!(
            "for ({}; {}; {}) {}",
            init.trim_end().trim_end_matches(';'),
            cond,
            step,
            body.text
        ))
    }

    fn translate_conditional(&self, node: &SyntaxNode) -> Result<String> {
        let mut cond = self.child(node, 0)?;
        let then_expr = self.child(node, 1)?;
        let else_expr = self.child(node, 2)?;

        if cond.info.is_primitive_numeric {
            cond.text.push_str(" > 0");
        }

        Ok(format!("{} ? {} : {}", cond.text, then_expr.text, else_expr.text))
    }

    fn translate_var_decl(&self, info: &NodeInfo<'_>, has_init: bool) -> Result<String> {
        let rvalue = if has_init {
            Some(self.last_child(info.node)?)
        } else {
            None
        };

        let mut text = format!("{} {}", info.cs_type, info.spelling());
        match rvalue {
            Some(rvalue) if !rvalue.text.is_empty() => {
                if info.is_pointer {
                    text.push_str(&format!(" = {}", rvalue.text));
                } else {
                    text.push_str(&format!(" = ({})({})", info.cs_type, rvalue.text));
                }
            }
            _ if info.is_record => {
                text.push_str(&format!(" = new {}()", info.cs_type));
            }
            _ => {}
        }
        Ok(text)
    }

    fn translate_cast(&self, info: &NodeInfo<'_>) -> Result<String> {
        let child = self.last_child(info.node)?;

        if !info.is_c_pointer || !child.info.is_primitive_numeric {
            return Ok(child.text);
        }

        if info.is_record {
            Ok(format!("new {}({})", info.cs_type, child.text))
        } else {
            // No C# counterpart for a number-to-pointer cast
            Ok(format!("null /*{}*/", child.text))
        }
    }
}

/// Append a statement terminator unless the text already ends with one.
pub fn ensure_statement_finished(statement: &str) -> String {
    let trimmed = statement.trim();
    if trimmed.ends_with(';') || trimmed.ends_with('}') {
        statement.to_string()
    } else {
        format!("{};", statement)
    }
}

fn literal_text(node: &SyntaxNode) -> String {
    match node.tokens.first() {
        Some(token) => token.clone(),
        None => node.spelling.to_string(),
    }
}

fn string_literal_text(node: &SyntaxNode) -> String {
    if node.tokens.is_empty() {
        return strip_wide_prefix(&node.spelling).to_string();
    }
    node.tokens
        .iter()
        .map(|t| strip_wide_prefix(t))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn strip_wide_prefix(literal: &str) -> &str {
    literal.strip_prefix('L').unwrap_or(literal)
}

fn is_eight_byte_unsigned(ty: &CType) -> bool {
    let canonical = ty.desugar();
    match canonical.kind {
        CTypeKind::ULongLong => true,
        CTypeKind::ULong => ty.size.or(canonical.size) == Some(8),
        _ => false,
    }
}
