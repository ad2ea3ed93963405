//! Abstract Syntax Tree (AST) definitions
//!
//! The tree is immutable once the parser returns it. Every node carries the
//! byte span it was parsed from; malformed input shows up as `Error` nodes
//! rather than a missing subtree.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Root of one parsed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    /// Module docstring, if the first statement is a string literal
    pub fn docstring(&self) -> Option<String> {
        docstring_of(&self.body)
    }
}

/// Identifier with its source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    Return(ReturnStmt),
    Delete(DeleteStmt),
    Assign(AssignStmt),
    AugAssign(AugAssignStmt),
    AnnAssign(AnnAssignStmt),
    For(ForStmt),
    While(WhileStmt),
    If(IfStmt),
    With(WithStmt),
    Match(MatchStmt),
    Raise(RaiseStmt),
    Try(TryStmt),
    Assert(AssertStmt),
    Import(ImportStmt),
    ImportFrom(ImportFromStmt),
    Global(NameListStmt),
    Nonlocal(NameListStmt),
    Expr(ExprStmt),
    Pass(Span),
    Break(Span),
    Continue(Span),
    /// Statement that failed to parse; `body` holds any block parsed after it
    Error(ErrorStmt),
}

/// `def` / `async def`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Identifier,
    pub params: Vec<Param>,
    pub returns: Option<Expr>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
    pub is_async: bool,
    pub span: Span,
}

impl FunctionDef {
    pub fn docstring(&self) -> Option<String> {
        docstring_of(&self.body)
    }
}

/// How a parameter binds arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Declared before a `/` marker
    PositionalOnly,
    Normal,
    /// `*args`
    VarArgs,
    /// Declared after `*` or `*args`
    KeywordOnly,
    /// `**kwargs`
    KwArgs,
}

/// Function or lambda parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: Identifier,
    pub kind: ParamKind,
    pub annotation: Option<Expr>,
    pub default: Option<Expr>,
    pub span: Span,
}

/// `class`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: Identifier,
    pub bases: Vec<Expr>,
    pub keywords: Vec<Keyword>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
    pub span: Span,
}

impl ClassDef {
    pub fn docstring(&self) -> Option<String> {
        docstring_of(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStmt {
    pub targets: Vec<Expr>,
    pub span: Span,
}

/// `a = b = value`; chained targets are kept in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub targets: Vec<Expr>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugAssignStmt {
    pub target: Expr,
    pub op: BinaryOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnAssignStmt {
    pub target: Expr,
    pub annotation: Expr,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForStmt {
    pub target: Expr,
    pub iter: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
    pub is_async: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub orelse: Vec<Stmt>,
    pub span: Span,
}

/// `if`, its `elif` clauses in source order, and the final `else`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfStmt {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub elifs: Vec<ElifClause>,
    pub orelse: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElifClause {
    pub test: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithStmt {
    pub items: Vec<WithItem>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub span: Span,
}

/// `match` statement; patterns are parsed with the expression grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStmt {
    pub subject: Expr,
    pub cases: Vec<MatchCase>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCase {
    pub pattern: Expr,
    /// `case <pattern> as name`
    pub alias: Option<Identifier>,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiseStmt {
    pub exc: Option<Expr>,
    pub cause: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptHandler {
    pub ty: Option<Expr>,
    pub name: Option<Identifier>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryStmt {
    pub body: Vec<Stmt>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Stmt>,
    pub finalbody: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertStmt {
    pub test: Expr,
    pub msg: Option<Expr>,
    pub span: Span,
}

/// Dotted module path such as `os.path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DottedName {
    pub parts: Vec<Identifier>,
    pub span: Span,
}

impl DottedName {
    pub fn dotted(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// `import a.b as c` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAlias {
    pub module: DottedName,
    pub asname: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStmt {
    pub names: Vec<ImportAlias>,
    pub span: Span,
}

/// `from m import a as b` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFromAlias {
    pub name: Identifier,
    pub asname: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFromStmt {
    /// `None` for `from . import x`
    pub module: Option<DottedName>,
    /// Number of leading dots
    pub level: u32,
    pub names: Vec<ImportFromAlias>,
    pub is_star: bool,
    pub span: Span,
}

impl ImportFromStmt {
    /// Module path as written, including leading dots
    pub fn module_path(&self) -> String {
        let mut path = ".".repeat(self.level as usize);
        if let Some(module) = &self.module {
            path.push_str(&module.dotted());
        }
        path
    }
}

/// `global a, b` or `nonlocal a, b`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameListStmt {
    pub names: Vec<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStmt {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Name(Identifier),
    Literal(Literal, Span),
    BoolOp(BoolOpExpr),
    Named(NamedExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Lambda(LambdaExpr),
    IfExp(IfExpr),
    Dict(DictExpr),
    Set(SequenceExpr),
    List(SequenceExpr),
    Tuple(SequenceExpr),
    Comprehension(ComprehensionExpr),
    Await(AwaitExpr),
    Yield(YieldExpr),
    Compare(CompareExpr),
    Call(CallExpr),
    Attribute(AttributeExpr),
    Subscript(SubscriptExpr),
    Slice(SliceExpr),
    Starred(StarredExpr),
    /// Expression that failed to parse
    Error(Span),
}

/// Literal values keep their source text; the analyzer never evaluates them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Number(String),
    String(String),
    Bool(bool),
    None,
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolOpExpr {
    pub op: BoolOp,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `target := value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedExpr {
    pub target: Identifier,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: Box<Expr>,
    pub span: Span,
}

/// `body if test else orelse`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfExpr {
    pub test: Box<Expr>,
    pub body: Box<Expr>,
    pub orelse: Box<Expr>,
    pub span: Span,
}

/// Dict display; `key == None` marks a `**mapping` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictExpr {
    pub entries: Vec<(Option<Expr>, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComprehensionKind {
    List,
    Set,
    Dict,
    Generator,
}

/// One `for target in iter if cond` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensionClause {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComprehensionExpr {
    pub kind: ComprehensionKind,
    /// Element, or key for dict comprehensions
    pub element: Box<Expr>,
    /// Value for dict comprehensions
    pub value: Option<Box<Expr>>,
    pub clauses: Vec<ComprehensionClause>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitExpr {
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldExpr {
    pub value: Option<Box<Expr>>,
    pub is_from: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareExpr {
    pub left: Box<Expr>,
    pub ops: Vec<CompareOp>,
    pub comparators: Vec<Expr>,
    pub span: Span,
}

/// Keyword argument; `arg == None` marks `**kwargs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: Option<Identifier>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExpr {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub keywords: Vec<Keyword>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeExpr {
    pub value: Box<Expr>,
    pub attr: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptExpr {
    pub value: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceExpr {
    pub lower: Option<Box<Expr>>,
    pub upper: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarredExpr {
    pub value: Box<Expr>,
    /// `**` unpacking (only valid inside calls and dict displays)
    pub double: bool,
    pub span: Span,
}

// Helper methods for getting spans from AST nodes

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Name(id) => id.span,
            Expr::Literal(_, span) | Expr::Error(span) => *span,
            Expr::BoolOp(e) => e.span,
            Expr::Named(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::IfExp(e) => e.span,
            Expr::Dict(e) => e.span,
            Expr::Set(e) | Expr::List(e) | Expr::Tuple(e) => e.span,
            Expr::Comprehension(e) => e.span,
            Expr::Await(e) => e.span,
            Expr::Yield(e) => e.span,
            Expr::Compare(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Attribute(e) => e.span,
            Expr::Subscript(e) => e.span,
            Expr::Slice(e) => e.span,
            Expr::Starred(e) => e.span,
        }
    }

    /// Whether this expression may appear on the left of `=`
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript(_) => true,
            Expr::Tuple(seq) | Expr::List(seq) => seq.elements.iter().all(Expr::is_assignable),
            Expr::Starred(star) => !star.double && star.value.is_assignable(),
            _ => false,
        }
    }
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::FunctionDef(s) => s.span,
            Stmt::ClassDef(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Delete(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::AugAssign(s) => s.span,
            Stmt::AnnAssign(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::With(s) => s.span,
            Stmt::Match(s) => s.span,
            Stmt::Raise(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Assert(s) => s.span,
            Stmt::Import(s) => s.span,
            Stmt::ImportFrom(s) => s.span,
            Stmt::Global(s) | Stmt::Nonlocal(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Pass(span) | Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Error(s) => s.span,
        }
    }
}

/// Extract the docstring from the first statement of a body
fn docstring_of(body: &[Stmt]) -> Option<String> {
    match body.first()? {
        Stmt::Expr(ExprStmt {
            value: Expr::Literal(Literal::String(raw), _),
            ..
        }) => Some(string_literal_value(raw)),
        _ => None,
    }
}

/// Strip prefix and quotes from a string literal's source text.
///
/// Escapes are left as written; callers only display the result.
pub fn string_literal_value(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quotes in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body.strip_prefix(quotes) {
            let inner = inner.strip_suffix(quotes).unwrap_or(inner);
            return inner.to_string();
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_value_strips_prefix_and_quotes() {
        assert_eq!(string_literal_value("'abc'"), "abc");
        assert_eq!(string_literal_value("rb\"x\""), "x");
        assert_eq!(string_literal_value("\"\"\"Doc.\n  More\"\"\""), "Doc.\n  More");
        assert_eq!(string_literal_value("'unterminated"), "unterminated");
    }

    #[test]
    fn test_is_assignable() {
        let name = Expr::Name(Identifier {
            name: "x".to_string(),
            span: Span::new(0, 1),
        });
        assert!(name.is_assignable());

        let tuple = Expr::Tuple(SequenceExpr {
            elements: vec![
                name.clone(),
                Expr::Literal(Literal::Number("1".into()), Span::new(3, 4)),
            ],
            span: Span::new(0, 4),
        });
        assert!(!tuple.is_assignable());
    }

    #[test]
    fn test_function_docstring() {
        let func = FunctionDef {
            name: Identifier {
                name: "f".to_string(),
                span: Span::new(4, 5),
            },
            params: Vec::new(),
            returns: None,
            body: vec![Stmt::Expr(ExprStmt {
                value: Expr::Literal(Literal::String("'''Say hi.'''".into()), Span::new(10, 23)),
                span: Span::new(10, 23),
            })],
            decorators: Vec::new(),
            is_async: false,
            span: Span::new(0, 23),
        };
        assert_eq!(func.docstring().as_deref(), Some("Say hi."));
    }
}
