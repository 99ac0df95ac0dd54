//! Abstract Syntax Tree definitions for C99

use crate::frontend::token::{FloatLiteral, IntLiteral};
pub use crate::types::{Qualifiers, RecordKind};
use crate::utils::Span;

/// A complete translation unit
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub decls: Vec<Declaration>,
}

/// Declarations, at file scope or inside a block.
/// `int a, *b;` becomes two `Variable` entries sharing a cloned specifier type.
#[derive(Debug, Clone)]
pub enum Declaration {
    Variable(VarDecl),
    Function(FunctionDecl),
    /// Bare `struct S { ... };` / `union U;`
    Record(RecordSpec),
    /// Bare `enum E { ... };`
    Enum(EnumSpec),
    Typedef(TypedefDecl),
}

impl Declaration {
    pub fn span(&self) -> Span {
        match self {
            Declaration::Variable(v) => v.span,
            Declaration::Function(f) => f.span,
            Declaration::Record(r) => r.span,
            Declaration::Enum(e) => e.span,
            Declaration::Typedef(t) => t.span,
        }
    }

    /// Declared name, if the declaration introduces one
    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::Variable(v) => Some(&v.name.name),
            Declaration::Function(f) => Some(&f.name.name),
            Declaration::Record(r) => r.tag.as_ref().map(|t| t.name.as_str()),
            Declaration::Enum(e) => e.tag.as_ref().map(|t| t.name.as_str()),
            Declaration::Typedef(t) => Some(&t.name.name),
        }
    }
}

/// Storage class specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Auto,
    Register,
    Static,
    Extern,
    Typedef,
}

/// Variable declaration
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub storage: Option<StorageClass>,
    pub init: Option<Initializer>,
    pub span: Span,
}

/// Function prototype or definition. `ty` is always a function type.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub storage: Option<StorageClass>,
    pub is_inline: bool,
    /// `None` for a prototype
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    /// Parameters of the function declarator
    pub fn params(&self) -> &[Param] {
        match &self.ty.kind {
            TypeExprKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    /// Omitted in prototypes such as `int f(int);`
    pub name: Option<Ident>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `typedef <type> name;`
#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// struct/union specifier: a reference (`struct S`) when `members` is None,
/// otherwise a definition
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub kind: RecordKind,
    pub tag: Option<Ident>,
    pub members: Option<Vec<Member>>,
    pub span: Span,
}

/// Struct/union member
#[derive(Debug, Clone)]
pub struct Member {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// enum specifier
#[derive(Debug, Clone)]
pub struct EnumSpec {
    pub tag: Option<Ident>,
    pub enumerators: Option<Vec<Enumerator>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: Ident,
    pub value: Option<Expr>,
    pub span: Span,
}

/// Basic arithmetic and void types after specifier validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
}

/// Syntactic type, as written in the source
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub quals: Qualifiers,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Base(BaseType),
    Record(RecordSpec),
    Enum(EnumSpec),
    /// Name from the typedef-name set
    Typedef(String),
    Pointer(Box<TypeExpr>),
    Array {
        elem: Box<TypeExpr>,
        size: Option<Box<Expr>>,
        /// Size is not syntactically constant
        vla: bool,
    },
    Function {
        ret: Box<TypeExpr>,
        params: Vec<Param>,
        variadic: bool,
        /// False for an empty `()` list
        prototyped: bool,
    },
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, quals: Qualifiers::default(), span }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, TypeExprKind::Function { .. })
    }
}

/// Initializer of a variable
#[derive(Debug, Clone)]
pub enum Initializer {
    Expr(Expr),
    /// Brace-enclosed list, possibly nested
    List { items: Vec<Initializer>, span: Span },
}

impl Initializer {
    pub fn span(&self) -> Span {
        match self {
            Initializer::Expr(e) => e.span(),
            Initializer::List { span, .. } => *span,
        }
    }
}

/// Compound statement
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// `for` initializer clause
#[derive(Debug, Clone)]
pub enum ForInit {
    Decl(Vec<Declaration>),
    Expr(Expr),
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    Compound(Block),
    /// Local declaration(s)
    Decl { decls: Vec<Declaration>, span: Span },
    /// Expression statement
    Expr { expr: Expr, span: Span },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        span: Span,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    Switch {
        expr: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// case value: stmt
    Case {
        value: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    /// default: stmt
    Default { body: Box<Stmt>, span: Span },
    Break { span: Span },
    Continue { span: Span },
    Return { value: Option<Expr>, span: Span },
    Goto { label: Ident, span: Span },
    /// label: stmt
    Labeled {
        label: Ident,
        body: Box<Stmt>,
        span: Span,
    },
    /// Empty statement (;)
    Empty { span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Compound(block) => block.span,
            Stmt::Decl { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Case { span, .. }
            | Stmt::Default { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Return { span, .. }
            | Stmt::Goto { span, .. }
            | Stmt::Labeled { span, .. }
            | Stmt::Empty { span } => *span,
        }
    }
}

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// Simple or compound assignment
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    /// cond ? a : b
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// base[index]
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// base.member or base->member
    Member {
        base: Box<Expr>,
        member: Ident,
        arrow: bool,
        span: Span,
    },
    /// (type) expr
    Cast {
        ty: TypeExpr,
        expr: Box<Expr>,
        span: Span,
    },
    SizeofType { ty: TypeExpr, span: Span },
    SizeofExpr { expr: Box<Expr>, span: Span },
    /// a, b
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Ident(ident) => ident.span,
            Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::Cast { span, .. }
            | Expr::SizeofType { span, .. }
            | Expr::SizeofExpr { span, .. }
            | Expr::Comma { span, .. } => *span,
        }
    }

    /// Whether the expression is built only from literals and operators,
    /// so it can be folded without name resolution
    pub fn is_syntactic_constant(&self) -> bool {
        match self {
            Expr::Literal(Literal::String(..)) => false,
            Expr::Literal(_) => true,
            Expr::SizeofType { .. } | Expr::SizeofExpr { .. } => true,
            Expr::Unary { op, operand, .. } => op.is_arithmetic() && operand.is_syntactic_constant(),
            Expr::Binary { left, right, .. } => left.is_syntactic_constant() && right.is_syntactic_constant(),
            Expr::Conditional { cond, then_expr, else_expr, .. } => {
                cond.is_syntactic_constant() && then_expr.is_syntactic_constant() && else_expr.is_syntactic_constant()
            }
            Expr::Cast { expr, .. } => expr.is_syntactic_constant(),
            _ => false,
        }
    }

    /// Lvalue designators: identifier, dereference, subscript, member access
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Expr::Ident(_)
                | Expr::Unary { op: UnaryOp::Deref, .. }
                | Expr::Index { .. }
                | Expr::Member { .. }
        )
    }
}

/// Literal value
#[derive(Debug, Clone)]
pub enum Literal {
    Int(IntLiteral, Span),
    Float(FloatLiteral, Span),
    Char(i64, Span),
    /// Adjacent literals are already concatenated
    String(String, Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Int(_, s) => *s,
            Literal::Float(_, s) => *s,
            Literal::Char(_, s) => *s,
            Literal::String(_, s) => *s,
        }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// -x
    Neg,
    /// +x
    Plus,
    /// !x
    Not,
    /// ~x
    BitNot,
    /// *x
    Deref,
    /// &x
    AddrOf,
    /// ++x
    PreInc,
    /// --x
    PreDec,
    /// x++
    PostInc,
    /// x--
    PostDec,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    /// Operators that compute a value without touching storage
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Not | UnaryOp::BitNot)
    }

    pub fn is_increment(&self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

/// Assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOp {
    /// The operator a compound assignment applies before storing
    pub fn binary_op(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
            AssignOp::Mod => Some(BinOp::Mod),
            AssignOp::Shl => Some(BinOp::Shl),
            AssignOp::Shr => Some(BinOp::Shr),
            AssignOp::BitAnd => Some(BinOp::BitAnd),
            AssignOp::BitOr => Some(BinOp::BitOr),
            AssignOp::BitXor => Some(BinOp::BitXor),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
        }
    }
}
