//! The parsed C abstract syntax tree, mutated in place by semantic
//! analysis and consumed (then dropped) by TAC lowering.
//!
//! Declarators — the parser's notion of "int *x[3]" before it is flattened
//! into a `Type` — are assumed already resolved into the `Type` fields
//! below; the lexer/parser named in the purpose statement owns that
//! resolution and is out of scope here. What this crate mutates is the
//! already-typed-by-shape, not-yet-typed-by-semantics tree.

use cc_data::Type;
use cc_ident::Ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Complement,
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    BitAnd,
    BitOr,
    BitXor,
    BitShiftLeft,
    BitShiftRight,
    /// Retagged from `BitShiftRight` by the analyzer when the left operand
    /// is signed (spec §9 "known source-behavior ambiguity"): the TAC
    /// optimizer folds both identically; only codegen (out of scope) is
    /// expected to distinguish them.
    BitShrArithmetic,
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl BinaryOp {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterOrEqual
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::BitShiftLeft | BinaryOp::BitShiftRight | BinaryOp::BitShrArithmetic)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
    }
}

/// Marks whether an `Assignment` node is a postfix increment/decrement
/// (`x++`) rather than a plain or compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignUnop {
    None,
    Postfix,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub unop: AssignUnop,
    /// `Some` only for a plain `lhs = rhs`. Compound assignment and
    /// postfix fold the lvalue into `exp_right` as `Binary{op, lhs, rhs}`
    /// and leave this `None`; lowering re-derives the lvalue by peeling
    /// that inner binary's left operand.
    pub exp_left: Option<Box<CExp>>,
    pub exp_right: Box<CExp>,
}

#[derive(Debug, Clone)]
pub enum CExpKind {
    Constant(cc_data::CConst),
    /// A string literal; `Ident` is the interned literal body.
    StringLiteral(Ident),
    Var(Ident),
    Cast { target: Type, exp: Box<CExp> },
    Unary { op: UnaryOp, exp: Box<CExp> },
    Binary { op: BinaryOp, lhs: Box<CExp>, rhs: Box<CExp> },
    Assignment(Assignment),
    Conditional { cond: Box<CExp>, then_exp: Box<CExp>, else_exp: Box<CExp> },
    FunctionCall { name: Ident, args: Vec<CExp> },
    Dereference(Box<CExp>),
    AddrOf(Box<CExp>),
    Subscript { ptr: Box<CExp>, index: Box<CExp> },
    SizeOfExpr(Box<CExp>),
    SizeOfType(Type),
    Dot { base: Box<CExp>, member: Ident },
    Arrow { base: Box<CExp>, member: Ident },
}

/// Every expression carries an `exp_type` slot, empty until type checking
/// fills it in, and a source line for diagnostics.
#[derive(Debug, Clone)]
pub struct CExp {
    pub kind: CExpKind,
    pub exp_type: Option<Type>,
    pub line: u32,
}

impl CExp {
    pub fn new(kind: CExpKind, line: u32) -> Self {
        CExp { kind, exp_type: None, line }
    }

    pub fn ty(&self) -> &Type {
        self.exp_type.as_ref().expect("exp_type not yet inferred by semantic analysis")
    }

    pub fn is_null_pointer_constant(&self) -> bool {
        matches!(&self.kind, CExpKind::Constant(c) if c.is_const_null_ptr())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Static,
    Extern,
}

#[derive(Debug, Clone)]
pub enum Initializer {
    Single(CExp),
    Compound(Vec<Initializer>),
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Ident,
    pub var_type: Type,
    pub init: Option<Initializer>,
    pub storage_class: Option<StorageClass>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct FunDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub fun_type: Type,
    pub body: Option<Vec<CBlockItem>>,
    pub storage_class: Option<StorageClass>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: Ident,
    pub member_type: Type,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub tag: Ident,
    pub is_union: bool,
    /// `None` for a forward declaration (`struct S;`); `Some` for a
    /// definition, even an empty one is rejected elsewhere (C forbids
    /// empty structs, but that check belongs to the parser).
    pub members: Option<Vec<MemberDecl>>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Fun(FunDecl),
    Var(VarDecl),
    Struct(StructDecl),
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Decl(VarDecl),
    Exp(Option<CExp>),
}

#[derive(Debug, Clone)]
pub enum CStatement {
    Return(Option<CExp>),
    Expression(CExp),
    If { cond: CExp, then_branch: Box<CStatement>, else_branch: Option<Box<CStatement>> },
    Compound(Vec<CBlockItem>),
    While { cond: CExp, body: Box<CStatement>, target: Option<Ident> },
    DoWhile { body: Box<CStatement>, cond: CExp, target: Option<Ident> },
    For { init: ForInit, cond: Option<CExp>, post: Option<CExp>, body: Box<CStatement>, target: Option<Ident> },
    Switch {
        scrutinee: CExp,
        body: Box<CStatement>,
        target: Option<Ident>,
        is_default: bool,
        cases: Vec<cc_data::CConst>,
    },
    Case { value: CExp, body: Box<CStatement>, target: Option<Ident> },
    Default { body: Box<CStatement>, target: Option<Ident> },
    Labeled { label: Ident, body: Box<CStatement> },
    Goto(Ident),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Null,
}

#[derive(Debug, Clone)]
pub enum CBlockItem {
    Statement(CStatement),
    Declaration(Declaration),
}

pub type Program = Vec<Declaration>;
