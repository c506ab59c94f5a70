use std::rc::Rc;

use crate::diagnostics::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Raw numeric lexeme; evaluation decides Int vs Float.
    Number(String),
    Bool(bool),
    String(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    ListLiteral(Vec<Expr>),
    DictLiteral(Vec<(Expr, Expr)>),
    Group(Box<Expr>),
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        target: Box<Expr>,
        field: String,
    },
    Super,
}

/// Which surface keyword introduced a conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalStyle {
    /// `if … else …`
    Traditional,
    /// `when … otherwise …`
    Cognitive,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<[Stmt]>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    pub getter: Option<FunctionDecl>,
    pub setter: Option<FunctionDecl>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Method(FunctionDecl),
    StaticMethod(FunctionDecl),
    ClassMethod(FunctionDecl),
    Property(PropertyDecl),
    Field {
        name: String,
        value: Expr,
        span: SourceSpan,
    },
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<(String, SourceSpan)>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Let {
        name: String,
        value: Expr,
    },
    Function(FunctionDecl),
    Class(ClassDecl),
    Import {
        module: String,
        alias: Option<String>,
    },
    Expr(Expr),
    Block(Vec<Stmt>),
    Conditional {
        style: ConditionalStyle,
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    ForRange {
        binding: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Repeat {
        count: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Stmt>,
}
