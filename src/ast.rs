//! AST model (spec §3): a single tagged sum type covering every construct, each node
//! carrying the source position of its first token. Exhaustive matching over [`Node`] is a
//! design requirement (spec §9), not an optimization — every stage after the parser
//! pattern-matches the whole enum rather than dispatching by a class tag.

use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Float,
    Char,
    String,
    Void,
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Char => "char",
            TypeTag::String => "string",
            TypeTag::Void => "void",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeTag,
    pub name: String,
    pub is_array: bool,
    pub pos: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Plus,
    Neg,
}

/// An assignment target (spec §3: `LValue is VarRef{name} or Index{name, idx}`).
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    VarRef { name: String, pos: Position },
    Index { name: String, idx: Box<Node>, pos: Position },
}

impl LValue {
    pub fn name(&self) -> &str {
        match self {
            LValue::VarRef { name, .. } => name,
            LValue::Index { name, .. } => name,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            LValue::VarRef { pos, .. } => *pos,
            LValue::Index { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program {
        funcs: Vec<Node>,
        main: Box<Node>,
    },
    FunctionDecl {
        ret_type: TypeTag,
        name: String,
        params: Vec<Param>,
        body: Box<Node>,
        pos: Position,
    },
    Block {
        statements: Vec<Node>,
        pos: Position,
    },
    VarDecl {
        ty: TypeTag,
        name: String,
        init: Option<Box<Node>>,
        pos: Position,
    },
    ArrayDecl {
        ty: TypeTag,
        name: String,
        size: i64,
        pos: Position,
    },
    Assign {
        target: LValue,
        value: Box<Node>,
        pos: Position,
    },
    If {
        cond: Box<Node>,
        then_block: Box<Node>,
        else_block: Option<Box<Node>>,
        pos: Position,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
        pos: Position,
    },
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        post: Vec<Node>,
        body: Box<Node>,
        pos: Position,
    },
    Return {
        value: Option<Box<Node>>,
        pos: Position,
    },
    Call {
        name: String,
        args: Vec<Node>,
        pos: Position,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Node>,
        right: Box<Node>,
        pos: Position,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Node>,
        pos: Position,
    },
    VarRef {
        name: String,
        pos: Position,
    },
    Index {
        name: String,
        idx: Box<Node>,
        pos: Position,
    },
    IntLit {
        value: i64,
        pos: Position,
    },
    FloatLit {
        value: f64,
        pos: Position,
    },
    CharLit {
        value: u8,
        pos: Position,
    },
    StringLit {
        value: String,
        pos: Position,
    },
}

impl Node {
    /// A short tag for diagnostics (the interpreter's `debug` trace channel emits one of
    /// these per visited node, spec §4.6).
    pub fn kind_name(&self) -> &'static str {
        use Node::*;
        match self {
            Program { .. } => "Program",
            FunctionDecl { .. } => "FunctionDecl",
            Block { .. } => "Block",
            VarDecl { .. } => "VarDecl",
            ArrayDecl { .. } => "ArrayDecl",
            Assign { .. } => "Assign",
            If { .. } => "If",
            While { .. } => "While",
            For { .. } => "For",
            Return { .. } => "Return",
            Call { .. } => "Call",
            BinOp { .. } => "BinOp",
            UnaryOp { .. } => "UnaryOp",
            VarRef { .. } => "VarRef",
            Index { .. } => "Index",
            IntLit { .. } => "IntLit",
            FloatLit { .. } => "FloatLit",
            CharLit { .. } => "CharLit",
            StringLit { .. } => "StringLit",
        }
    }

    pub fn position(&self) -> Position {
        use Node::*;
        match self {
            Program { main, .. } => main.position(),
            FunctionDecl { pos, .. }
            | Block { pos, .. }
            | VarDecl { pos, .. }
            | ArrayDecl { pos, .. }
            | Assign { pos, .. }
            | If { pos, .. }
            | While { pos, .. }
            | For { pos, .. }
            | Return { pos, .. }
            | Call { pos, .. }
            | BinOp { pos, .. }
            | UnaryOp { pos, .. }
            | VarRef { pos, .. }
            | Index { pos, .. }
            | IntLit { pos, .. }
            | FloatLit { pos, .. }
            | CharLit { pos, .. }
            | StringLit { pos, .. } => *pos,
        }
    }
}
