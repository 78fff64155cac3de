//! One-pass semantic analysis over the AST (spec §4.3/§4.4): symbol resolution and the
//! single static type check (assignment narrowing).
//!
//! The analyzer never mutates the AST; it only walks it, building scopes as it goes and
//! failing fast on the first contract violation. Nothing it computes survives into
//! execution — the interpreter re-resolves everything at runtime against activation
//! records, never against these symbol tables (spec §9, "Symbol tables vs. activation
//! records").

use std::collections::HashMap;

use crate::ast::{BinOpKind, LValue, Node, TypeTag};
use crate::error::ClikeError;
use crate::position::Position;
use crate::trace::Trace;

const PRINT_BUILTIN: &str = "print";

#[derive(Debug, Clone)]
enum Symbol {
    Var { ty: TypeTag, is_array: bool },
    Func { ret_type: TypeTag, param_is_array: Vec<bool> },
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn insert(&mut self, name: String, symbol: Symbol, pos: Position) -> Result<(), ClikeError> {
        if self.symbols.contains_key(&name) {
            return Err(ClikeError::DuplicateId { name, pos });
        }
        self.symbols.insert(name, symbol);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).cloned()
    }
}

pub struct Analyzer<'t, T: Trace> {
    global: Scope,
    current: Scope,
    trace: &'t mut T,
}

impl<'t, T: Trace> Analyzer<'t, T> {
    pub fn new(trace: &'t mut T) -> Self {
        Self { global: Scope::default(), current: Scope::default(), trace }
    }

    pub fn analyze(&mut self, program: &Node) -> Result<(), ClikeError> {
        let Node::Program { funcs, main } = program else {
            panic!("analyze expects a Program node");
        };
        let all_funcs = funcs.iter().chain(std::iter::once(main.as_ref()));

        for f in all_funcs.clone() {
            let Node::FunctionDecl { ret_type, name, params, pos, .. } = f else {
                unreachable!("Program.funcs/main only ever contain FunctionDecl nodes");
            };
            self.global.insert(
                name.clone(),
                Symbol::Func {
                    ret_type: *ret_type,
                    param_is_array: params.iter().map(|p| p.is_array).collect(),
                },
                *pos,
            )?;
        }

        for f in all_funcs {
            self.analyze_function(f)?;
        }
        Ok(())
    }

    fn analyze_function(&mut self, node: &Node) -> Result<(), ClikeError> {
        let Node::FunctionDecl { name, params, body, .. } = node else {
            unreachable!("analyze_function is only called with FunctionDecl nodes");
        };

        self.current = Scope::default();
        for param in params {
            self.current.insert(
                param.name.clone(),
                Symbol::Var { ty: param.ty, is_array: param.is_array },
                param.pos,
            )?;
        }

        self.analyze_block(body)?;

        let mut names: Vec<&str> = self.current.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        self.trace.scope(&format!("{name}: {}", names.join(", ")));

        Ok(())
    }

    fn analyze_block(&mut self, node: &Node) -> Result<(), ClikeError> {
        let Node::Block { statements, .. } = node else {
            unreachable!("analyze_block is only called with Block nodes");
        };
        for stmt in statements {
            self.analyze_statement(stmt)?;
        }
        Ok(())
    }

    fn analyze_statement(&mut self, node: &Node) -> Result<(), ClikeError> {
        match node {
            Node::VarDecl { ty, name, init, pos } => {
                self.current.insert(name.clone(), Symbol::Var { ty: *ty, is_array: false }, *pos)?;
                if let Some(init) = init {
                    let value_ty = self.analyze_expr(init)?;
                    check_narrowing(*ty, value_ty, name, *pos)?;
                }
                Ok(())
            }
            Node::ArrayDecl { ty, name, pos, .. } => {
                self.current.insert(name.clone(), Symbol::Var { ty: *ty, is_array: true }, *pos)
            }
            Node::Assign { target, value, pos: _ } => self.analyze_assign(target, value),
            Node::If { cond, then_block, else_block, .. } => {
                self.analyze_expr(cond)?;
                self.analyze_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block)?;
                }
                Ok(())
            }
            Node::While { cond, body, .. } => {
                self.analyze_expr(cond)?;
                self.analyze_block(body)
            }
            Node::For { init, cond, post, body, .. } => {
                if let Some(init) = init {
                    self.analyze_statement(init)?;
                }
                if let Some(cond) = cond {
                    self.analyze_expr(cond)?;
                }
                for assign in post {
                    self.analyze_statement(assign)?;
                }
                self.analyze_block(body)
            }
            Node::Return { value, .. } => {
                if let Some(value) = value {
                    self.analyze_expr(value)?;
                }
                Ok(())
            }
            Node::Call { .. } => {
                self.analyze_expr(node)?;
                Ok(())
            }
            other => unreachable!("{other:?} cannot appear as a statement"),
        }
    }

    fn analyze_assign(&mut self, target: &LValue, value: &Node) -> Result<(), ClikeError> {
        let target_ty = match target {
            LValue::VarRef { name, pos } => match self.lookup(name) {
                Some(Symbol::Var { ty, is_array: false }) => ty,
                Some(Symbol::Var { is_array: true, .. }) => {
                    return Err(ClikeError::TypeError {
                        message: format!("'{name}' is an array and cannot be assigned without an index"),
                        pos: *pos,
                    });
                }
                _ => return Err(ClikeError::IdNotFound { name: name.clone(), pos: *pos }),
            },
            LValue::Index { name, idx, pos } => {
                self.analyze_expr(idx)?;
                match self.lookup(name) {
                    Some(Symbol::Var { ty, is_array: true }) => ty,
                    Some(Symbol::Var { is_array: false, .. }) => {
                        return Err(ClikeError::NotAnArray { name: name.clone(), pos: *pos });
                    }
                    _ => return Err(ClikeError::IdNotFound { name: name.clone(), pos: *pos }),
                }
            }
        };

        let value_ty = self.analyze_expr(value)?;
        check_narrowing(target_ty, value_ty, target.name(), target.position())
    }

    fn analyze_expr(&mut self, node: &Node) -> Result<TypeTag, ClikeError> {
        match node {
            Node::IntLit { .. } => Ok(TypeTag::Int),
            Node::FloatLit { .. } => Ok(TypeTag::Float),
            Node::CharLit { .. } => Ok(TypeTag::Char),
            Node::StringLit { .. } => Ok(TypeTag::String),
            Node::VarRef { name, pos } => match self.lookup(name) {
                Some(Symbol::Var { ty, .. }) => Ok(ty),
                _ => Err(ClikeError::IdNotFound { name: name.clone(), pos: *pos }),
            },
            Node::Index { name, idx, pos } => {
                self.analyze_expr(idx)?;
                match self.lookup(name) {
                    Some(Symbol::Var { ty, is_array: true }) => Ok(ty),
                    Some(Symbol::Var { is_array: false, .. }) => {
                        Err(ClikeError::NotAnArray { name: name.clone(), pos: *pos })
                    }
                    _ => Err(ClikeError::IdNotFound { name: name.clone(), pos: *pos }),
                }
            }
            Node::Call { name, args, pos } => {
                if name == PRINT_BUILTIN {
                    for arg in args {
                        self.analyze_expr(arg)?;
                    }
                    return Ok(TypeTag::Void);
                }

                let (ret_type, param_is_array) = match self.lookup(name) {
                    Some(Symbol::Func { ret_type, param_is_array }) => (ret_type, param_is_array),
                    _ => return Err(ClikeError::IdNotFound { name: name.clone(), pos: *pos }),
                };
                if args.len() != param_is_array.len() {
                    return Err(ClikeError::ArgCountMismatch {
                        name: name.clone(),
                        expected: param_is_array.len(),
                        got: args.len(),
                        pos: *pos,
                    });
                }
                for (arg, expects_array) in args.iter().zip(param_is_array.iter()) {
                    self.analyze_expr(arg)?;
                    let arg_is_array = self.expr_is_array(arg);
                    if *expects_array && !arg_is_array {
                        return Err(ClikeError::NotAnArray { name: arg_label(arg), pos: arg.position() });
                    }
                    if !*expects_array && arg_is_array {
                        return Err(ClikeError::TypeError {
                            message: format!("'{name}' expects a scalar argument, got an array"),
                            pos: arg.position(),
                        });
                    }
                }
                Ok(ret_type)
            }
            Node::UnaryOp { operand, .. } => self.analyze_expr(operand),
            Node::BinOp { op, left, right, .. } => {
                let lt = self.analyze_expr(left)?;
                let rt = self.analyze_expr(right)?;
                Ok(static_binop_type(*op, lt, rt))
            }
            other => unreachable!("{other:?} cannot appear as an expression"),
        }
    }

    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.current.get(name).or_else(|| self.global.get(name))
    }

    /// An argument expression denotes an array only when it is a bare reference to an
    /// array-typed variable; indexing, literals and calls always yield a scalar element.
    fn expr_is_array(&self, node: &Node) -> bool {
        matches!(node, Node::VarRef { name, .. } if matches!(self.lookup(name), Some(Symbol::Var { is_array: true, .. })))
    }
}

/// A short label for an argument expression used in array/scalar mismatch diagnostics.
fn arg_label(node: &Node) -> String {
    match node {
        Node::VarRef { name, .. } => name.clone(),
        Node::Index { name, .. } => format!("{name}[..]"),
        other => other.kind_name().to_owned(),
    }
}

fn check_narrowing(target: TypeTag, value: TypeTag, name: &str, pos: Position) -> Result<(), ClikeError> {
    if target == TypeTag::Int && value == TypeTag::Float {
        return Err(ClikeError::TypeNarrowing { name: name.to_owned(), pos });
    }
    Ok(())
}

/// Spec §4.4: `/` is always `FLOAT`; other arithmetic is `FLOAT` if either operand is
/// `FLOAT`, else `INT`; relational and logical always produce `INT`.
fn static_binop_type(op: BinOpKind, lt: TypeTag, rt: TypeTag) -> TypeTag {
    use BinOpKind::*;
    match op {
        Div => TypeTag::Float,
        Add | Sub | Mul => {
            if lt == TypeTag::Float || rt == TypeTag::Float {
                TypeTag::Float
            } else {
                TypeTag::Int
            }
        }
        Eq | Neq | Lt | Gt | Leq | Geq | And | Or => TypeTag::Int,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MapSourceLoader;
    use crate::parser::Parser;
    use crate::trace::NullTrace;

    fn analyze_src(src: &str) -> Result<(), ClikeError> {
        let loader = MapSourceLoader::new();
        let mut parser = Parser::new(src, &loader, "");
        let program = parser.parse().expect("source should parse");
        let mut trace = NullTrace;
        Analyzer::new(&mut trace).analyze(&program)
    }

    #[test]
    fn accepts_well_formed_program() {
        assert!(analyze_src(
            "int add(int a, int b) { return a + b; } int main() { print(add(1, 2)); }"
        )
        .is_ok());
    }

    #[test]
    fn rejects_narrowing_assignment() {
        assert!(matches!(
            analyze_src("int main() { int x = 1.5; }"),
            Err(ClikeError::TypeNarrowing { .. })
        ));
    }

    #[test]
    fn widening_assignment_is_fine() {
        assert!(analyze_src("int main() { float x = 1; }").is_ok());
    }

    #[test]
    fn rejects_duplicate_function_names() {
        assert!(matches!(
            analyze_src("int f(){return 0;} int f(){return 1;} int main(){return 0;}"),
            Err(ClikeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_unresolved_identifier() {
        assert!(matches!(
            analyze_src("int main() { print(y); }"),
            Err(ClikeError::IdNotFound { .. })
        ));
    }

    #[test]
    fn rejects_arg_count_mismatch() {
        assert!(matches!(
            analyze_src("int f(int a){return a;} int main(){ print(f(1, 2)); }"),
            Err(ClikeError::ArgCountMismatch { .. })
        ));
    }

    #[test]
    fn rejects_indexing_a_scalar() {
        assert!(matches!(
            analyze_src("int main() { int x = 0; print(x[0]); }"),
            Err(ClikeError::NotAnArray { .. })
        ));
    }

    #[test]
    fn for_init_is_scoped_to_the_function_not_the_loop() {
        assert!(matches!(
            analyze_src(
                "int main() { for (int i=0;i<1;i=i+1){} for (int i=0;i<1;i=i+1){} }"
            ),
            Err(ClikeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn print_accepts_any_argument_count() {
        assert!(analyze_src("int main() { print(1, 2, 3); }").is_ok());
    }

    #[test]
    fn rejects_bare_assignment_to_an_array_variable() {
        assert!(matches!(
            analyze_src("int main() { int a[3]; a = 5; }"),
            Err(ClikeError::TypeError { .. })
        ));
    }

    #[test]
    fn rejects_scalar_argument_for_an_array_parameter() {
        assert!(matches!(
            analyze_src("void bump(int xs[]){ xs[0] = 1; } int main(){ int a = 5; bump(a); }"),
            Err(ClikeError::NotAnArray { .. })
        ));
    }

    #[test]
    fn rejects_array_argument_for_a_scalar_parameter() {
        assert!(matches!(
            analyze_src("void show(int x){ print(x); } int main(){ int a[3]; show(a); }"),
            Err(ClikeError::TypeError { .. })
        ));
    }
}
