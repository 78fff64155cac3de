//! Tree-walking evaluation over the validated AST (spec §4.5/§4.6).
//!
//! The call stack is a plain `Vec<ActivationRecord>` with the global frame always at the
//! bottom; `return` is modeled as a distinct [`Flow`] value threaded back through statement
//! execution rather than as an error, so it can never be conflated with a real failure
//! (spec §9, "Non-local return").

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{BinOpKind, LValue, Node, TypeTag, UnaryOpKind};
use crate::error::ClikeError;
use crate::position::Position;
use crate::sink::OutputSink;
use crate::trace::Trace;

const PRINT_BUILTIN: &str = "print";

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Char(u8),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Unit,
}

/// What a statement did: ran to completion, or is unwinding a `return` (spec §9).
enum Flow {
    Normal,
    Return(Value),
}

struct Slot {
    ty: TypeTag,
    is_array: bool,
    value: Value,
}

/// One call frame: a flat name→value map, plus the declared type of each slot (kept only
/// to drive int→float widening on every assignment, since the interpreter otherwise never
/// consults static types at runtime — spec §9, "Symbol tables vs. activation records").
pub struct ActivationRecord {
    name: String,
    vars: HashMap<String, Slot>,
}

impl ActivationRecord {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), vars: HashMap::new() }
    }

    fn declare(&mut self, name: String, ty: TypeTag, is_array: bool, value: Value) {
        self.vars.insert(name, Slot { ty, is_array, value });
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        self.vars.get(name).map(|slot| slot.value.clone())
    }

    fn assign_scalar(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.vars.get_mut(name) {
            slot.value = widen(value, slot.ty);
        }
    }

    fn array_handle(&self, name: &str) -> Option<(TypeTag, Rc<RefCell<Vec<Value>>>)> {
        match self.vars.get(name) {
            Some(Slot { ty, is_array: true, value: Value::Array(cells) }) => Some((*ty, Rc::clone(cells))),
            _ => None,
        }
    }

    fn members_summary(&self) -> String {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        format!("{}({})", self.name, names.join(", "))
    }
}

/// Push/pop/peek, O(1), spec §4.5. The global frame at index 0 never holds variables —
/// function declarations live in `Interpreter::functions` instead — but stays on the stack
/// for the whole run so that `depth()` reads 1 between `main` invocations and 0 only after
/// the program has fully unwound.
struct CallStack {
    frames: Vec<ActivationRecord>,
}

impl CallStack {
    fn new() -> Self {
        Self { frames: vec![ActivationRecord::new("<global>")] }
    }

    fn push(&mut self, frame: ActivationRecord) {
        self.frames.push(frame);
    }

    fn pop(&mut self) -> ActivationRecord {
        self.frames.pop().expect("the global frame is never popped mid-run")
    }

    fn current(&self) -> &ActivationRecord {
        self.frames.last().expect("the global frame keeps the stack non-empty")
    }

    fn current_mut(&mut self) -> &mut ActivationRecord {
        self.frames.last_mut().expect("the global frame keeps the stack non-empty")
    }

    fn snapshot(&self) -> String {
        self.frames.iter().map(ActivationRecord::members_summary).collect::<Vec<_>>().join(" -> ")
    }
}

/// Runs `program`'s `main` to completion, writing `print` output to `sink` and diagnostic
/// records to `trace`.
pub fn run<O: OutputSink, T: Trace>(program: &Node, sink: &mut O, trace: &mut T) -> Result<(), ClikeError> {
    let Node::Program { funcs, main } = program else {
        panic!("run expects a Program node");
    };

    let mut functions = HashMap::new();
    for f in funcs.iter().chain(std::iter::once(main.as_ref())) {
        let Node::FunctionDecl { name, .. } = f else {
            unreachable!("Program.funcs/main only ever contain FunctionDecl nodes");
        };
        functions.insert(name.as_str(), f);
    }

    let mut interpreter = Interpreter { functions, stack: CallStack::new(), sink, trace };
    interpreter.eval_call("main", &[], Position::start())?;
    Ok(())
}

struct Interpreter<'p, O: OutputSink, T: Trace> {
    functions: HashMap<&'p str, &'p Node>,
    stack: CallStack,
    sink: &'p mut O,
    trace: &'p mut T,
}

impl<'p, O: OutputSink, T: Trace> Interpreter<'p, O, T> {
    fn eval_call(&mut self, name: &str, arg_exprs: &[Node], pos: Position) -> Result<Value, ClikeError> {
        let mut args = Vec::with_capacity(arg_exprs.len());
        for expr in arg_exprs {
            args.push(self.eval(expr)?);
        }

        if name == PRINT_BUILTIN {
            for value in &args {
                let text = render_for_print(value, pos)?;
                self.sink.print_line(&text);
            }
            return Ok(Value::Unit);
        }

        let decl = *self
            .functions
            .get(name)
            .ok_or_else(|| ClikeError::RuntimeUndefinedFunction { name: name.to_owned(), pos })?;
        let Node::FunctionDecl { params, body, .. } = decl else {
            unreachable!("functions only ever maps to FunctionDecl nodes");
        };

        let mut frame = ActivationRecord::new(name);
        for (param, value) in params.iter().zip(args) {
            let value = if param.is_array { value } else { widen(value, param.ty) };
            frame.declare(param.name.clone(), param.ty, param.is_array, value);
        }

        self.stack.push(frame);
        self.trace.stack(&self.stack.snapshot());
        let flow = self.exec_block(body);
        self.stack.pop();
        self.trace.stack(&self.stack.snapshot());

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Unit),
        }
    }

    fn exec_block(&mut self, node: &Node) -> Result<Flow, ClikeError> {
        let Node::Block { statements, .. } = node else {
            unreachable!("exec_block is only called with Block nodes");
        };
        for statement in statements {
            if let Flow::Return(value) = self.exec_statement(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, node: &Node) -> Result<Flow, ClikeError> {
        self.trace.debug(node.kind_name());
        match node {
            Node::VarDecl { ty, name, init, .. } => {
                let value = match init {
                    Some(expr) => widen(self.eval(expr)?, *ty),
                    None => default_value(*ty),
                };
                self.stack.current_mut().declare(name.clone(), *ty, false, value);
                Ok(Flow::Normal)
            }
            Node::ArrayDecl { ty, name, size, .. } => {
                let elements = vec![default_value(*ty); *size as usize];
                let value = Value::Array(Rc::new(RefCell::new(elements)));
                self.stack.current_mut().declare(name.clone(), *ty, true, value);
                Ok(Flow::Normal)
            }
            Node::Assign { target, value, .. } => {
                let new_value = self.eval(value)?;
                self.exec_assign(target, new_value)?;
                Ok(Flow::Normal)
            }
            Node::If { cond, then_block, else_block, .. } => {
                if truthy(&self.eval(cond)?, cond.position())? {
                    self.exec_block(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Node::While { cond, body, .. } => {
                while truthy(&self.eval(cond)?, cond.position())? {
                    if let Flow::Return(value) = self.exec_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Node::For { init, cond, post, body, .. } => {
                if let Some(init) = init {
                    self.exec_statement(init)?;
                }
                loop {
                    let keep_going = match cond {
                        Some(expr) => truthy(&self.eval(expr)?, expr.position())?,
                        None => true,
                    };
                    if !keep_going {
                        break;
                    }
                    if let Flow::Return(value) = self.exec_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                    for assign in post {
                        self.exec_statement(assign)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Node::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            Node::Call { name, args, pos } => {
                self.eval_call(name, args, *pos)?;
                Ok(Flow::Normal)
            }
            other => unreachable!("{} cannot appear as a statement", other.kind_name()),
        }
    }

    fn exec_assign(&mut self, target: &LValue, value: Value) -> Result<(), ClikeError> {
        match target {
            LValue::VarRef { name, .. } => {
                self.stack.current_mut().assign_scalar(name, value);
                Ok(())
            }
            LValue::Index { name, idx, pos } => {
                let index = as_index(self.eval(idx)?, *pos)?;
                let (elem_ty, cells) = self.stack.current().array_handle(name).ok_or_else(|| {
                    ClikeError::TypeError {
                        message: format!("'{name}' is not an array"),
                        pos: *pos,
                    }
                })?;
                let mut cells = cells.borrow_mut();
                if index < 0 || index as usize >= cells.len() {
                    return Err(ClikeError::IndexOutOfBounds { index, len: cells.len(), pos: *pos });
                }
                cells[index as usize] = widen(value, elem_ty);
                Ok(())
            }
        }
    }

    fn eval(&mut self, node: &Node) -> Result<Value, ClikeError> {
        self.trace.debug(node.kind_name());
        match node {
            Node::IntLit { value, .. } => Ok(Value::Int(*value)),
            Node::FloatLit { value, .. } => Ok(Value::Float(*value)),
            Node::CharLit { value, .. } => Ok(Value::Char(*value)),
            Node::StringLit { value, .. } => Ok(Value::Str(value.clone())),
            Node::VarRef { name, .. } => Ok(self
                .stack
                .current()
                .get_value(name)
                .unwrap_or_else(|| panic!("ID_NOT_FOUND escaped semantic analysis: '{name}'"))),
            Node::Index { name, idx, pos } => {
                let index = as_index(self.eval(idx)?, *pos)?;
                let (_, cells) = self.stack.current().array_handle(name).ok_or_else(|| {
                    ClikeError::TypeError {
                        message: format!("'{name}' is not an array"),
                        pos: *pos,
                    }
                })?;
                let cells = cells.borrow();
                if index < 0 || index as usize >= cells.len() {
                    return Err(ClikeError::IndexOutOfBounds { index, len: cells.len(), pos: *pos });
                }
                Ok(cells[index as usize].clone())
            }
            Node::UnaryOp { op, operand, pos } => {
                let value = self.eval(operand)?;
                eval_unary(*op, value, *pos)
            }
            Node::BinOp { op, left, right, pos } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                eval_binop(*op, l, r, *pos)
            }
            Node::Call { name, args, pos } => self.eval_call(name, args, *pos),
            other => unreachable!("{} cannot appear as an expression", other.kind_name()),
        }
    }
}

fn default_value(ty: TypeTag) -> Value {
    match ty {
        TypeTag::Int => Value::Int(0),
        TypeTag::Float => Value::Float(0.0),
        TypeTag::Char => Value::Char(0),
        TypeTag::String => Value::Str(String::new()),
        TypeTag::Void => Value::Unit,
    }
}

/// Int→float widening, applied on every declaration and assignment; never narrows (spec
/// §4.6 — narrowing is rejected before execution ever starts, by the semantic analyzer).
fn widen(value: Value, ty: TypeTag) -> Value {
    match (value, ty) {
        (Value::Int(i), TypeTag::Float) => Value::Float(i as f64),
        (other, _) => other,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Char(_) => "char",
        Value::Str(_) => "string",
        Value::Array(_) => "array",
        Value::Unit => "void",
    }
}

fn truthy(value: &Value, pos: Position) -> Result<bool, ClikeError> {
    match value {
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        Value::Char(c) => Ok(*c != 0),
        Value::Str(s) => Ok(!s.is_empty()),
        other => Err(ClikeError::TypeError {
            message: format!("a {} cannot be used as a condition", type_name(other)),
            pos,
        }),
    }
}

fn as_index(value: Value, pos: Position) -> Result<i64, ClikeError> {
    match value {
        Value::Int(i) => Ok(i),
        Value::Float(f) => Ok(f as i64),
        other => Err(ClikeError::TypeError {
            message: format!("array index must be numeric, got {}", type_name(&other)),
            pos,
        }),
    }
}

fn as_float(value: Value, pos: Position) -> Result<f64, ClikeError> {
    match value {
        Value::Int(i) => Ok(i as f64),
        Value::Float(f) => Ok(f),
        other => Err(ClikeError::TypeError {
            message: format!("expected a numeric value, got {}", type_name(&other)),
            pos,
        }),
    }
}

fn bool_to_value(b: bool) -> Value {
    Value::Int(if b { 1 } else { 0 })
}

fn eval_unary(op: UnaryOpKind, value: Value, pos: Position) -> Result<Value, ClikeError> {
    match (op, value) {
        (UnaryOpKind::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (UnaryOpKind::Neg, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnaryOpKind::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, other) => Err(ClikeError::TypeError {
            message: format!(
                "unary '{}' requires a numeric operand, got {}",
                if op == UnaryOpKind::Plus { "+" } else { "-" },
                type_name(&other)
            ),
            pos,
        }),
    }
}

/// `+ - *`: int if both operands are int, else float. `/` always produces float and is
/// handled separately by its caller. `+` on strings concatenates (spec §4.6).
fn arith(op: BinOpKind, l: Value, r: Value, pos: Position) -> Result<Value, ClikeError> {
    use BinOpKind::*;
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            _ => unreachable!("arith is only called for + - *"),
        })),
        (a, b) => {
            let x = as_float(a, pos)?;
            let y = as_float(b, pos)?;
            Ok(Value::Float(match op {
                Add => x + y,
                Sub => x - y,
                Mul => x * y,
                _ => unreachable!("arith is only called for + - *"),
            }))
        }
    }
}

fn compare(op: BinOpKind, l: Value, r: Value, pos: Position) -> Result<Value, ClikeError> {
    use BinOpKind::*;

    let ordering = match (&l, &r) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_float(l, pos)?;
            let b = as_float(r, pos)?;
            a.partial_cmp(&b).unwrap_or(Ordering::Greater)
        }
        (Value::Str(_), Value::Str(_)) => {
            let (Value::Str(a), Value::Str(b)) = (l, r) else { unreachable!() };
            a.cmp(&b)
        }
        (Value::Char(_), Value::Char(_)) => {
            let (Value::Char(a), Value::Char(b)) = (l, r) else { unreachable!() };
            a.cmp(&b)
        }
        _ => {
            return Err(ClikeError::TypeError {
                message: format!("cannot compare a {} with a {}", type_name(&l), type_name(&r)),
                pos,
            });
        }
    };

    let truth = match op {
        Eq => ordering == Ordering::Equal,
        Neq => ordering != Ordering::Equal,
        Lt => ordering == Ordering::Less,
        Gt => ordering == Ordering::Greater,
        Leq => ordering != Ordering::Greater,
        Geq => ordering != Ordering::Less,
        _ => unreachable!("compare is only called for relational/equality operators"),
    };
    Ok(bool_to_value(truth))
}

fn eval_binop(op: BinOpKind, l: Value, r: Value, pos: Position) -> Result<Value, ClikeError> {
    use BinOpKind::*;
    match op {
        Add => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::Str(_), other) | (other, Value::Str(_)) => Err(ClikeError::TypeError {
                message: format!("'+' cannot combine a string with a {}", type_name(&other)),
                pos,
            }),
            (a, b) => arith(Add, a, b, pos),
        },
        Sub => arith(Sub, l, r, pos),
        Mul => arith(Mul, l, r, pos),
        Div => {
            let a = as_float(l, pos)?;
            let b = as_float(r, pos)?;
            if b == 0.0 {
                return Err(ClikeError::DivByZero { pos });
            }
            Ok(Value::Float(a / b))
        }
        Eq | Neq | Lt | Gt | Leq | Geq => compare(op, l, r, pos),
        And => Ok(bool_to_value(truthy(&l, pos)? && truthy(&r, pos)?)),
        Or => Ok(bool_to_value(truthy(&l, pos)? || truthy(&r, pos)?)),
    }
}

/// Spec §6: integers as decimal, floats with at least one fractional digit, chars as their
/// single character, strings as their contents.
fn render_for_print(value: &Value, pos: Position) -> Result<String, ClikeError> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(format_float(*f)),
        Value::Char(c) => Ok((*c as char).to_string()),
        Value::Str(s) => Ok(s.clone()),
        other => Err(ClikeError::TypeError {
            message: format!("print has no textual form for a {}", type_name(other)),
            pos,
        }),
    }
}

fn format_float(f: f64) -> String {
    let s = format!("{f}");
    if s.contains('.') || s.contains(['e', 'E']) || !f.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MapSourceLoader;
    use crate::parser::Parser;
    use crate::semantic::Analyzer;
    use crate::sink::VecSink;
    use crate::trace::NullTrace;

    fn run_src(src: &str) -> Result<Vec<String>, ClikeError> {
        let loader = MapSourceLoader::new();
        let mut parser = Parser::new(src, &loader, "");
        let program = parser.parse().expect("source should parse");

        let mut null_trace = NullTrace;
        Analyzer::new(&mut null_trace).analyze(&program)?;

        let mut sink = VecSink::default();
        let mut trace = NullTrace;
        run(&program, &mut sink, &mut trace)?;
        Ok(sink.lines)
    }

    #[test]
    fn hello_world() {
        assert_eq!(
            run_src(r#"int main() { print("Hello, CLIKE!"); }"#).unwrap(),
            vec!["Hello, CLIKE!"]
        );
    }

    #[test]
    fn factorial_by_recursion() {
        let src = "int factorial(int n){ if (n<=1){return 1;} else {return n*factorial(n-1);} } \
                    int main(){ print(factorial(5)); }";
        assert_eq!(run_src(src).unwrap(), vec!["120"]);
    }

    #[test]
    fn array_sum_via_for_loop() {
        let src = "int main(){ int a[3]; a[0]=10; a[1]=20; a[2]=30; int s=0; \
                    for(int i=0;i<3;i=i+1){s=s+a[i];} print(s); }";
        assert_eq!(run_src(src).unwrap(), vec!["60"]);
    }

    #[test]
    fn division_is_always_float() {
        assert_eq!(run_src("int main(){ print(5/2); }").unwrap(), vec!["2.5"]);
    }

    #[test]
    fn bounds_error_is_reported() {
        let err = run_src("int main(){ int a[2]; print(a[5]); }").unwrap_err();
        assert!(matches!(err, ClikeError::IndexOutOfBounds { index: 5, len: 2, .. }));
    }

    #[test]
    fn array_parameters_alias_the_caller() {
        let src = "void bump(int xs[]){ xs[0] = xs[0] + 1; } \
                    int main(){ int a[1]; a[0] = 41; bump(a); print(a[0]); }";
        assert_eq!(run_src(src).unwrap(), vec!["42"]);
    }

    #[test]
    fn widening_happens_on_declaration_and_assignment() {
        let src = "int main(){ float x = 1; print(x); x = 2; print(x); }";
        assert_eq!(run_src(src).unwrap(), vec!["1.0", "2.0"]);
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = run_src("int main(){ print(1/0); }").unwrap_err();
        assert!(matches!(err, ClikeError::DivByZero { .. }));
    }

    #[test]
    fn string_concatenation() {
        let src = r#"int main(){ string s = "a" + "b"; print(s); }"#;
        assert_eq!(run_src(src).unwrap(), vec!["ab"]);
    }

    #[test]
    fn passing_a_scalar_to_an_array_parameter_is_a_clean_error_not_a_panic() {
        let src = "void bump(int xs[]){ xs[0] = xs[0] + 1; } int main(){ int a = 5; bump(a); }";
        let err = run_src(src).unwrap_err();
        assert!(matches!(err, ClikeError::NotAnArray { .. }));
    }
}
