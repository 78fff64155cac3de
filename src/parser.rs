//! Token stream → AST, with include resolution (spec §4.2).
//!
//! A hand-written recursive-descent parser: one function per grammar nonterminal, operator
//! precedence encoded by the nesting of the `*_expr` functions rather than a table, exactly
//! as the grammar in spec §4.2 lays it out.

use std::collections::HashSet;
use std::path::Path;

use crate::ast::{BinOpKind, LValue, Node, Param, TypeTag, UnaryOpKind};
use crate::error::ClikeError;
use crate::lexer::Lexer;
use crate::loader::SourceLoader;
use crate::position::Position;
use crate::token::{Token, TokenKind};

const MAX_INCLUDE_DEPTH: usize = 64;

/// State shared across the whole include tree: the canonical-path dedup set and the
/// current nesting depth (spec §4.2 — "the parser maintains a set of already-included
/// canonical paths").
#[derive(Default)]
struct IncludeState {
    included: HashSet<String>,
    depth: usize,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    loader: &'a dyn SourceLoader,
    base_dir: String,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, loader: &'a dyn SourceLoader, base_dir: impl Into<String>) -> Self {
        Self {
            lexer: Lexer::new(source),
            loader,
            base_dir: base_dir.into(),
        }
    }

    /// Parses a whole program: `program := include* top_decl* EOF`, followed by main
    /// extraction (spec §4.2).
    pub fn parse(&mut self) -> Result<Node, ClikeError> {
        let mut state = IncludeState::default();
        let mut funcs = self.parse_top_level(&mut state)?;

        let main_index = funcs.iter().position(|f| is_valid_main(f));
        let Some(index) = main_index else {
            return Err(ClikeError::MissingMain);
        };
        let main = funcs.remove(index);

        Ok(Node::Program { funcs, main: Box::new(main) })
    }

    fn parse_top_level(&mut self, state: &mut IncludeState) -> Result<Vec<Node>, ClikeError> {
        let mut funcs = vec![];
        let mut declarations_started = false;

        loop {
            match self.lexer.peek()? {
                Token::Include { path, pos } => {
                    if declarations_started {
                        return Err(ClikeError::ParseBadIncludePosition { pos });
                    }
                    self.lexer.next()?;
                    funcs.extend(self.parse_include(&path, pos, state)?);
                }
                Token::Eof { .. } => break,
                _ => {
                    declarations_started = true;
                    funcs.push(self.parse_function_decl()?);
                }
            }
        }

        Ok(funcs)
    }

    fn parse_include(
        &mut self,
        path: &str,
        pos: Position,
        state: &mut IncludeState,
    ) -> Result<Vec<Node>, ClikeError> {
        state.depth += 1;
        if state.depth > MAX_INCLUDE_DEPTH {
            return Err(ClikeError::ParseIncludeDepth { pos });
        }

        let (canonical, text) = self
            .loader
            .read(path, &self.base_dir)
            .map_err(|_| ClikeError::ParseIncludeIo { path: path.to_owned(), pos })?;

        if !state.included.insert(canonical.clone()) {
            state.depth -= 1;
            return Ok(vec![]);
        }

        let included_base_dir = Path::new(&canonical)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut sub_parser = Parser {
            lexer: Lexer::new(&text),
            loader: self.loader,
            base_dir: included_base_dir,
        };
        let funcs = sub_parser.parse_top_level(state)?;
        state.depth -= 1;

        Ok(funcs.into_iter().filter(|f| !is_named(f, "main")).collect())
    }

    // -- primitives --------------------------------------------------------------

    fn peek_kind(&mut self) -> Result<TokenKind, ClikeError> {
        Ok(self.lexer.peek()?.kind())
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Token, ClikeError> {
        let tok = self.lexer.next()?;
        if tok.kind() != kind {
            return Err(ClikeError::ParseExpected {
                expected: kind.to_string(),
                got: tok.describe(),
                pos: tok.position(),
            });
        }
        Ok(tok)
    }

    fn eat_id(&mut self) -> Result<(String, Position), ClikeError> {
        let tok = self.eat(TokenKind::Id)?;
        let Token::Id { name, pos } = tok else {
            unreachable!("eat(Id) guarantees an Id token");
        };
        Ok((name, pos))
    }

    // -- declarations --------------------------------------------------------------

    fn parse_type(&mut self) -> Result<TypeTag, ClikeError> {
        let tok = self.lexer.next()?;
        match tok.kind() {
            TokenKind::IntKw => Ok(TypeTag::Int),
            TokenKind::FloatKw => Ok(TypeTag::Float),
            TokenKind::CharKw => Ok(TypeTag::Char),
            TokenKind::StringKw => Ok(TypeTag::String),
            TokenKind::VoidKw => Ok(TypeTag::Void),
            _ => Err(ClikeError::ParseExpected {
                expected: "a type".to_owned(),
                got: tok.describe(),
                pos: tok.position(),
            }),
        }
    }

    fn parse_function_decl(&mut self) -> Result<Node, ClikeError> {
        let pos = self.lexer.peek()?.position();
        let ret_type = self.parse_type()?;
        let (name, _) = self.eat_id()?;
        self.eat(TokenKind::LParen)?;
        let params = if self.peek_kind()? == TokenKind::RParen {
            vec![]
        } else {
            self.parse_param_list()?
        };
        self.eat(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Node::FunctionDecl { ret_type, name, params, body: Box::new(body), pos })
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, ClikeError> {
        let mut params = vec![];
        loop {
            let pos = self.lexer.peek()?.position();
            let ty = self.parse_type()?;
            let (name, _) = self.eat_id()?;
            let is_array = if self.peek_kind()? == TokenKind::LBrack {
                self.eat(TokenKind::LBrack)?;
                self.eat(TokenKind::RBrack)?;
                true
            } else {
                false
            };
            params.push(Param { ty, name, is_array, pos });

            if self.peek_kind()? == TokenKind::Comma {
                self.eat(TokenKind::Comma)?;
                continue;
            }
            break;
        }
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<Node, ClikeError> {
        let pos = self.eat(TokenKind::LBrace)?.position();
        let mut statements = vec![];
        while self.peek_kind()? != TokenKind::RBrace {
            statements.extend(self.parse_statement()?);
        }
        self.eat(TokenKind::RBrace)?;
        Ok(Node::Block { statements, pos })
    }

    /// Parses one `statement` production. Returns a `Vec` because a `var_decl` with
    /// multiple comma-separated declarators desugars to a flat sequence of `VarDecl`
    /// nodes (spec §3).
    fn parse_statement(&mut self) -> Result<Vec<Node>, ClikeError> {
        match self.peek_kind()? {
            TokenKind::IntKw | TokenKind::FloatKw | TokenKind::CharKw | TokenKind::StringKw | TokenKind::VoidKw => {
                self.parse_var_or_array_decl()
            }
            TokenKind::If => Ok(vec![self.parse_if()?]),
            TokenKind::While => Ok(vec![self.parse_while()?]),
            TokenKind::For => Ok(vec![self.parse_for()?]),
            TokenKind::Return => Ok(vec![self.parse_return()?]),
            TokenKind::Id => self.parse_id_led_statement(),
            _ => {
                let tok = self.lexer.next()?;
                Err(ClikeError::ParseExpected {
                    expected: "a statement".to_owned(),
                    got: tok.describe(),
                    pos: tok.position(),
                })
            }
        }
    }

    fn parse_var_or_array_decl(&mut self) -> Result<Vec<Node>, ClikeError> {
        let pos = self.lexer.peek()?.position();
        let ty = self.parse_type()?;
        let (first_name, _) = self.eat_id()?;

        if self.peek_kind()? == TokenKind::LBrack {
            self.eat(TokenKind::LBrack)?;
            let size_tok = self.eat(TokenKind::IntegerConst)?;
            let Token::IntegerConst { value: size, .. } = size_tok else {
                unreachable!("eat(IntegerConst) guarantees an IntegerConst token");
            };
            self.eat(TokenKind::RBrack)?;
            self.eat(TokenKind::Semi)?;
            return Ok(vec![Node::ArrayDecl { ty, name: first_name, size, pos }]);
        }

        let mut decls = vec![];
        let mut name = first_name;
        loop {
            let init = if self.peek_kind()? == TokenKind::Assign {
                self.eat(TokenKind::Assign)?;
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            decls.push(Node::VarDecl { ty, name, init, pos });

            if self.peek_kind()? == TokenKind::Comma {
                self.eat(TokenKind::Comma)?;
                let (next_name, _) = self.eat_id()?;
                name = next_name;
                continue;
            }
            break;
        }
        self.eat(TokenKind::Semi)?;
        Ok(decls)
    }

    /// An identifier-led statement is either a call (`ID '(' ... ')' ';'`) or an
    /// assignment (`lvalue '=' expr ';'`).
    fn parse_id_led_statement(&mut self) -> Result<Vec<Node>, ClikeError> {
        let pos = self.lexer.peek()?.position();
        let (name, _) = self.eat_id()?;

        if self.peek_kind()? == TokenKind::LParen {
            self.eat(TokenKind::LParen)?;
            let args = if self.peek_kind()? == TokenKind::RParen {
                vec![]
            } else {
                self.parse_arg_list()?
            };
            self.eat(TokenKind::RParen)?;
            self.eat(TokenKind::Semi)?;
            return Ok(vec![Node::Call { name, args, pos }]);
        }

        let target = if self.peek_kind()? == TokenKind::LBrack {
            self.eat(TokenKind::LBrack)?;
            let idx = self.parse_expr()?;
            self.eat(TokenKind::RBrack)?;
            LValue::Index { name, idx: Box::new(idx), pos }
        } else {
            LValue::VarRef { name, pos }
        };
        self.eat(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.eat(TokenKind::Semi)?;
        Ok(vec![Node::Assign { target, value: Box::new(value), pos }])
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Node>, ClikeError> {
        let mut args = vec![self.parse_expr()?];
        while self.peek_kind()? == TokenKind::Comma {
            self.eat(TokenKind::Comma)?;
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    fn parse_if(&mut self) -> Result<Node, ClikeError> {
        let pos = self.eat(TokenKind::If)?.position();
        self.eat(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.eat(TokenKind::RParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.peek_kind()? == TokenKind::Else {
            self.eat(TokenKind::Else)?;
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };
        Ok(Node::If { cond: Box::new(cond), then_block: Box::new(then_block), else_block, pos })
    }

    fn parse_while(&mut self) -> Result<Node, ClikeError> {
        let pos = self.eat(TokenKind::While)?.position();
        self.eat(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.eat(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Node::While { cond: Box::new(cond), body: Box::new(body), pos })
    }

    fn parse_for(&mut self) -> Result<Node, ClikeError> {
        let pos = self.eat(TokenKind::For)?.position();
        self.eat(TokenKind::LParen)?;

        let init = if self.peek_kind()? == TokenKind::Semi {
            None
        } else {
            Some(Box::new(self.parse_for_init()?))
        };
        self.eat(TokenKind::Semi)?;

        let cond = if self.peek_kind()? == TokenKind::Semi {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.eat(TokenKind::Semi)?;

        let mut post = vec![];
        if self.peek_kind()? != TokenKind::RParen {
            post.push(self.parse_assign_core()?);
            while self.peek_kind()? == TokenKind::Comma {
                self.eat(TokenKind::Comma)?;
                post.push(self.parse_assign_core()?);
            }
        }
        self.eat(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Ok(Node::For { init, cond, post, body: Box::new(body), pos })
    }

    /// `for_init := var_decl_head | assign_core` — a single declarator (no trailing
    /// semicolon, no comma chain) or a bare assignment.
    fn parse_for_init(&mut self) -> Result<Node, ClikeError> {
        match self.peek_kind()? {
            TokenKind::IntKw | TokenKind::FloatKw | TokenKind::CharKw | TokenKind::StringKw | TokenKind::VoidKw => {
                let pos = self.lexer.peek()?.position();
                let ty = self.parse_type()?;
                let (name, _) = self.eat_id()?;
                let init = if self.peek_kind()? == TokenKind::Assign {
                    self.eat(TokenKind::Assign)?;
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                Ok(Node::VarDecl { ty, name, init, pos })
            }
            _ => self.parse_assign_core(),
        }
    }

    /// `assign_core := lvalue '=' expr`, used by `for_init` and `for_post`.
    fn parse_assign_core(&mut self) -> Result<Node, ClikeError> {
        let pos = self.lexer.peek()?.position();
        let (name, _) = self.eat_id()?;
        let target = if self.peek_kind()? == TokenKind::LBrack {
            self.eat(TokenKind::LBrack)?;
            let idx = self.parse_expr()?;
            self.eat(TokenKind::RBrack)?;
            LValue::Index { name, idx: Box::new(idx), pos }
        } else {
            LValue::VarRef { name, pos }
        };
        self.eat(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(Node::Assign { target, value: Box::new(value), pos })
    }

    fn parse_return(&mut self) -> Result<Node, ClikeError> {
        let pos = self.eat(TokenKind::Return)?.position();
        let value = if self.peek_kind()? == TokenKind::Semi {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.eat(TokenKind::Semi)?;
        Ok(Node::Return { value, pos })
    }

    // -- expressions (precedence climbing) ------------------------------------------

    fn parse_expr(&mut self) -> Result<Node, ClikeError> {
        self.parse_logic_or()
    }

    fn parse_logic_or(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(Self::parse_logic_and, &[(TokenKind::Or, BinOpKind::Or)])
    }

    fn parse_logic_and(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(Self::parse_equality, &[(TokenKind::And, BinOpKind::And)])
    }

    fn parse_equality(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(
            Self::parse_relational,
            &[(TokenKind::Eq, BinOpKind::Eq), (TokenKind::Neq, BinOpKind::Neq)],
        )
    }

    fn parse_relational(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(
            Self::parse_additive,
            &[
                (TokenKind::Lt, BinOpKind::Lt),
                (TokenKind::Gt, BinOpKind::Gt),
                (TokenKind::Leq, BinOpKind::Leq),
                (TokenKind::Geq, BinOpKind::Geq),
            ],
        )
    }

    fn parse_additive(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(
            Self::parse_term,
            &[(TokenKind::Plus, BinOpKind::Add), (TokenKind::Minus, BinOpKind::Sub)],
        )
    }

    fn parse_term(&mut self) -> Result<Node, ClikeError> {
        self.parse_binary_chain(
            Self::parse_unary,
            &[(TokenKind::Star, BinOpKind::Mul), (TokenKind::Slash, BinOpKind::Div)],
        )
    }

    /// Shared left-associative "a (OP a)*" loop used by every binary precedence level.
    fn parse_binary_chain(
        &mut self,
        mut next: impl FnMut(&mut Self) -> Result<Node, ClikeError>,
        ops: &[(TokenKind, BinOpKind)],
    ) -> Result<Node, ClikeError> {
        let mut left = next(self)?;
        loop {
            let kind = self.peek_kind()?;
            let Some(&(_, op)) = ops.iter().find(|(k, _)| *k == kind) else {
                break;
            };
            let pos = self.lexer.next()?.position();
            let right = next(self)?;
            left = Node::BinOp { op, left: Box::new(left), right: Box::new(right), pos };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ClikeError> {
        match self.peek_kind()? {
            TokenKind::Plus => {
                let pos = self.eat(TokenKind::Plus)?.position();
                let operand = self.parse_primary()?;
                Ok(Node::UnaryOp { op: UnaryOpKind::Plus, operand: Box::new(operand), pos })
            }
            TokenKind::Minus => {
                let pos = self.eat(TokenKind::Minus)?.position();
                let operand = self.parse_primary()?;
                Ok(Node::UnaryOp { op: UnaryOpKind::Neg, operand: Box::new(operand), pos })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ClikeError> {
        let tok = self.lexer.next()?;
        match tok {
            Token::IntegerConst { value, pos } => Ok(Node::IntLit { value, pos }),
            Token::FloatConst { value, pos } => Ok(Node::FloatLit { value, pos }),
            Token::CharConst { value, pos } => Ok(Node::CharLit { value, pos }),
            Token::StringConst { value, pos } => Ok(Node::StringLit { value, pos }),
            Token::Id { name, pos } => match self.peek_kind()? {
                TokenKind::LParen => {
                    self.eat(TokenKind::LParen)?;
                    let args = if self.peek_kind()? == TokenKind::RParen {
                        vec![]
                    } else {
                        self.parse_arg_list()?
                    };
                    self.eat(TokenKind::RParen)?;
                    Ok(Node::Call { name, args, pos })
                }
                TokenKind::LBrack => {
                    self.eat(TokenKind::LBrack)?;
                    let idx = self.parse_expr()?;
                    self.eat(TokenKind::RBrack)?;
                    Ok(Node::Index { name, idx: Box::new(idx), pos })
                }
                _ => Ok(Node::VarRef { name, pos }),
            },
            Token::LParen { .. } => {
                let inner = self.parse_expr()?;
                self.eat(TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(ClikeError::ParseExpected {
                expected: "an expression".to_owned(),
                got: other.describe(),
                pos: other.position(),
            }),
        }
    }
}

fn is_named(node: &Node, name: &str) -> bool {
    matches!(node, Node::FunctionDecl { name: n, .. } if n == name)
}

fn is_valid_main(node: &Node) -> bool {
    matches!(
        node,
        Node::FunctionDecl { name, ret_type: TypeTag::Int, params, .. }
            if name == "main" && params.is_empty()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MapSourceLoader;

    fn parse_ok(src: &str) -> Node {
        let loader = MapSourceLoader::new();
        let mut parser = Parser::new(src, &loader, "");
        parser.parse().expect("parse should succeed")
    }

    #[test]
    fn parses_hello_world() {
        let ast = parse_ok("int main() { print(\"hi\"); }");
        let Node::Program { funcs, main } = ast else { panic!("expected Program") };
        assert!(funcs.is_empty());
        let Node::FunctionDecl { name, body, .. } = *main else { panic!("expected FunctionDecl") };
        assert_eq!(name, "main");
        let Node::Block { statements, .. } = *body else { panic!("expected Block") };
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Node::Call { name, .. } if name == "print"));
    }

    #[test]
    fn desugars_multi_declarators() {
        let ast = parse_ok("int main() { int a = 1, b = 2; }");
        let Node::Program { main, .. } = ast else { panic!("expected Program") };
        let Node::FunctionDecl { body, .. } = *main else { panic!() };
        let Node::Block { statements, .. } = *body else { panic!() };
        assert_eq!(statements.len(), 2);
        assert!(matches!(&statements[0], Node::VarDecl { name, .. } if name == "a"));
        assert!(matches!(&statements[1], Node::VarDecl { name, .. } if name == "b"));
    }

    #[test]
    fn parses_operator_precedence() {
        let ast = parse_ok("int main() { int x = 1 + 2 * 3; }");
        let Node::Program { main, .. } = ast else { panic!() };
        let Node::FunctionDecl { body, .. } = *main else { panic!() };
        let Node::Block { statements, .. } = *body else { panic!() };
        let Node::VarDecl { init: Some(init), .. } = &statements[0] else { panic!() };
        let Node::BinOp { op: BinOpKind::Add, right, .. } = init.as_ref() else {
            panic!("expected '+' at the top, got {init:?}");
        };
        assert!(matches!(right.as_ref(), Node::BinOp { op: BinOpKind::Mul, .. }));
    }

    #[test]
    fn rejects_include_after_declaration() {
        let loader = MapSourceLoader::new().with_file("a.clike", "int f(){return 1;}");
        let src = "int main(){ return 0; }\n#include \"a.clike\"\n";
        let mut parser = Parser::new(src, &loader, "");
        assert!(matches!(parser.parse(), Err(ClikeError::ParseBadIncludePosition { .. })));
    }

    #[test]
    fn resolves_include_and_dedups_cycle() {
        let loader = MapSourceLoader::new()
            .with_file("a.clike", "#include \"b.clike\"\nint from_a(){return 1;}")
            .with_file("b.clike", "#include \"a.clike\"\nint from_b(){return 2;}");
        let src = "#include \"a.clike\"\nint main(){return 0;}";
        let mut parser = Parser::new(src, &loader, "");
        let ast = parser.parse().expect("cyclic include should not fatally error");
        let Node::Program { funcs, .. } = ast else { panic!() };
        let names: Vec<_> = funcs
            .iter()
            .map(|f| match f {
                Node::FunctionDecl { name, .. } => name.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["from_a", "from_b"]);
    }

    #[test]
    fn missing_main_is_an_error() {
        let loader = MapSourceLoader::new();
        let mut parser = Parser::new("int f(){ return 1; }", &loader, "");
        assert!(matches!(parser.parse(), Err(ClikeError::MissingMain)));
    }
}
