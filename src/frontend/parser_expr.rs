//! Expression parsing
//!
//! One function per precedence level: comma, assignment, conditional,
//! binary operators (precedence climbing), cast, unary, postfix, primary.

use crate::frontend::ast::*;
use crate::frontend::parser::Parser;
use crate::frontend::token::TokenKind;
use crate::utils::{Error, Result};

impl Parser {
    /// Parse a full expression, including the comma operator
    pub fn parse_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_assignment()?;
        while self.consume(&TokenKind::Comma) {
            let right = self.parse_assignment()?;
            expr = Expr::Comma {
                span: expr.span().merge(&right.span()),
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    /// Assignment is right-associative; the target is validated later
    pub(super) fn parse_assignment(&mut self) -> Result<Expr> {
        let target = self.parse_conditional()?;

        let op = match self.current_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            TokenKind::StarEq => AssignOp::Mul,
            TokenKind::SlashEq => AssignOp::Div,
            TokenKind::PercentEq => AssignOp::Mod,
            TokenKind::ShlEq => AssignOp::Shl,
            TokenKind::ShrEq => AssignOp::Shr,
            TokenKind::AmpEq => AssignOp::BitAnd,
            TokenKind::PipeEq => AssignOp::BitOr,
            TokenKind::CaretEq => AssignOp::BitXor,
            _ => return Ok(target),
        };
        self.advance();

        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            span: target.span().merge(&value.span()),
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// cond ? expr : conditional
    pub(super) fn parse_conditional(&mut self) -> Result<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.consume(&TokenKind::Question) {
            return Ok(cond);
        }

        let then_expr = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_conditional()?;

        Ok(Expr::Conditional {
            span: cond.span().merge(&else_expr.span()),
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// Precedence climbing over the binary operator levels
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_cast()?;

        while let Some(prec) = self.current_kind().binary_precedence() {
            if prec < min_prec {
                break;
            }
            let op_token = self.advance();
            let op = match binary_op(&op_token.kind) {
                Some(op) => op,
                None => break,
            };

            // All binary operators are left-associative
            let right = self.parse_binary(prec + 1)?;
            left = Expr::Binary {
                span: left.span().merge(&right.span()),
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// `(type) expr`, decided by whether the token after `(` starts a type name
    fn parse_cast(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::LParen) && self.peek_starts_type_name() {
            let start = self.advance();
            let ty = self.parse_type_name()?;
            self.expect(TokenKind::RParen)?;
            if self.check(&TokenKind::LBrace) {
                return Err(Error::Unsupported {
                    feature: "compound literals".to_string(),
                    span: self.current().span,
                });
            }
            let expr = self.parse_cast()?;
            return Ok(Expr::Cast {
                span: start.span.merge(&expr.span()),
                ty,
                expr: Box::new(expr),
            });
        }
        self.parse_unary()
    }

    fn peek_starts_type_name(&self) -> bool {
        self.peek_kind()
            .map_or(false, |kind| self.starts_type_name(kind))
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let op = match token.kind {
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            // ++/-- take a unary operand, the others a cast expression
            let operand = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                self.parse_unary()?
            } else {
                self.parse_cast()?
            };
            return Ok(Expr::Unary {
                span: token.span.merge(&operand.span()),
                op,
                operand: Box::new(operand),
            });
        }

        if token.kind == TokenKind::Sizeof {
            self.advance();
            if self.check(&TokenKind::LParen) && self.peek_starts_type_name() {
                self.advance();
                let ty = self.parse_type_name()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::SizeofType {
                    ty,
                    span: token.span.merge(&self.prev_span()),
                });
            }
            let expr = self.parse_unary()?;
            return Ok(Expr::SizeofExpr {
                span: token.span.merge(&expr.span()),
                expr: Box::new(expr),
            });
        }

        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.consume(&TokenKind::LParen) {
                // Function call
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_assignment()?);
                        if !self.consume(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen)?;
                expr = Expr::Call {
                    span: expr.span().merge(&self.prev_span()),
                    callee: Box::new(expr),
                    args,
                };
            } else if self.consume(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    span: expr.span().merge(&self.prev_span()),
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.check(&TokenKind::Dot) || self.check(&TokenKind::Arrow) {
                let arrow = self.advance().kind == TokenKind::Arrow;
                let member = self.parse_ident()?;
                expr = Expr::Member {
                    span: expr.span().merge(&member.span),
                    base: Box::new(expr),
                    member,
                    arrow,
                };
            } else if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    UnaryOp::PostInc
                } else {
                    UnaryOp::PostDec
                };
                expr = Expr::Unary {
                    span: expr.span().merge(&self.prev_span()),
                    op,
                    operand: Box::new(expr),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Expr::Ident(Ident::new(name, token.span))
            }
            TokenKind::IntLit(lit) => {
                self.advance();
                Expr::Literal(Literal::Int(lit, token.span))
            }
            TokenKind::FloatLit(lit) => {
                self.advance();
                Expr::Literal(Literal::Float(lit, token.span))
            }
            TokenKind::CharLit(value) => {
                self.advance();
                Expr::Literal(Literal::Char(value, token.span))
            }
            TokenKind::StringLit(first) => {
                self.advance();
                // Adjacent string literals concatenate
                let mut value = first;
                let mut span = token.span;
                while let TokenKind::StringLit(next) = self.current_kind() {
                    value.push_str(next);
                    span = span.merge(&self.current().span);
                    self.advance();
                }
                Expr::Literal(Literal::String(value, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                inner
            }
            other => {
                return Err(Error::ExpectedExpr {
                    got: other.describe(),
                    span: token.span,
                })
            }
        };

        Ok(expr)
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::PipePipe => BinOp::Or,
        TokenKind::AmpAmp => BinOp::And,
        TokenKind::Pipe => BinOp::BitOr,
        TokenKind::Caret => BinOp::BitXor,
        TokenKind::Amp => BinOp::BitAnd,
        TokenKind::EqEq => BinOp::Eq,
        TokenKind::Ne => BinOp::Ne,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::Shl => BinOp::Shl,
        TokenKind::Shr => BinOp::Shr,
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use crate::frontend::ast::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;

    fn expr(src: &str) -> Expr {
        let mut parser = Parser::new(Lexer::new(src)).expect("lexing failed");
        parser.parse_expr().expect("parsing failed")
    }

    #[test]
    fn test_precedence() {
        // a + b * c == d  parses as  (a + (b * c)) == d
        match expr("a + b * c == d") {
            Expr::Binary { op: BinOp::Eq, left, .. } => match *left {
                Expr::Binary { op: BinOp::Add, right, .. } => {
                    assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_left_associativity() {
        match expr("a - b - c") {
            Expr::Binary { op: BinOp::Sub, left, right, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Sub, .. }));
                assert!(matches!(*right, Expr::Ident(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match expr("a = b += c") {
            Expr::Assign { op: AssignOp::Assign, value, .. } => {
                assert!(matches!(*value, Expr::Assign { op: AssignOp::Add, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conditional_and_comma() {
        match expr("x ? y : z, w") {
            Expr::Comma { left, .. } => assert!(matches!(*left, Expr::Conditional { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain() {
        // p->next[2].value++ : postfix operators bind left to right
        match expr("p->next[2].value++") {
            Expr::Unary { op: UnaryOp::PostInc, operand, .. } => match *operand {
                Expr::Member { arrow: false, base, .. } => match *base {
                    Expr::Index { base, .. } => {
                        assert!(matches!(*base, Expr::Member { arrow: true, .. }));
                    }
                    other => panic!("unexpected {:?}", other),
                },
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unary_operators() {
        assert!(matches!(expr("*p"), Expr::Unary { op: UnaryOp::Deref, .. }));
        assert!(matches!(expr("&x"), Expr::Unary { op: UnaryOp::AddrOf, .. }));
        assert!(matches!(expr("--x"), Expr::Unary { op: UnaryOp::PreDec, .. }));
        assert!(matches!(expr("!~-x"), Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_calls_and_casts() {
        match expr("f(1, g(2), (char)3)") {
            Expr::Call { args, .. } => {
                assert_eq!(args.len(), 3);
                assert!(matches!(args[1], Expr::Call { .. }));
                assert!(matches!(args[2], Expr::Cast { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(expr("(int *)0"), Expr::Cast { .. }));
    }

    #[test]
    fn test_string_concatenation() {
        match expr(r#""ab" "cd""#) {
            Expr::Literal(Literal::String(s, _)) => assert_eq!(s, "abcd"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
