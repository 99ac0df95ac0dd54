//! Expression typing and constant evaluation
//!
//! Every expression is given a `CType`. Operands are used as rvalues
//! (arrays and functions decay, top-level qualifiers drop) except where C
//! needs the object itself: `sizeof`, `&`, assignment targets and `.`.

use log::debug;

use crate::frontend::ast::*;
use crate::frontend::semantic::{BuiltinCall, SemanticAnalyzer};
use crate::frontend::symbols::SymbolKind;
use crate::frontend::token::{FloatSuffix, IntLiteral, Radix};
use crate::types::{
    compatible_unqualified, is_assignable, is_castable, usual_arithmetic_conversion, CType, FloatKind, IntRank,
    TypeKind,
};
use crate::utils::{Error, Result, Span};

impl SemanticAnalyzer {
    // ==================== Entry Points ====================

    /// Type of an expression, without decay
    pub(super) fn check_expr(&mut self, expr: &Expr) -> Result<CType> {
        match expr {
            Expr::Literal(lit) => Ok(literal_type(lit)),
            Expr::Ident(ident) => {
                let ty = self.check_ident(ident)?;
                self.symbols.mark_used(&ident.name);
                Ok(ty)
            }
            Expr::Binary { op, left, right, span } => self.check_binary(*op, left, right, *span),
            Expr::Unary { op, operand, span } => self.check_unary(*op, operand, *span),
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => self.check_assign(*op, target, value, *span),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
                ..
            } => self.check_conditional(cond, then_expr, else_expr),
            Expr::Call { callee, args, span } => self.check_call(callee, args, *span),
            Expr::Index { base, index, span } => self.check_index(base, index, *span),
            Expr::Member {
                base,
                member,
                arrow,
                span,
            } => self.check_member(base, member, *arrow, *span),
            Expr::Cast { ty, expr, span } => {
                let target = self.resolve_type(ty)?;
                let source = self.check_rvalue(expr)?;
                if target.is_array() || target.is_function() || !is_castable(&source, &target) {
                    return Err(Error::InvalidCast {
                        from: self.type_name(&source),
                        to: self.type_name(&target),
                        span: *span,
                    });
                }
                Ok(target.unqualified())
            }
            Expr::SizeofType { ty, span } => {
                let ty = self.resolve_type(ty)?;
                self.size_of(&ty, *span)?;
                Ok(CType::ulong())
            }
            Expr::SizeofExpr { expr, span } => {
                let ty = self.check_expr(expr)?;
                self.size_of(&ty, *span)?;
                Ok(CType::ulong())
            }
            Expr::Comma { left, right, .. } => {
                self.check_expr(left)?;
                self.check_rvalue(right)
            }
        }
    }

    /// Type of an expression used for its value
    pub(super) fn check_rvalue(&mut self, expr: &Expr) -> Result<CType> {
        Ok(self.check_expr(expr)?.decay().unqualified())
    }

    /// Check that `expr` converts implicitly to `target` and return the
    /// expression's own type
    pub(super) fn check_conversion(&mut self, target: &CType, expr: &Expr) -> Result<CType> {
        let source = self.check_rvalue(expr)?;
        let is_null = self.is_null_constant(expr, &source);
        if is_assignable(&target.unqualified(), &source, is_null) {
            Ok(source)
        } else {
            Err(Error::TypeMismatch {
                expected: self.type_name(target),
                got: self.type_name(&source),
                span: expr.span(),
            })
        }
    }

    // ==================== Names ====================

    fn check_ident(&self, ident: &Ident) -> Result<CType> {
        if let Some(symbol) = self.symbols.lookup(&ident.name) {
            return match symbol.kind {
                SymbolKind::Variable | SymbolKind::Function => Ok(symbol.ty.clone()),
                SymbolKind::EnumConstant(_) => Ok(CType::int()),
                SymbolKind::Type | SymbolKind::Label => Err(Error::ExpectedExpr {
                    got: format!("type name '{}'", ident.name),
                    span: ident.span,
                }),
            };
        }
        match self.builtins.get(&ident.name) {
            Some(builtin) => Ok(builtin.ty()),
            None => Err(Error::UndefinedIdentifier {
                name: ident.name.clone(),
                span: ident.span,
            }),
        }
    }

    /// Identifiers naming objects, plus `*p`, `a[i]` and member access
    fn designates_object(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(ident) => {
                matches!(self.symbols.lookup(&ident.name), Some(s) if s.kind == SymbolKind::Variable)
            }
            _ => expr.is_lvalue(),
        }
    }

    // ==================== Operators ====================

    fn check_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, span: Span) -> Result<CType> {
        let left_ty = self.check_rvalue(left)?;
        let right_ty = self.check_rvalue(right)?;
        let (left_null, right_null) = if matches!(op, BinOp::Eq | BinOp::Ne) {
            (
                self.is_null_constant(left, &left_ty),
                self.is_null_constant(right, &right_ty),
            )
        } else {
            (false, false)
        };
        self.binary_result(op, &left_ty, &right_ty, left_null, right_null, span)
    }

    /// Result type of a binary operator on rvalue operand types
    fn binary_result(
        &self,
        op: BinOp,
        left: &CType,
        right: &CType,
        left_null: bool,
        right_null: bool,
        span: Span,
    ) -> Result<CType> {
        let invalid = || Error::InvalidOperands {
            op: op.symbol().to_string(),
            left: self.type_name(left),
            right: self.type_name(right),
            span,
        };
        let arithmetic = left.is_arithmetic() && right.is_arithmetic();
        let integers = left.is_integer() && right.is_integer();

        match op {
            BinOp::Add => {
                if arithmetic {
                    Ok(usual_arithmetic_conversion(left, right))
                } else if self.is_object_pointer(left) && right.is_integer() {
                    Ok(left.clone())
                } else if left.is_integer() && self.is_object_pointer(right) {
                    Ok(right.clone())
                } else {
                    Err(invalid())
                }
            }
            BinOp::Sub => {
                if arithmetic {
                    Ok(usual_arithmetic_conversion(left, right))
                } else if self.is_object_pointer(left) && right.is_integer() {
                    Ok(left.clone())
                } else if self.is_object_pointer(left) && self.is_object_pointer(right) && pointees_compatible(left, right)
                {
                    Ok(CType::long())
                } else {
                    Err(invalid())
                }
            }
            BinOp::Mul | BinOp::Div if arithmetic => Ok(usual_arithmetic_conversion(left, right)),
            BinOp::Mod | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor if integers => {
                Ok(usual_arithmetic_conversion(left, right))
            }
            BinOp::Shl | BinOp::Shr if integers => Ok(left.promote()),
            BinOp::And | BinOp::Or if left.is_scalar() && right.is_scalar() => Ok(CType::int()),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
                if arithmetic || pointees_compatible(left, right) =>
            {
                Ok(CType::int())
            }
            BinOp::Eq | BinOp::Ne => {
                let pointers = left.is_pointer() && right.is_pointer();
                if arithmetic
                    || (pointers && (pointees_compatible(left, right) || left.is_void_pointer() || right.is_void_pointer()))
                    || (left.is_pointer() && right_null)
                    || (left_null && right.is_pointer())
                {
                    Ok(CType::int())
                } else {
                    Err(invalid())
                }
            }
            _ => Err(invalid()),
        }
    }

    /// Pointer to a complete object type. `void *` arithmetic is rejected.
    fn is_object_pointer(&self, ty: &CType) -> bool {
        ty.pointee()
            .map_or(false, |p| !p.is_function() && self.registry.is_complete(p))
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Result<CType> {
        let invalid = |this: &Self, ty: &CType| Error::InvalidUnaryOperand {
            op: op.symbol().to_string(),
            operand: this.type_name(ty),
            span,
        };

        match op {
            UnaryOp::Neg | UnaryOp::Plus => {
                let ty = self.check_rvalue(operand)?;
                if ty.is_arithmetic() {
                    Ok(ty.promote())
                } else {
                    Err(invalid(self, &ty))
                }
            }
            UnaryOp::BitNot => {
                let ty = self.check_rvalue(operand)?;
                if ty.is_integer() {
                    Ok(ty.promote())
                } else {
                    Err(invalid(self, &ty))
                }
            }
            UnaryOp::Not => {
                let ty = self.check_rvalue(operand)?;
                if ty.is_scalar() {
                    Ok(CType::int())
                } else {
                    Err(invalid(self, &ty))
                }
            }
            UnaryOp::Deref => {
                let ty = self.check_rvalue(operand)?;
                match ty.pointee() {
                    Some(pointee) if !pointee.is_void() => Ok(pointee.clone()),
                    _ => Err(invalid(self, &ty)),
                }
            }
            UnaryOp::AddrOf => {
                let ty = self.check_expr(operand)?;
                if ty.is_function() || self.designates_object(operand) {
                    Ok(CType::pointer_to(ty))
                } else {
                    Err(Error::NotAnLvalue { span: operand.span() })
                }
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let ty = self.check_modifiable(operand, true)?.unqualified();
                if ty.is_arithmetic() || self.is_object_pointer(&ty) {
                    Ok(ty)
                } else {
                    Err(invalid(self, &ty))
                }
            }
        }
    }

    /// The type of an assignable lvalue
    /// A plain `=` stores without reading, so a bare variable target
    /// does not count as a use
    fn check_modifiable(&mut self, target: &Expr, reads: bool) -> Result<CType> {
        let ty = match target {
            Expr::Ident(ident) if !reads => self.check_ident(ident)?,
            _ => self.check_expr(target)?,
        };
        if !self.designates_object(target) || ty.is_array() || ty.is_function() {
            return Err(Error::NotAnLvalue { span: target.span() });
        }
        if ty.is_const() {
            return Err(Error::ReadOnlyAssignment {
                ty: self.type_name(&ty),
                span: target.span(),
            });
        }
        Ok(ty)
    }

    fn check_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, span: Span) -> Result<CType> {
        let target_ty = self.check_modifiable(target, op.binary_op().is_some())?.unqualified();

        match op.binary_op() {
            None => {
                self.check_conversion(&target_ty, value)?;
            }
            // a op= b  checks as  a = a op b
            Some(bin) => {
                let value_ty = self.check_rvalue(value)?;
                let result = self.binary_result(bin, &target_ty, &value_ty, false, false, span)?;
                if !is_assignable(&target_ty, &result, false) {
                    return Err(Error::TypeMismatch {
                        expected: self.type_name(&target_ty),
                        got: self.type_name(&result),
                        span,
                    });
                }
            }
        }
        Ok(target_ty)
    }

    fn check_conditional(&mut self, cond: &Expr, then_expr: &Expr, else_expr: &Expr) -> Result<CType> {
        self.check_condition(cond)?;
        let a = self.check_rvalue(then_expr)?;
        let b = self.check_rvalue(else_expr)?;
        let a_null = self.is_null_constant(then_expr, &a);
        let b_null = self.is_null_constant(else_expr, &b);

        if a.is_arithmetic() && b.is_arithmetic() {
            return Ok(usual_arithmetic_conversion(&a, &b));
        }
        let result = match (&a.kind, &b.kind) {
            (TypeKind::Void, TypeKind::Void) => Some(a.clone()),
            (TypeKind::Record(x), TypeKind::Record(y)) if x == y => Some(a.clone()),
            (TypeKind::Pointer(_), _) if b_null => Some(a.clone()),
            (_, TypeKind::Pointer(_)) if a_null => Some(b.clone()),
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) if pointees_compatible(&a, &b) => Some(a.clone()),
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) if a.is_void_pointer() => Some(a.clone()),
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) if b.is_void_pointer() => Some(b.clone()),
            _ => None,
        };
        result.ok_or_else(|| Error::TypeMismatch {
            expected: self.type_name(&a),
            got: self.type_name(&b),
            span: else_expr.span(),
        })
    }

    // ==================== Postfix ====================

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Result<CType> {
        // Undeclared standard-library names resolve to built-ins
        let builtin = match callee {
            Expr::Ident(ident) if self.symbols.lookup(&ident.name).is_none() => {
                self.builtins.get(&ident.name).map(|b| (b.name.clone(), b.id, b.ty()))
            }
            _ => None,
        };
        let callee_ty = match builtin {
            Some((name, id, ty)) => {
                debug!("builtin call '{}' (id {:#06x})", name, id);
                self.builtin_calls.push(BuiltinCall { name, id, span });
                ty.decay()
            }
            None => self.check_rvalue(callee)?,
        };

        let func = match callee_ty.pointee().and_then(|p| p.as_function()) {
            Some(func) => func.clone(),
            None => {
                return Err(Error::NotCallable {
                    ty: self.type_name(&callee_ty),
                    span: callee.span(),
                })
            }
        };
        let name = match callee {
            Expr::Ident(ident) => ident.name.clone(),
            _ => "function pointer".to_string(),
        };

        if !func.prototyped {
            for arg in args {
                self.check_rvalue(arg)?;
            }
            return Ok(*func.ret);
        }

        let fixed = func.params.len();
        if args.len() < fixed || (args.len() > fixed && !func.variadic) {
            return Err(Error::ArgCountMismatch {
                name,
                expected: if func.variadic {
                    format!("at least {}", fixed)
                } else {
                    fixed.to_string()
                },
                got: args.len(),
                span,
            });
        }

        for (i, arg) in args.iter().enumerate() {
            let arg_ty = self.check_rvalue(arg)?;
            let param = match func.params.get(i) {
                Some(param) => param.unqualified(),
                // Variadic tail
                None => continue,
            };
            let is_null = self.is_null_constant(arg, &arg_ty);
            if !is_assignable(&param, &arg_ty, is_null) {
                return Err(Error::ArgTypeMismatch {
                    name,
                    index: i + 1,
                    expected: self.type_name(&param),
                    got: self.type_name(&arg_ty),
                    span: arg.span(),
                });
            }
        }
        Ok(*func.ret)
    }

    fn check_index(&mut self, base: &Expr, index: &Expr, span: Span) -> Result<CType> {
        let base_ty = self.check_rvalue(base)?;
        let index_ty = self.check_rvalue(index)?;

        // a[i] is *(a + i), so i[a] works too
        let elem = match (base_ty.pointee(), index_ty.pointee()) {
            (Some(elem), None) if index_ty.is_integer() => elem.clone(),
            (None, Some(elem)) if base_ty.is_integer() => elem.clone(),
            _ => {
                return Err(Error::NotIndexable {
                    ty: self.type_name(&base_ty),
                    span: base.span(),
                })
            }
        };
        if elem.is_function() || !self.registry.is_complete(&elem) {
            return Err(Error::IncompleteType {
                ty: self.type_name(&elem),
                span,
            });
        }
        Ok(elem)
    }

    fn check_member(&mut self, base: &Expr, member: &Ident, arrow: bool, span: Span) -> Result<CType> {
        let record = if arrow {
            let ptr = self.check_rvalue(base)?;
            match ptr.pointee() {
                Some(inner) => inner.clone(),
                None => {
                    return Err(Error::NotARecord {
                        ty: self.type_name(&ptr),
                        span,
                    })
                }
            }
        } else {
            self.check_expr(base)?
        };

        if !record.is_record() {
            return Err(Error::NotARecord {
                ty: self.type_name(&record),
                span,
            });
        }
        if !self.registry.is_complete(&record) {
            return Err(Error::IncompleteType {
                ty: self.type_name(&record),
                span,
            });
        }
        match self.registry.member(&record, &member.name).map(|f| f.ty.clone()) {
            // Members of a const struct are const
            Some(ty) => Ok(ty.with_quals(record.quals)),
            None => Err(Error::UnknownMember {
                member: member.name.clone(),
                ty: self.type_name(&record.unqualified()),
                span: member.span,
            }),
        }
    }

    fn size_of(&self, ty: &CType, span: Span) -> Result<u64> {
        self.registry.size_of(ty).ok_or_else(|| Error::IncompleteType {
            ty: self.type_name(ty),
            span,
        })
    }

    // ==================== Constants ====================

    /// An integer constant expression equal to zero
    fn is_null_constant(&mut self, expr: &Expr, ty: &CType) -> bool {
        ty.is_integer() && is_null_candidate(expr) && matches!(self.eval_const(expr), Ok(0))
    }

    /// Evaluate an integer constant expression
    pub(super) fn eval_const(&mut self, expr: &Expr) -> Result<i64> {
        let not_constant = || Error::NotIntegerConstant { span: expr.span() };

        match expr {
            Expr::Literal(Literal::Int(lit, _)) => Ok(lit.value as i64),
            Expr::Literal(Literal::Char(value, _)) => Ok(*value),
            Expr::Ident(ident) => match self.symbols.lookup(&ident.name).map(|s| &s.kind) {
                Some(SymbolKind::EnumConstant(value)) => Ok(*value),
                _ => Err(not_constant()),
            },
            Expr::Unary { op, operand, .. } => {
                let value = self.eval_const(operand)?;
                match op {
                    UnaryOp::Neg => Ok(value.wrapping_neg()),
                    UnaryOp::Plus => Ok(value),
                    UnaryOp::Not => Ok((value == 0) as i64),
                    UnaryOp::BitNot => Ok(!value),
                    _ => Err(not_constant()),
                }
            }
            // Short-circuit: `0 && 1 / 0` is a constant
            Expr::Binary {
                op: op @ (BinOp::And | BinOp::Or),
                left,
                right,
                ..
            } => {
                let l = self.eval_const(left)? != 0;
                if l == (*op == BinOp::Or) {
                    return Ok(l as i64);
                }
                Ok((self.eval_const(right)? != 0) as i64)
            }
            Expr::Binary { op, left, right, span } => {
                let l = self.eval_const(left)?;
                let r = self.eval_const(right)?;
                Ok(match op {
                    BinOp::Add => l.wrapping_add(r),
                    BinOp::Sub => l.wrapping_sub(r),
                    BinOp::Mul => l.wrapping_mul(r),
                    BinOp::Div | BinOp::Mod if r == 0 => return Err(Error::NotIntegerConstant { span: *span }),
                    BinOp::Div => l.wrapping_div(r),
                    BinOp::Mod => l.wrapping_rem(r),
                    BinOp::Shl => l.wrapping_shl(r as u32),
                    BinOp::Shr => l.wrapping_shr(r as u32),
                    BinOp::BitAnd => l & r,
                    BinOp::BitOr => l | r,
                    BinOp::BitXor => l ^ r,
                    BinOp::Eq => (l == r) as i64,
                    BinOp::Ne => (l != r) as i64,
                    BinOp::Lt => (l < r) as i64,
                    BinOp::Le => (l <= r) as i64,
                    BinOp::Gt => (l > r) as i64,
                    BinOp::Ge => (l >= r) as i64,
                    BinOp::And => (l != 0 && r != 0) as i64,
                    BinOp::Or => (l != 0 || r != 0) as i64,
                })
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_const(cond)? != 0 {
                    self.eval_const(then_expr)
                } else {
                    self.eval_const(else_expr)
                }
            }
            Expr::Cast { ty, expr: inner, .. } => {
                let target = self.resolve_type(ty)?;
                if !target.is_integer() {
                    return Err(not_constant());
                }
                let value = self.eval_const(inner)?;
                Ok(truncate_to(value, &target))
            }
            Expr::SizeofType { ty, span } => {
                let ty = self.resolve_type(ty)?;
                Ok(self.size_of(&ty, *span)? as i64)
            }
            Expr::SizeofExpr { expr: inner, span } => {
                let ty = self.check_expr(inner)?;
                Ok(self.size_of(&ty, *span)? as i64)
            }
            _ => Err(not_constant()),
        }
    }
}

// ==================== Helpers ====================

/// Both pointers, with compatible pointees
fn pointees_compatible(a: &CType, b: &CType) -> bool {
    match (a.pointee(), b.pointee()) {
        (Some(x), Some(y)) => compatible_unqualified(x, y),
        _ => false,
    }
}

/// Shapes that may form a null pointer constant
fn is_null_candidate(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(Literal::Int(..) | Literal::Char(..)) | Expr::Ident(_) => true,
        Expr::Cast { expr, .. } => is_null_candidate(expr),
        Expr::Unary { op, operand, .. } => op.is_arithmetic() && is_null_candidate(operand),
        Expr::Binary { left, right, .. } => is_null_candidate(left) && is_null_candidate(right),
        _ => false,
    }
}

/// Convert a constant to an integer type by truncation and sign extension
fn truncate_to(value: i64, ty: &CType) -> i64 {
    let (bits, signed) = match ty.kind {
        TypeKind::Bool => return (value != 0) as i64,
        TypeKind::Int { rank, signed } => (rank.size() * 8, signed),
        _ => return value,
    };
    if bits >= 64 {
        return value;
    }
    let masked = value & ((1i64 << bits) - 1);
    if signed && masked & (1i64 << (bits - 1)) != 0 {
        masked - (1i64 << bits)
    } else {
        masked
    }
}

/// Type of a literal
pub fn literal_type(lit: &Literal) -> CType {
    match lit {
        Literal::Int(value, _) => int_literal_type(value),
        Literal::Float(value, _) => match value.suffix {
            FloatSuffix::None => CType::double(),
            FloatSuffix::Float => CType::float(),
            FloatSuffix::Long => CType::new(TypeKind::Float(FloatKind::LongDouble)),
        },
        Literal::Char(..) => CType::int(),
        Literal::String(text, _) => CType::array_of(CType::char(), Some(text.chars().count() as u64 + 1)),
    }
}

/// First type of the C99 candidate list that holds the value. Decimal
/// literals without `u` stay signed; octal and hex may go unsigned.
pub fn int_literal_type(lit: &IntLiteral) -> CType {
    let ranks: &[IntRank] = match lit.long_count {
        0 => &[IntRank::Int, IntRank::Long, IntRank::LongLong],
        1 => &[IntRank::Long, IntRank::LongLong],
        _ => &[IntRank::LongLong],
    };
    let decimal = lit.radix == Radix::Decimal;

    let mut candidates = Vec::with_capacity(ranks.len() * 2);
    for &rank in ranks {
        if !lit.unsigned {
            candidates.push(CType::integer(rank, true));
        }
        if lit.unsigned || !decimal {
            candidates.push(CType::integer(rank, false));
        }
    }
    candidates
        .into_iter()
        .find(|ty| ty.max_value().map_or(false, |max| lit.value <= max))
        .unwrap_or_else(|| CType::integer(IntRank::LongLong, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::types::Qualifiers;
    use crate::frontend::parser::Parser;
    use pretty_assertions::assert_eq;

    fn analyzer_for(decls: &str) -> SemanticAnalyzer {
        let mut parser = Parser::new(Lexer::new(decls)).expect("lexing failed");
        let unit = parser.parse_translation_unit().expect("parsing failed");
        let mut analyzer = SemanticAnalyzer::default();
        analyzer.analyze(&unit).expect("declarations should check");
        analyzer
    }

    fn parse_expr(source: &str) -> Expr {
        Parser::new(Lexer::new(source))
            .expect("lexing failed")
            .parse_expr()
            .expect("parsing failed")
    }

    fn type_of(decls: &str, expr: &str) -> Result<CType> {
        analyzer_for(decls).check_expr(&parse_expr(expr))
    }

    fn eval(decls: &str, expr: &str) -> Result<i64> {
        analyzer_for(decls).eval_const(&parse_expr(expr))
    }

    fn message(result: Result<CType>) -> String {
        result.expect_err("expected a type error").to_string()
    }

    const SCALARS: &str = "int i; unsigned u; float f; long l; char c; double d;";
    const POINTERS: &str = "int *p; int *q; int a[4]; void *v; double *dp; int i;";

    #[test]
    fn test_arithmetic_conversions() {
        assert_eq!(type_of(SCALARS, "i + f").unwrap(), CType::float());
        assert_eq!(type_of(SCALARS, "l + i").unwrap(), CType::long());
        assert_eq!(type_of(SCALARS, "c + c").unwrap(), CType::int());
        assert_eq!(type_of(SCALARS, "u + i").unwrap(), CType::uint());
        assert_eq!(type_of(SCALARS, "u + l").unwrap(), CType::long());
        assert_eq!(type_of(SCALARS, "f * d").unwrap(), CType::double());
        assert_eq!(type_of(SCALARS, "c << l").unwrap(), CType::int());
        assert_eq!(type_of(SCALARS, "i < f").unwrap(), CType::int());
        assert_eq!(type_of(SCALARS, "d && i").unwrap(), CType::int());
        assert_eq!(
            message(type_of(SCALARS, "d % i")),
            "invalid operands to '%' ('double' and 'int')"
        );
        assert!(type_of(SCALARS, "f & 1").is_err());
    }

    #[test]
    fn test_pointer_arithmetic() {
        let int_ptr = CType::pointer_to(CType::int());
        assert_eq!(type_of(POINTERS, "p + 1").unwrap(), int_ptr);
        assert_eq!(type_of(POINTERS, "1 + p").unwrap(), int_ptr);
        assert_eq!(type_of(POINTERS, "a + 2").unwrap(), int_ptr);
        assert_eq!(type_of(POINTERS, "p - 1").unwrap(), int_ptr);
        assert_eq!(type_of(POINTERS, "p - q").unwrap(), CType::long());
        assert_eq!(
            message(type_of(POINTERS, "p - dp")),
            "invalid operands to '-' ('int *' and 'double *')"
        );
        assert!(type_of(POINTERS, "p + q").is_err());
        assert!(type_of(POINTERS, "v + 1").is_err());
    }

    #[test]
    fn test_pointer_comparisons() {
        assert_eq!(type_of(POINTERS, "p == q").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "p == v").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "p != 0").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "0 == p").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "p < q").unwrap(), CType::int());
        assert!(type_of(POINTERS, "p < dp").is_err());
        assert!(type_of(POINTERS, "p == dp").is_err());
        assert!(type_of(POINTERS, "p == 1").is_err());
        assert!(type_of(POINTERS, "p == i").is_err());
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(type_of(SCALARS, "-c").unwrap(), CType::int());
        assert_eq!(type_of(SCALARS, "~l").unwrap(), CType::long());
        assert_eq!(type_of(SCALARS, "!d").unwrap(), CType::int());
        assert_eq!(type_of(SCALARS, "&i").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(type_of(SCALARS, "i++").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "*p").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "--p").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(
            message(type_of(SCALARS, "~f")),
            "invalid operand to unary '~' ('float')"
        );
        assert!(type_of(SCALARS, "*i").is_err());
        assert!(type_of(POINTERS, "*v").is_err());
        assert_eq!(message(type_of(SCALARS, "&3")), "expression is not assignable (not an lvalue)");
    }

    #[test]
    fn test_subscripts() {
        assert_eq!(type_of(POINTERS, "a[1]").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "1[a]").unwrap(), CType::int());
        assert_eq!(type_of(POINTERS, "&a[1]").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(
            message(type_of(POINTERS, "i[2]")),
            "subscripted value of type 'int' is not an array or pointer"
        );
    }

    #[test]
    fn test_assignment() {
        let decls = "const int k = 1; int x; int *p; int a[3]; double d;";
        assert_eq!(type_of(decls, "x = 2.5").unwrap(), CType::int());
        assert_eq!(type_of(decls, "p = 0").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(type_of(decls, "x += d").unwrap(), CType::int());
        assert_eq!(type_of(decls, "p += 1").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(
            message(type_of(decls, "k = 2")),
            "assignment to read-only location of type 'const int'"
        );
        assert_eq!(message(type_of(decls, "a = p")), "expression is not assignable (not an lvalue)");
        assert_eq!(message(type_of(decls, "3 = x")), "expression is not assignable (not an lvalue)");
        assert_eq!(message(type_of(decls, "p = x")), "incompatible types: expected 'int *', got 'int'");
        assert!(type_of(decls, "p *= 2").is_err());
        assert!(type_of(decls, "k++").is_err());

        let decls = "const int k = 1; int *p; const int *cp; char *s; const char *cs; void *v;";
        assert_eq!(type_of(decls, "cp = p").unwrap(), CType::pointer_to(CType::int().with_quals(Qualifiers::constant())));
        assert!(type_of(decls, "cp = &k").is_ok());
        assert_eq!(message(type_of(decls, "p = &k")), "incompatible types: expected 'int *', got 'const int *'");
        assert_eq!(message(type_of(decls, "s = cs")), "incompatible types: expected 'char *', got 'const char *'");
        assert!(type_of(decls, "v = cs").is_err());
        assert!(type_of(decls, "strlen(cs)").is_ok());
        assert_eq!(
            message(type_of(decls, "strcpy(cs, s)")),
            "argument 1 of 'strcpy': expected 'char *', got 'const char *'"
        );
    }

    #[test]
    fn test_calls() {
        let decls = "int add(int a, int b); int old(); int n; int (*fp)(int, int);";
        assert_eq!(type_of(decls, "add(1, 2)").unwrap(), CType::int());
        assert_eq!(type_of(decls, "fp(1, 2)").unwrap(), CType::int());
        assert_eq!(type_of(decls, "(*fp)(1, 2)").unwrap(), CType::int());
        assert_eq!(type_of(decls, "old(1, 2, 3)").unwrap(), CType::int());
        assert_eq!(
            message(type_of(decls, "add(1)")),
            "wrong number of arguments to 'add': expected 2, got 1"
        );
        assert!(type_of(decls, "add(1, 2, 3)").is_err());
        assert_eq!(
            message(type_of(decls, "add(1, \"two\")")),
            "argument 2 of 'add': expected 'int', got 'char *'"
        );
        assert_eq!(message(type_of(decls, "n(1)")), "called object of type 'int' is not a function");
        assert_eq!(message(type_of(decls, "missing(1)")), "undefined identifier 'missing'");
    }

    #[test]
    fn test_builtin_calls() {
        let mut analyzer = analyzer_for("char buf[16];");
        let ty = analyzer.check_expr(&parse_expr("strlen(\"abc\")")).unwrap();
        assert_eq!(ty, CType::ulong());
        assert_eq!(
            analyzer.check_expr(&parse_expr("printf(\"%d %s\", 1, buf)")).unwrap(),
            CType::int()
        );
        let ids: Vec<u16> = analyzer.builtin_calls().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0x0010, 0x0030]);

        assert_eq!(
            message(analyzer.check_expr(&parse_expr("printf()"))),
            "wrong number of arguments to 'printf': expected at least 1, got 0"
        );
        assert_eq!(
            message(analyzer.check_expr(&parse_expr("sqrt(buf)"))),
            "argument 1 of 'sqrt': expected 'double', got 'char *'"
        );
    }

    #[test]
    fn test_user_declarations_shadow_builtins() {
        let mut analyzer = analyzer_for("long strlen(int x);");
        let ty = analyzer.check_expr(&parse_expr("strlen(3)")).unwrap();
        assert_eq!(ty, CType::long());
        assert!(analyzer.builtin_calls().is_empty());
    }

    #[test]
    fn test_casts() {
        let decls = "int i; long l; double d; struct S { int x; } s;";
        assert_eq!(type_of(decls, "(double)i").unwrap(), CType::double());
        assert_eq!(type_of(decls, "(int *)l").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(type_of(decls, "(void)i").unwrap(), CType::void());
        assert_eq!(type_of(decls, "(const int)d").unwrap(), CType::int());
        assert_eq!(message(type_of(decls, "(int)s")), "invalid cast from 'struct S' to 'int'");
        assert!(type_of(decls, "(int *)d").is_err());
    }

    #[test]
    fn test_member_access() {
        let decls = "struct P { int x; double y; } pt, *pp; const struct P cp; int i;";
        assert_eq!(type_of(decls, "pt.y").unwrap(), CType::double());
        assert_eq!(type_of(decls, "pp->x").unwrap(), CType::int());
        assert_eq!(type_of(decls, "(&pt)->x").unwrap(), CType::int());
        assert_eq!(message(type_of(decls, "pt.z")), "no member named 'z' in 'struct P'");
        assert_eq!(message(type_of(decls, "i.x")), "member access on non-record type 'int'");
        assert!(type_of(decls, "pt->x").is_err());
        assert_eq!(
            message(type_of(decls, "cp.x = 1")),
            "assignment to read-only location of type 'const int'"
        );
        assert!(type_of(decls, "pp->x = 1").is_ok());
    }

    #[test]
    fn test_conditional() {
        assert_eq!(type_of(POINTERS, "i ? 1 : 2.0").unwrap(), CType::double());
        assert_eq!(type_of(POINTERS, "i ? p : 0").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(type_of(POINTERS, "i ? p : q").unwrap(), CType::pointer_to(CType::int()));
        assert_eq!(type_of(POINTERS, "i ? p : v").unwrap(), CType::void_ptr());
        assert_eq!(message(type_of(POINTERS, "i ? p : dp")), "incompatible types: expected 'int *', got 'double *'");
    }

    #[test]
    fn test_literals_and_sizeof() {
        assert_eq!(type_of("", "\"abc\"").unwrap(), CType::array_of(CType::char(), Some(4)));
        assert_eq!(type_of("", "'a'").unwrap(), CType::int());
        assert_eq!(type_of("", "1.5f").unwrap(), CType::float());
        assert_eq!(type_of("", "sizeof(int)").unwrap(), CType::ulong());
        assert_eq!(type_of("", "(1, 2.0)").unwrap(), CType::double());
        assert_eq!(message(type_of("", "sizeof(struct Q)")), "incomplete type 'struct Q'");
    }

    #[test]
    fn test_constant_evaluation() {
        let decls = "enum color { RED, GREEN, BLUE = 10 }; struct P { char c; int i; }; int x;";
        assert_eq!(eval(decls, "1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval(decls, "(1 << 4) | 1").unwrap(), 17);
        assert_eq!(eval(decls, "-7 / 2").unwrap(), -3);
        assert_eq!(eval(decls, "BLUE + GREEN").unwrap(), 11);
        assert_eq!(eval(decls, "RED ? 5 : 6").unwrap(), 6);
        assert_eq!(eval(decls, "sizeof(struct P)").unwrap(), 8);
        assert_eq!(eval(decls, "sizeof \"abc\"").unwrap(), 4);
        assert_eq!(eval(decls, "(char)300").unwrap(), 44);
        assert_eq!(eval(decls, "(unsigned char)-1").unwrap(), 255);
        assert_eq!(eval(decls, "0 && 1 / 0").unwrap(), 0);
        assert_eq!(eval(decls, "'A' + 1").unwrap(), 66);
        assert!(eval(decls, "10 / 0").is_err());
        assert!(eval(decls, "x + 1").is_err());
        assert!(eval(decls, "(double)1").is_err());
    }

    #[test]
    fn test_int_literal_types() {
        let lit = |value, radix, unsigned, long_count| IntLiteral {
            value,
            radix,
            unsigned,
            long_count,
        };
        assert_eq!(int_literal_type(&lit(2147483647, Radix::Decimal, false, 0)), CType::int());
        assert_eq!(int_literal_type(&lit(2147483648, Radix::Decimal, false, 0)), CType::long());
        assert_eq!(int_literal_type(&lit(0xFFFF_FFFF, Radix::Hex, false, 0)), CType::uint());
        assert_eq!(int_literal_type(&lit(1, Radix::Decimal, true, 1)), CType::ulong());
        assert_eq!(int_literal_type(&lit(7, Radix::Octal, false, 2)), CType::integer(IntRank::LongLong, true));
        assert_eq!(int_literal_type(&lit(u64::MAX, Radix::Hex, false, 0)), CType::ulong());
        assert_eq!(
            int_literal_type(&lit(u64::MAX, Radix::Decimal, false, 0)),
            CType::integer(IntRank::LongLong, false)
        );
    }
}
