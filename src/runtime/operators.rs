use std::cmp::Ordering;

use super::{Eval, Interpreter};
use crate::{
    ast::{BinaryOp, Expr, UnaryOp},
    diagnostics::{Diagnostic, SourceSpan},
    error_code::ErrorCode,
    value::{MAX_SEQUENCE_LEN, Value, ValueKind},
};

fn unsupported(op: BinaryOp, left: &Value, right: &Value, span: SourceSpan) -> Diagnostic {
    Diagnostic::new(
        ErrorCode::E0203,
        format!(
            "unsupported operand types for `{}`: {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
    .with_span(span)
}

fn overflow(op: &str, span: SourceSpan) -> Diagnostic {
    Diagnostic::new(ErrorCode::E0304, format!("integer overflow in `{op}`")).with_span(span)
}

fn is_zero(value: &Value) -> bool {
    match value.kind() {
        ValueKind::Int(n) => *n == 0,
        ValueKind::Float(f) => *f == 0.0,
        _ => false,
    }
}

impl Interpreter {
    /// `and` / `or` stop after the left operand when it decides the result.
    pub(super) fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: SourceSpan,
    ) -> Eval<Value> {
        match op {
            BinaryOp::And => {
                if !self.evaluate(left)?.is_truthy() {
                    return Ok(Value::bool(false));
                }
                Ok(Value::bool(self.evaluate(right)?.is_truthy()))
            }
            BinaryOp::Or => {
                if self.evaluate(left)?.is_truthy() {
                    return Ok(Value::bool(true));
                }
                Ok(Value::bool(self.evaluate(right)?.is_truthy()))
            }
            _ => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(op, &left, &right, span)
            }
        }
    }
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value, span: SourceSpan) -> Eval<Value> {
    let ordered = |accept: fn(Ordering) -> bool| -> Eval<Value> {
        let ordering = compare(op, left, right, span)?;
        Ok(Value::bool(ordering.is_some_and(accept)))
    };
    match op {
        BinaryOp::Add => add(left, right, span),
        BinaryOp::Sub => numeric(op, left, right, span, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => multiply(left, right, span),
        BinaryOp::Div => divide(left, right, span),
        BinaryOp::Mod => remainder(left, right, span),
        BinaryOp::Equal => Ok(Value::bool(left.equals(right))),
        BinaryOp::NotEqual => Ok(Value::bool(!left.equals(right))),
        BinaryOp::Less => ordered(Ordering::is_lt),
        BinaryOp::LessEqual => ordered(Ordering::is_le),
        BinaryOp::Greater => ordered(Ordering::is_gt),
        BinaryOp::GreaterEqual => ordered(Ordering::is_ge),
        BinaryOp::And => Ok(Value::bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::bool(left.is_truthy() || right.is_truthy())),
    }
}

fn numeric(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: SourceSpan,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Eval<Value> {
    if let (ValueKind::Int(a), ValueKind::Int(b)) = (left.kind(), right.kind()) {
        return int_op(*a, *b)
            .map(Value::int)
            .ok_or_else(|| overflow(op.symbol(), span));
    }
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok(Value::float(float_op(a, b))),
        _ => Err(unsupported(op, left, right, span)),
    }
}

fn add(left: &Value, right: &Value, span: SourceSpan) -> Eval<Value> {
    match (left.kind(), right.kind()) {
        (ValueKind::String(a), ValueKind::String(b)) => Ok(Value::string(format!("{a}{b}"))),
        (ValueKind::List(a), ValueKind::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        _ => numeric(BinaryOp::Add, left, right, span, i64::checked_add, |a, b| a + b),
    }
}

fn multiply(left: &Value, right: &Value, span: SourceSpan) -> Eval<Value> {
    match (left.kind(), right.kind()) {
        (ValueKind::String(text), ValueKind::Int(count))
        | (ValueKind::Int(count), ValueKind::String(text)) => {
            let count = usize::try_from(*count).unwrap_or(0);
            match text.len().checked_mul(count) {
                Some(size) if size <= MAX_SEQUENCE_LEN => Ok(Value::string(text.repeat(count))),
                _ => Err(Diagnostic::new(
                    ErrorCode::E0502,
                    format!("repeated string would exceed {MAX_SEQUENCE_LEN} bytes"),
                )
                .with_span(span)),
            }
        }
        _ => numeric(BinaryOp::Mul, left, right, span, i64::checked_mul, |a, b| a * b),
    }
}

/// Int / Int stays Int when the division is exact, otherwise Float.
fn divide(left: &Value, right: &Value, span: SourceSpan) -> Eval<Value> {
    if left.as_number().is_some() && is_zero(right) {
        return Err(Diagnostic::new(ErrorCode::E0301, "division by zero").with_span(span));
    }
    if let (ValueKind::Int(a), ValueKind::Int(b)) = (left.kind(), right.kind()) {
        return match a.checked_rem(*b) {
            Some(0) => a.checked_div(*b).map(Value::int).ok_or_else(|| overflow("/", span)),
            Some(_) => Ok(Value::float(*a as f64 / *b as f64)),
            None => Err(overflow("/", span)),
        };
    }
    numeric(BinaryOp::Div, left, right, span, i64::checked_div, |a, b| a / b)
}

fn remainder(left: &Value, right: &Value, span: SourceSpan) -> Eval<Value> {
    if left.as_number().is_some() && is_zero(right) {
        return Err(Diagnostic::new(ErrorCode::E0301, "modulo by zero").with_span(span));
    }
    numeric(BinaryOp::Mod, left, right, span, i64::checked_rem, |a, b| a % b)
}

fn compare(op: BinaryOp, left: &Value, right: &Value, span: SourceSpan) -> Eval<Option<Ordering>> {
    match (left.kind(), right.kind()) {
        (ValueKind::Int(a), ValueKind::Int(b)) => Ok(Some(a.cmp(b))),
        (ValueKind::String(a), ValueKind::String(b)) => Ok(Some(a.cmp(b))),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(unsupported(op, left, right, span)),
        },
    }
}

pub(crate) fn unary(op: UnaryOp, value: &Value, span: SourceSpan) -> Eval<Value> {
    match op {
        UnaryOp::Negate => match value.kind() {
            ValueKind::Int(n) => n.checked_neg().map(Value::int).ok_or_else(|| overflow("-", span)),
            ValueKind::Float(n) => Ok(Value::float(-n)),
            _ => Err(Diagnostic::new(
                ErrorCode::E0203,
                format!("unsupported operand type for unary `-`: {}", value.type_name()),
            )
            .with_span(span)),
        },
        UnaryOp::Not => Ok(Value::bool(!value.is_truthy())),
    }
}
