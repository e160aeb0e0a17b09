//! Arithmetic and concatenation on runtime values

use super::error::{InterpResult, RuntimeError};
use super::value::{parse_number, Value};

/// `+`: numeric sum when both sides are numbers, concatenation otherwise
///
/// Tuples broadcast the operation over their items.
pub fn add(left: Value, right: Value) -> InterpResult<Value> {
    combine('+', left, right)
}

/// `-`, `*` or `/` with tuple broadcasting
pub fn arith(op: char, left: Value, right: Value) -> InterpResult<Value> {
    combine(op, left, right)
}

fn combine(op: char, left: Value, right: Value) -> InterpResult<Value> {
    match (left, right) {
        (Value::Tuple(items), right) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(combine(op, item, right.clone())?);
            }
            Ok(Value::Tuple(out))
        }
        (left, Value::Tuple(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(combine(op, left.clone(), item)?);
            }
            Ok(Value::Tuple(out))
        }
        (left, right) if op == '+' => Ok(sum_scalars(left, right)),
        (left, right) => {
            let a = expect_number(&left)?;
            let b = expect_number(&right)?;
            let n = match op {
                '-' => a.wrapping_sub(b),
                '*' => a.wrapping_mul(b),
                _ => {
                    if b == 0 {
                        return Err(RuntimeError::division_by_zero());
                    }
                    a.wrapping_div(b)
                }
            };
            Ok(Value::Number(n))
        }
    }
}

fn sum_scalars(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a.wrapping_add(b)),
        (Value::String(mut a), Value::String(b)) => {
            a.push_str(&b);
            Value::String(a)
        }
        (Value::Number(a), Value::String(b)) => match parse_number(&b) {
            Some(b) => Value::Number(a.wrapping_add(b)),
            None => Value::String(format!("{a}{b}")),
        },
        (Value::String(a), Value::Number(b)) => match parse_number(&a) {
            Some(a) => Value::Number(a.wrapping_add(b)),
            None => Value::String(format!("{a}{b}")),
        },
        (left, right) => Value::String(left.into_text() + &right.into_text()),
    }
}

/// `MOD` on two numbers
pub fn modulo(left: i64, right: i64) -> InterpResult<i64> {
    if right == 0 {
        return Err(RuntimeError::division_by_zero());
    }
    Ok(left.wrapping_rem(right))
}

/// `&`: tuples merge, scalars concatenate as text
pub fn append(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Value::Tuple(a)
        }
        (Value::Tuple(mut a), scalar) => {
            a.push(scalar);
            Value::Tuple(a)
        }
        (scalar, Value::Tuple(b)) => {
            let mut items = Vec::with_capacity(b.len() + 1);
            items.push(scalar);
            items.extend(b);
            Value::Tuple(items)
        }
        (left, right) => Value::String(left.into_text() + &right.into_text()),
    }
}

/// Numeric view of a value or TYPEMISMATCH
pub fn expect_number(value: &Value) -> InterpResult<i64> {
    value
        .to_number()
        .ok_or_else(|| RuntimeError::type_mismatch("number", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::error::ErrorKind;

    #[test]
    fn test_add_rules() {
        assert_eq!(add(Value::Number(2), Value::Number(3)).unwrap(), Value::Number(5));
        assert_eq!(add(Value::from("ab"), Value::from("cd")).unwrap(), Value::from("abcd"));
        assert_eq!(add(Value::Number(2), Value::from("3")).unwrap(), Value::Number(5));
        assert_eq!(add(Value::Number(2), Value::from("x")).unwrap(), Value::from("2x"));
        assert_eq!(add(Value::from("x"), Value::Number(2)).unwrap(), Value::from("x2"));
        // two numeric strings still concatenate
        assert_eq!(add(Value::from("1"), Value::from("2")).unwrap(), Value::from("12"));
    }

    #[test]
    fn test_tuple_broadcast() {
        let t = Value::Tuple(vec![Value::Number(1), Value::Number(2)]);
        assert_eq!(
            arith('*', t.clone(), Value::Number(3)).unwrap(),
            Value::Tuple(vec![Value::Number(3), Value::Number(6)])
        );
        assert_eq!(
            add(Value::Number(10), t).unwrap(),
            Value::Tuple(vec![Value::Number(11), Value::Number(12)])
        );
    }

    #[test]
    fn test_arith_errors() {
        assert_eq!(arith('/', Value::Number(5), Value::Number(0)).unwrap_err().kind, ErrorKind::DivByZero);
        assert_eq!(arith('-', Value::from("a"), Value::Number(1)).unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(modulo(5, 0).unwrap_err().kind, ErrorKind::DivByZero);
        assert_eq!(modulo(7, 3).unwrap(), 1);
        assert_eq!(arith('*', Value::Number(i64::MAX), Value::Number(2)).unwrap(), Value::Number(-2));
    }

    #[test]
    fn test_append() {
        assert_eq!(append(Value::Number(1), Value::from("a")), Value::from("1a"));
        assert_eq!(
            append(Value::Tuple(vec![Value::Number(1)]), Value::Number(2)),
            Value::Tuple(vec![Value::Number(1), Value::Number(2)])
        );
        assert_eq!(
            append(Value::from("x"), Value::Tuple(vec![Value::Number(2)])),
            Value::Tuple(vec![Value::from("x"), Value::Number(2)])
        );
    }
}
