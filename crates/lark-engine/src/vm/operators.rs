//! Operator semantics.
//!
//! Every operator is total: operands of the wrong type never fail, they
//! produce a fixed fallback (`0` for arithmetic, `false` for comparisons).

use crate::runtime::value::Value;

/// `==`: same-typed scalars compare by value, `null` equals `null`.
///
/// Containers and functions are never equal to anything, themselves
/// included.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// `!=`: one case analysis, so exactly one result is pushed.
pub fn not_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => false,
        (Value::Null, _) | (_, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a != b,
        (Value::Number(a), Value::Number(b)) => a != b,
        (Value::String(a), Value::String(b)) => a != b,
        _ => false,
    }
}

/// Ordering comparisons are defined on numbers only.
pub fn compare<F>(a: &Value, b: &Value, op: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => op(*a, *b),
        _ => false,
    }
}

/// `+` adds numbers and concatenates strings.
pub fn add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::String(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
        _ => Value::Number(0.0),
    }
}

/// Applies a numeric operator, falling back to `0`.
pub fn arithmetic<F>(a: &Value, b: &Value, op: F) -> Value
where
    F: Fn(f64, f64) -> f64,
{
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Value::Number(op(*a, *b)),
        _ => Value::Number(0.0),
    }
}

/// `/` with division by zero yielding `0`.
pub fn divide(a: f64, b: f64) -> f64 {
    if b == 0.0 { 0.0 } else { a / b }
}

/// `%` with a zero divisor yielding the dividend.
pub fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 { a } else { a % b }
}

/// Unary `+`.
pub fn absolute(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.abs()),
        _ => Value::Number(0.0),
    }
}

/// Unary `-`.
pub fn reverse_sign(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        _ => Value::Number(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn s(text: &str) -> Value {
        Value::from(text)
    }

    #[test]
    fn test_equals_same_types() {
        assert!(equals(&Value::Null, &Value::Null));
        assert!(equals(&num(1.0), &num(1.0)));
        assert!(equals(&s("a"), &s("a")));
        assert!(equals(&Value::Boolean(true), &Value::Boolean(true)));
        assert!(!equals(&num(1.0), &num(2.0)));
    }

    #[test]
    fn test_equals_mixed_types_is_false() {
        assert!(!equals(&num(1.0), &s("1")));
        assert!(!equals(&Value::Null, &Value::Boolean(false)));
        assert!(!equals(&num(0.0), &Value::Boolean(false)));
    }

    #[test]
    fn test_not_equals_null_cases() {
        assert!(!not_equals(&Value::Null, &Value::Null));
        assert!(not_equals(&Value::Null, &num(1.0)));
        assert!(not_equals(&s("x"), &Value::Null));
    }

    #[test]
    fn test_not_equals_scalars() {
        assert!(not_equals(&num(1.0), &num(2.0)));
        assert!(!not_equals(&s("a"), &s("a")));
        assert!(not_equals(&Value::Boolean(true), &Value::Boolean(false)));
    }

    #[test]
    fn test_not_equals_mismatch_is_false() {
        assert!(!not_equals(&num(1.0), &s("1")));
        assert!(!not_equals(&Value::Boolean(true), &num(1.0)));
    }

    #[test]
    fn test_compare_numbers_only() {
        assert!(compare(&num(1.0), &num(2.0), |a, b| a < b));
        assert!(!compare(&s("a"), &s("b"), |a, b| a < b));
        assert!(!compare(&Value::Null, &num(2.0), |a, b| a <= b));
    }

    #[test]
    fn test_add() {
        assert_eq!(add(&num(2.0), &num(3.0)), num(5.0));
        assert_eq!(add(&s("ab"), &s("cd")), s("abcd"));
        assert_eq!(add(&s("a"), &num(1.0)), num(0.0));
        assert_eq!(add(&Value::Null, &Value::Null), num(0.0));
    }

    #[test]
    fn test_arithmetic_fallback() {
        assert_eq!(arithmetic(&num(6.0), &num(2.0), |a, b| a * b), num(12.0));
        assert_eq!(arithmetic(&s("6"), &num(2.0), |a, b| a - b), num(0.0));
    }

    #[test]
    fn test_divide_and_modulo_by_zero() {
        assert_eq!(divide(5.0, 0.0), 0.0);
        assert_eq!(divide(5.0, 2.0), 2.5);
        assert_eq!(modulo(5.0, 0.0), 5.0);
        assert_eq!(modulo(5.0, 3.0), 2.0);
        assert_eq!(modulo(-5.0, 3.0), -2.0);
    }

    #[test]
    fn test_unary() {
        assert_eq!(absolute(&num(-3.0)), num(3.0));
        assert_eq!(reverse_sign(&num(3.0)), num(-3.0));
        assert_eq!(absolute(&s("x")), num(0.0));
        assert_eq!(reverse_sign(&Value::Null), num(0.0));
    }
}
