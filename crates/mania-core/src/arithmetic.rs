use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive};

use crate::error::CoreError;
use crate::value::Value;

/// Lossy but adequate for equality/arithmetic widening comparisons
/// against a Float counterpart; BigInts outside f64's range saturate to
/// +/- infinity, which still compares correctly against any finite Float.
pub fn bigint_to_f64(i: &BigInt) -> f64 {
    i.to_f64().unwrap_or_else(|| {
        if i.sign() == num_bigint::Sign::Minus {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    })
}

fn type_err(found: &Value) -> CoreError {
    CoreError::TypeError {
        expected: "integer or float",
        found: found.type_name(),
    }
}

/// Integer stays Integer; mixing with Float widens to Float, per §4.1.
pub fn add(a: &Value, b: &Value) -> Result<Value, CoreError> {
    numeric_binop(a, b, |x, y| x + y, |x, y| x + y)
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, CoreError> {
    numeric_binop(a, b, |x, y| x - y, |x, y| x - y)
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, CoreError> {
    numeric_binop(a, b, |x, y| x * y, |x, y| x * y)
}

/// Division always widens to Float (true division), since a closed
/// Integer result would silently truncate.
pub fn div(a: &Value, b: &Value) -> Result<Value, CoreError> {
    let (x, y) = (as_f64(a)?, as_f64(b)?);
    Ok(Value::Float(x / y))
}

fn numeric_binop(
    a: &Value,
    b: &Value,
    int_op: impl Fn(BigInt, BigInt) -> BigInt,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, CoreError> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(int_op(x.clone(), y.clone()))),
        (Value::Integer(_), Value::Float(_))
        | (Value::Float(_), Value::Integer(_))
        | (Value::Float(_), Value::Float(_)) => {
            Ok(Value::Float(float_op(as_f64(a)?, as_f64(b)?)))
        }
        (other, Value::Integer(_)) | (other, Value::Float(_)) => Err(type_err(other)),
        (_, other) => Err(type_err(other)),
    }
}

fn as_f64(v: &Value) -> Result<f64, CoreError> {
    match v {
        Value::Integer(i) => Ok(bigint_to_f64(i)),
        Value::Float(f) => Ok(*f),
        other => Err(type_err(other)),
    }
}

fn as_bigint(v: &Value) -> Result<&BigInt, CoreError> {
    match v {
        Value::Integer(i) => Ok(i),
        other => Err(type_err(other)),
    }
}

pub fn negate(v: &Value) -> Result<Value, CoreError> {
    match v {
        Value::Integer(i) => Ok(Value::Integer(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(type_err(other)),
    }
}

pub fn modulo(a: &Value, b: &Value) -> Result<Value, CoreError> {
    use num_integer::Integer as _;
    let (x, y) = (as_bigint(a)?, as_bigint(b)?);
    Ok(Value::Integer(x.mod_floor(y)))
}

pub fn remainder(a: &Value, b: &Value) -> Result<Value, CoreError> {
    let (x, y) = (as_bigint(a)?, as_bigint(b)?);
    Ok(Value::Integer(x % y))
}

pub fn pow(a: &Value, b: &Value) -> Result<Value, CoreError> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) if !y.is_negative() => {
            let exp = y.to_u32().ok_or_else(|| {
                CoreError::TypeError {
                    expected: "exponent fitting in u32",
                    found: "integer",
                }
            })?;
            Ok(Value::Integer(Pow::pow(x.clone(), exp)))
        }
        _ => Ok(Value::Float(as_f64(a)?.powf(as_f64(b)?))),
    }
}

pub fn round(v: &Value) -> Result<Value, CoreError> {
    match v {
        Value::Integer(_) => Ok(v.clone()),
        Value::Float(f) => Ok(Value::Float(f.round())),
        other => Err(type_err(other)),
    }
}

pub fn floor(v: &Value) -> Result<Value, CoreError> {
    match v {
        Value::Integer(_) => Ok(v.clone()),
        Value::Float(f) => Ok(Value::Float(f.floor())),
        other => Err(type_err(other)),
    }
}

pub fn ceil(v: &Value) -> Result<Value, CoreError> {
    match v {
        Value::Integer(_) => Ok(v.clone()),
        Value::Float(f) => Ok(Value::Float(f.ceil())),
        other => Err(type_err(other)),
    }
}

pub fn bit_not(v: &Value) -> Result<Value, CoreError> {
    Ok(Value::Integer(!as_bigint(v)?))
}

pub fn bit_and(a: &Value, b: &Value) -> Result<Value, CoreError> {
    Ok(Value::Integer(as_bigint(a)? & as_bigint(b)?))
}

pub fn bit_or(a: &Value, b: &Value) -> Result<Value, CoreError> {
    Ok(Value::Integer(as_bigint(a)? | as_bigint(b)?))
}

pub fn bit_xor(a: &Value, b: &Value) -> Result<Value, CoreError> {
    Ok(Value::Integer(as_bigint(a)? ^ as_bigint(b)?))
}

pub fn bit_shift_left(a: &Value, b: &Value) -> Result<Value, CoreError> {
    let shift = as_bigint(b)?.to_u32().ok_or_else(|| CoreError::TypeError {
        expected: "shift amount fitting in u32",
        found: "integer",
    })?;
    Ok(Value::Integer(as_bigint(a)? << shift as usize))
}

pub fn bit_shift_right(a: &Value, b: &Value) -> Result<Value, CoreError> {
    let shift = as_bigint(b)?.to_u32().ok_or_else(|| CoreError::TypeError {
        expected: "shift amount fitting in u32",
        found: "integer",
    })?;
    Ok(Value::Integer(as_bigint(a)? >> shift as usize))
}

/// Numeric ordering comparison; Integer/Float mix compares by widened
/// value, consistent with `Value`'s own `PartialEq` widening.
pub fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, CoreError> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        _ => as_f64(a)?
            .partial_cmp(&as_f64(b)?)
            .ok_or_else(|| CoreError::TypeError {
                expected: "comparable numbers",
                found: "NaN",
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(add(&Value::int(2), &Value::int(3)).unwrap(), Value::int(5));
        assert_eq!(sub(&Value::int(2), &Value::int(3)).unwrap(), Value::int(-1));
        assert_eq!(mul(&Value::int(2), &Value::int(3)).unwrap(), Value::int(6));
    }

    #[test]
    fn mixing_with_float_widens() {
        assert_eq!(add(&Value::int(2), &Value::Float(1.5)).unwrap(), Value::Float(3.5));
        assert_eq!(add(&Value::Float(1.5), &Value::int(2)).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn add_and_mul_are_commutative() {
        let a = Value::int(7);
        let b = Value::int(13);
        assert_eq!(add(&a, &b).unwrap(), add(&b, &a).unwrap());
        assert_eq!(mul(&a, &b).unwrap(), mul(&b, &a).unwrap());
    }

    #[test]
    fn sub_is_antisymmetric() {
        let a = Value::int(7);
        let b = Value::int(13);
        let ab = sub(&a, &b).unwrap();
        let ba = sub(&b, &a).unwrap();
        assert_eq!(negate(&ab).unwrap(), ba);
    }

    #[test]
    fn division_always_widens_to_float() {
        assert_eq!(div(&Value::int(4), &Value::int(2)).unwrap(), Value::Float(2.0));
    }
}
