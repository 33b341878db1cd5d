//! Arithmetic shared by `int`, `bool`, `float` and `complex`.
//!
//! Operands are widened to the larger of the two kinds (int < float < complex) before
//! the operation, the way mixed arithmetic works for the builtin numbers.

use std::cmp::Ordering;

use num_integer::Integer;

use crate::{
    dunder::{BinaryOp, CompareOp, UnaryOp},
    exception::{ExcType, RunResult},
    types::Complex,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
    Complex(f64, f64),
}

fn overflow() -> crate::exception::Exception {
    ExcType::overflow_error("integer result does not fit in 64 bits")
}

impl Number {
    /// Reads a number out of an `int`, `bool`, `float` or `complex` value.
    pub fn of(value: &Value) -> Option<Self> {
        if let Some(int) = value.as_int() {
            Some(Self::Int(int))
        } else if let Some(float) = value.as_float() {
            Some(Self::Float(float))
        } else {
            value
                .downcast_ref::<Complex>()
                .map(|complex| Self::Complex(complex.real, complex.imag))
        }
    }

    fn widen(self, other: Self) -> (Self, Self) {
        match (self, other) {
            (Self::Int(a), Self::Float(_)) => (Self::Float(a as f64), other),
            (Self::Float(_), Self::Int(b)) => (self, Self::Float(b as f64)),
            (Self::Int(a), Self::Complex(..)) => (Self::Complex(a as f64, 0.0), other),
            (Self::Float(a), Self::Complex(..)) => (Self::Complex(a, 0.0), other),
            (Self::Complex(..), Self::Int(b)) => (self, Self::Complex(b as f64, 0.0)),
            (Self::Complex(..), Self::Float(b)) => (self, Self::Complex(b, 0.0)),
            _ => (self, other),
        }
    }

    /// `self <op> other`; `None` when the operator doesn't apply to these kinds.
    pub fn binary(self, op: BinaryOp, other: Self) -> RunResult<Option<Value>> {
        match self.widen(other) {
            (Self::Int(a), Self::Int(b)) => int_binary(a, op, b),
            (Self::Float(a), Self::Float(b)) => float_binary(a, op, b),
            (Self::Complex(ar, ai), Self::Complex(br, bi)) => complex_binary((ar, ai), op, (br, bi)),
            _ => Ok(None),
        }
    }

    /// `self <op> other`; `None` when the kinds can't be ordered.
    pub fn compare(self, op: CompareOp, other: Self) -> Option<bool> {
        let ordering = match self.widen(other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (Self::Complex(ar, ai), Self::Complex(br, bi)) => {
                let equal = ar == br && ai == bi;
                return match op {
                    CompareOp::Eq => Some(equal),
                    CompareOp::Ne => Some(!equal),
                    _ => None,
                };
            }
            _ => return None,
        };
        match ordering {
            Some(ordering) => Some(op.matches(ordering)),
            // NaN compares false with everything, except for !=
            None => Some(op == CompareOp::Ne),
        }
    }

    pub fn unary(self, op: UnaryOp, type_name: &str) -> RunResult<Value> {
        match (self, op) {
            (Self::Int(a), UnaryOp::Neg) => Ok(Value::int(a.checked_neg().ok_or_else(overflow)?)),
            (Self::Int(a), UnaryOp::Pos) => Ok(Value::int(a)),
            (Self::Int(a), UnaryOp::Abs) => Ok(Value::int(a.checked_abs().ok_or_else(overflow)?)),
            (Self::Int(a), UnaryOp::Invert) => Ok(Value::int(!a)),
            (Self::Float(a), UnaryOp::Neg) => Ok(Value::float(-a)),
            (Self::Float(a), UnaryOp::Pos) => Ok(Value::float(a)),
            (Self::Float(a), UnaryOp::Abs) => Ok(Value::float(a.abs())),
            (Self::Complex(r, i), UnaryOp::Neg) => Ok(Value::complex(-r, -i)),
            (Self::Complex(r, i), UnaryOp::Pos) => Ok(Value::complex(r, i)),
            (Self::Complex(r, i), UnaryOp::Abs) => Ok(Value::float(r.hypot(i))),
            (_, UnaryOp::Invert) => Err(ExcType::type_error_unsupported_unary(op.symbol(), type_name)),
        }
    }
}

fn int_binary(a: i64, op: BinaryOp, b: i64) -> RunResult<Option<Value>> {
    let result = match op {
        BinaryOp::Add => Value::int(a.checked_add(b).ok_or_else(overflow)?),
        BinaryOp::Sub => Value::int(a.checked_sub(b).ok_or_else(overflow)?),
        BinaryOp::Mul => Value::int(a.checked_mul(b).ok_or_else(overflow)?),
        BinaryOp::TrueDiv => {
            if b == 0 {
                return Err(ExcType::zero_division("division by zero"));
            }
            Value::float(a as f64 / b as f64)
        }
        BinaryOp::FloorDiv => Value::int(floor_div(a, b)?),
        BinaryOp::Mod => Value::int(floor_mod(a, b)?),
        BinaryOp::DivMod => Value::tuple([Value::int(floor_div(a, b)?), Value::int(floor_mod(a, b)?)]),
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exp) => Value::int(a.checked_pow(exp).ok_or_else(overflow)?),
            Err(_) if b < 0 => {
                if a == 0 {
                    return Err(ExcType::zero_division("0.0 cannot be raised to a negative power"));
                }
                Value::float((a as f64).powf(b as f64))
            }
            Err(_) => return Err(overflow()),
        },
        BinaryOp::LShift => {
            let shift = shift_count(b)?;
            if a == 0 {
                Value::int(0)
            } else {
                let shifted = a.checked_shl(shift).filter(|r| r >> shift == a).ok_or_else(overflow)?;
                Value::int(shifted)
            }
        }
        BinaryOp::RShift => {
            let shift = shift_count(b)?;
            Value::int(a.checked_shr(shift).unwrap_or(if a < 0 { -1 } else { 0 }))
        }
        BinaryOp::And => Value::int(a & b),
        BinaryOp::Xor => Value::int(a ^ b),
        BinaryOp::Or => Value::int(a | b),
        BinaryOp::MatMul => return Ok(None),
    };
    Ok(Some(result))
}

fn shift_count(b: i64) -> RunResult<u32> {
    if b < 0 {
        return Err(ExcType::value_error("negative shift count"));
    }
    Ok(u32::try_from(b).unwrap_or(u32::MAX))
}

fn floor_div(a: i64, b: i64) -> RunResult<i64> {
    if b == 0 {
        return Err(ExcType::zero_division("integer division or modulo by zero"));
    }
    if a == i64::MIN && b == -1 {
        return Err(overflow());
    }
    Ok(Integer::div_floor(&a, &b))
}

fn floor_mod(a: i64, b: i64) -> RunResult<i64> {
    match b {
        0 => Err(ExcType::zero_division("integer modulo by zero")),
        -1 => Ok(0),
        _ => Ok(a.mod_floor(&b)),
    }
}

/// Float modulo with the sign of the divisor.
fn float_mod(a: f64, b: f64) -> f64 {
    let remainder = a % b;
    if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
        remainder + b
    } else {
        remainder
    }
}

fn float_binary(a: f64, op: BinaryOp, b: f64) -> RunResult<Option<Value>> {
    let result = match op {
        BinaryOp::Add => Value::float(a + b),
        BinaryOp::Sub => Value::float(a - b),
        BinaryOp::Mul => Value::float(a * b),
        BinaryOp::TrueDiv => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float division by zero"));
            }
            Value::float(a / b)
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float floor division by zero"));
            }
            Value::float((a / b).floor())
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float modulo by zero"));
            }
            Value::float(float_mod(a, b))
        }
        BinaryOp::DivMod => {
            if b == 0.0 {
                return Err(ExcType::zero_division("float divmod()"));
            }
            let remainder = float_mod(a, b);
            Value::tuple([Value::float(((a - remainder) / b).round()), Value::float(remainder)])
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ExcType::zero_division("0.0 cannot be raised to a negative power"));
            }
            if a < 0.0 && b.fract() != 0.0 {
                // a negative base with a fractional exponent has a complex result
                let magnitude = (-a).powf(b);
                let angle = std::f64::consts::PI * b;
                Value::complex(magnitude * angle.cos(), magnitude * angle.sin())
            } else {
                Value::float(a.powf(b))
            }
        }
        BinaryOp::MatMul
        | BinaryOp::LShift
        | BinaryOp::RShift
        | BinaryOp::And
        | BinaryOp::Xor
        | BinaryOp::Or => return Ok(None),
    };
    Ok(Some(result))
}

fn complex_binary(a: (f64, f64), op: BinaryOp, b: (f64, f64)) -> RunResult<Option<Value>> {
    let (ar, ai) = a;
    let (br, bi) = b;
    let result = match op {
        BinaryOp::Add => Value::complex(ar + br, ai + bi),
        BinaryOp::Sub => Value::complex(ar - br, ai - bi),
        BinaryOp::Mul => Value::complex(ar * br - ai * bi, ar * bi + ai * br),
        BinaryOp::TrueDiv => {
            let denominator = br * br + bi * bi;
            if denominator == 0.0 {
                return Err(ExcType::zero_division("complex division by zero"));
            }
            Value::complex(
                (ar * br + ai * bi) / denominator,
                (ai * br - ar * bi) / denominator,
            )
        }
        BinaryOp::Pow => {
            if ar == 0.0 && ai == 0.0 {
                return match (br.partial_cmp(&0.0), bi == 0.0) {
                    (Some(Ordering::Equal), true) => Ok(Some(Value::complex(1.0, 0.0))),
                    (Some(Ordering::Greater), true) => Ok(Some(Value::complex(0.0, 0.0))),
                    _ => Err(ExcType::zero_division("0.0 to a negative or complex power")),
                };
            }
            // exp(b * ln(a))
            let log_magnitude = ar.hypot(ai).ln();
            let angle = ai.atan2(ar);
            let real = br * log_magnitude - bi * angle;
            let imag = bi * log_magnitude + br * angle;
            let scale = real.exp();
            Value::complex(scale * imag.cos(), scale * imag.sin())
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_op(a: i64, op: BinaryOp, b: i64) -> RunResult<Option<Value>> {
        Number::Int(a).binary(op, Number::Int(b))
    }

    #[test]
    fn floor_semantics_follow_the_divisor_sign() {
        assert_eq!(int_op(-7, BinaryOp::FloorDiv, 2).unwrap().unwrap().as_int(), Some(-4));
        assert_eq!(int_op(-7, BinaryOp::Mod, 2).unwrap().unwrap().as_int(), Some(1));
        assert_eq!(int_op(7, BinaryOp::Mod, -2).unwrap().unwrap().as_int(), Some(-1));
        let r = Number::Float(-7.5).binary(BinaryOp::Mod, Number::Float(2.0)).unwrap().unwrap();
        assert_eq!(r.as_float(), Some(0.5));
    }

    #[test]
    fn division_by_zero() {
        let err = int_op(1, BinaryOp::FloorDiv, 0).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ZeroDivisionError);
        let err = int_op(1, BinaryOp::TrueDiv, 0).unwrap_err();
        assert_eq!(err.arg(), Some("division by zero"));
    }

    #[test]
    fn overflow_is_an_error() {
        let err = int_op(i64::MAX, BinaryOp::Add, 1).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::OverflowError);
        let err = int_op(1, BinaryOp::LShift, 70).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::OverflowError);
    }

    #[test]
    fn mixed_kinds_widen() {
        let r = Number::Int(1).binary(BinaryOp::Add, Number::Float(0.5)).unwrap().unwrap();
        assert_eq!(r.as_float(), Some(1.5));
        assert_eq!(int_op(2, BinaryOp::Pow, -1).unwrap().unwrap().as_float(), Some(0.5));
        assert_eq!(int_op(1, BinaryOp::MatMul, 1).unwrap(), None);
    }

    #[test]
    fn nan_is_unordered() {
        let nan = Number::Float(f64::NAN);
        assert_eq!(nan.compare(CompareOp::Eq, nan), Some(false));
        assert_eq!(nan.compare(CompareOp::Ne, nan), Some(true));
        assert_eq!(Number::Complex(1.0, 1.0).compare(CompareOp::Lt, Number::Int(1)), None);
    }
}
