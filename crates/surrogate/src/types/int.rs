//! `int` and `bool`.

use num_integer::Integer;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, RunResult},
    format::format_int,
    ops, py_hash,
    types::{PyTrait, TypeRef, builtins, number::Number},
    value::Value,
};

/// Special methods shared by the numeric types.
macro_rules! numeric_slots {
    ($($extra:ident),* $(,)?) => {
        &[
            Dunder::Repr,
            Dunder::Str,
            Dunder::Format,
            Dunder::Lt,
            Dunder::Le,
            Dunder::Eq,
            Dunder::Ne,
            Dunder::Gt,
            Dunder::Ge,
            Dunder::Hash,
            Dunder::Bool,
            Dunder::Add,
            Dunder::Sub,
            Dunder::Mul,
            Dunder::Truediv,
            Dunder::Pow,
            Dunder::Radd,
            Dunder::Rsub,
            Dunder::Rmul,
            Dunder::Rtruediv,
            Dunder::Rpow,
            Dunder::Neg,
            Dunder::Pos,
            Dunder::Abs,
            Dunder::Complex,
            Dunder::Int,
            Dunder::Float,
            Dunder::Coerce,
            $(Dunder::$extra,)*
        ]
    };
}
pub(crate) use numeric_slots;

pub(crate) const INT_SLOTS: &[Dunder] = numeric_slots!(
    Floordiv, Mod, Divmod, Lshift, Rshift, And, Xor, Or, Rfloordiv, Rmod, Rdivmod, Rlshift, Rrshift, Rand, Rxor,
    Ror, Invert, Index, Round, Trunc, Floor, Ceil, Oct, Hex,
);

pub(crate) const BOOL_SLOTS: &[Dunder] = &[Dunder::Repr, Dunder::And, Dunder::Or, Dunder::Xor, Dunder::Rand, Dunder::Ror, Dunder::Rxor];

/// An `int`, limited to 64 bits. Results that don't fit raise `OverflowError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int(pub i64);

/// `True` or `False`. Use [`Value::bool`] to get the shared singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bool(pub bool);

fn compare(value: i64, op: CompareOp, other: &Value) -> Option<Value> {
    let other = Number::of(other)?;
    Number::Int(value).compare(op, other).map(Value::bool)
}

fn binary(value: i64, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
    match Number::of(other) {
        Some(other) => Number::Int(value).binary(op, other),
        None => Ok(None),
    }
}

fn reflected(value: i64, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
    match Number::of(other) {
        Some(other) => other.binary(op, Number::Int(value)),
        None => Ok(None),
    }
}

fn radix(value: i64, prefix: &str, digits: impl Fn(u64) -> String) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{sign}{prefix}{}", digits(value.unsigned_abs()))
}

fn convert(value: i64, conversion: Conversion) -> Value {
    match conversion {
        Conversion::Int | Conversion::Index | Conversion::Trunc | Conversion::Floor | Conversion::Ceil => {
            Value::int(value)
        }
        Conversion::Float => Value::float(value as f64),
        Conversion::Complex => Value::complex(value as f64, 0.0),
        Conversion::Oct => Value::str(radix(value, "0o", |d| format!("{d:o}"))),
        Conversion::Hex => Value::str(radix(value, "0x", |d| format!("{d:x}"))),
    }
}

/// `round(value, ndigits)`, rounding half to even at the requested power of ten.
fn round(value: i64, ndigits: Option<i64>) -> RunResult<Value> {
    let Some(ndigits) = ndigits.filter(|n| *n < 0) else {
        return Ok(Value::int(value));
    };
    let Some(unit) = u32::try_from(-ndigits).ok().and_then(|exp| 10i64.checked_pow(exp)) else {
        return Ok(Value::int(0));
    };
    let (quotient, remainder) = value.div_mod_floor(&unit);
    let twice = i128::from(remainder) * 2;
    let quotient = if twice > i128::from(unit) || (twice == i128::from(unit) && quotient.is_odd()) {
        quotient + 1
    } else {
        quotient
    };
    quotient
        .checked_mul(unit)
        .map(Value::int)
        .ok_or_else(|| ExcType::overflow_error("rounded int does not fit in 64 bits"))
}

fn coerce(value: i64, other: &Value) -> Option<(Value, Value)> {
    match Number::of(other)? {
        Number::Int(other) => Some((Value::int(value), Value::int(other))),
        Number::Float(other) => Some((Value::float(value as f64), Value::float(other))),
        Number::Complex(..) => Some((Value::complex(value as f64, 0.0), other.clone())),
    }
}

impl PyTrait for Int {
    fn py_type(&self) -> TypeRef {
        builtins().int.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(self.0.to_string())
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        Ok(format_int(self.0, spec)?)
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(compare(self.0, op, other))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_int(self.0))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(self.0 != 0)
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        binary(self.0, op, other)
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        reflected(self.0, op, other)
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        Number::Int(self.0).unary(op, "int")
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        Ok(convert(self.0, conversion))
    }

    fn py_round(&self, ndigits: Option<i64>) -> RunResult<Value> {
        round(self.0, ndigits)
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        Ok(coerce(self.0, other))
    }
}

impl PyTrait for Bool {
    fn py_type(&self) -> TypeRef {
        builtins().bool.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(if self.0 { "True" } else { "False" }.to_owned())
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        if spec.is_empty() {
            self.py_repr()
        } else {
            Ok(format_int(i64::from(self.0), spec)?)
        }
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(compare(i64::from(self.0), op, other))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(i64::from(self.0))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(self.0)
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        if let Some(other) = other.as_bool() {
            match op {
                BinaryOp::And => return Ok(Some(Value::bool(self.0 & other))),
                BinaryOp::Or => return Ok(Some(Value::bool(self.0 | other))),
                BinaryOp::Xor => return Ok(Some(Value::bool(self.0 ^ other))),
                _ => {}
            }
        }
        binary(i64::from(self.0), op, other)
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        if let Some(other) = other.as_bool() {
            return Value::bool(other).py_binary(op, &Value::bool(self.0));
        }
        reflected(i64::from(self.0), op, other)
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        Number::Int(i64::from(self.0)).unary(op, "bool")
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        Ok(convert(i64::from(self.0), conversion))
    }

    fn py_round(&self, ndigits: Option<i64>) -> RunResult<Value> {
        round(i64::from(self.0), ndigits)
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        Ok(coerce(i64::from(self.0), other))
    }
}

/// Parses an int literal the way `int(text, base)` does.
pub(crate) fn parse_int(text: &str, base: u32) -> RunResult<i64> {
    let invalid = || ExcType::value_error(format!("invalid literal for int() with base {base}: '{text}'"));
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let prefix = match base {
        16 => Some(["0x", "0X"]),
        8 => Some(["0o", "0O"]),
        2 => Some(["0b", "0B"]),
        _ => None,
    };
    let digits = prefix
        .and_then(|prefixes| prefixes.iter().find_map(|p| digits.strip_prefix(p)))
        .unwrap_or(digits);
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = u64::from_str_radix(&cleaned, base).map_err(|_| invalid())?;
    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };
    value.ok_or_else(|| ExcType::overflow_error("int literal does not fit in 64 bits"))
}

/// `int()`, `int(x)` and `int(text, base)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    if args.count() == 2 {
        let (text, base) = args.get_two_args("int")?;
        let base = u32::try_from(ops::index(&base)?)
            .ok()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| ExcType::value_error("int() base must be >= 2 and <= 36"))?;
        let text = text
            .as_str()
            .ok_or_else(|| ExcType::type_error("int() can't convert non-string with explicit base"))?;
        return Ok(Value::int(parse_int(text, base)?));
    }
    let Some(value) = args.get_zero_one_arg("int")? else {
        return Ok(Value::int(0));
    };
    if let Some(text) = value.as_str() {
        return Ok(Value::int(parse_int(text, 10)?));
    }
    if let Some(int) = value.as_int() {
        return Ok(Value::int(int));
    }
    match ops::int(&value) {
        Ok(int) => Ok(Value::int(int)),
        Err(exc) if exc.is_instance_of(ExcType::TypeError) => Ok(Value::int(ops::index(&value)?)),
        Err(exc) => Err(exc),
    }
}

/// `bool(x)`.
pub(crate) fn construct_bool(args: ArgValues) -> RunResult<Value> {
    match args.get_zero_one_arg("bool")? {
        Some(value) => Ok(Value::bool(ops::truthy(&value)?)),
        None => Ok(Value::bool(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!(parse_int(" -42 ", 10).unwrap(), -42);
        assert_eq!(parse_int("1_000", 10).unwrap(), 1000);
        assert_eq!(parse_int("0xff", 16).unwrap(), 255);
        assert!(parse_int("12a", 10).is_err());
        assert!(parse_int("_1", 10).is_err());
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round(25, Some(-1)).unwrap().as_int(), Some(20));
        assert_eq!(round(35, Some(-1)).unwrap().as_int(), Some(40));
        assert_eq!(round(-25, Some(-1)).unwrap().as_int(), Some(-20));
        assert_eq!(round(7, Some(2)).unwrap().as_int(), Some(7));
    }

    #[test]
    fn bool_bitwise_stays_bool() {
        let t = Value::bool(true);
        let r = ops::binary(&t, BinaryOp::And, &Value::bool(false)).unwrap();
        assert!(r.is(&Value::bool(false)));
        let r = ops::add(&t, &t).unwrap();
        assert_eq!(r.as_int(), Some(2));
        assert_eq!(ops::repr(&r).unwrap(), "2");
    }

    #[test]
    fn radix_conversions() {
        assert_eq!(convert(-8, Conversion::Oct).as_str(), Some("-0o10"));
        assert_eq!(convert(255, Conversion::Hex).as_str(), Some("0xff"));
    }
}
