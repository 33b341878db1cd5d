use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, RunResult},
    format::{float_repr, format_float},
    ops, py_hash,
    types::{PyTrait, TypeRef, builtins, int::numeric_slots, number::Number},
    value::Value,
};

pub(crate) const FLOAT_SLOTS: &[Dunder] = numeric_slots!(
    Floordiv, Mod, Divmod, Rfloordiv, Rmod, Rdivmod, Round, Trunc, Floor, Ceil,
);

/// A `float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Float(pub f64);

/// Truncates toward an int, refusing NaN and the infinities.
fn to_int(value: f64) -> RunResult<i64> {
    if value.is_nan() {
        return Err(ExcType::value_error("cannot convert float NaN to integer"));
    }
    if value.is_infinite() {
        return Err(ExcType::overflow_error("cannot convert float infinity to integer"));
    }
    #[expect(clippy::cast_possible_truncation, reason = "range checked below")]
    let truncated = value as i64;
    if (truncated as f64 - value).abs() >= 1.0 {
        return Err(ExcType::overflow_error("float does not fit in a 64-bit int"));
    }
    Ok(truncated)
}

impl PyTrait for Float {
    fn py_type(&self) -> TypeRef {
        builtins().float.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(float_repr(self.0))
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        Ok(format_float(self.0, spec)?)
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(Number::of(other).and_then(|other| Number::Float(self.0).compare(op, other).map(Value::bool)))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_float(self.0))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(self.0 != 0.0)
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match Number::of(other) {
            Some(other) => Number::Float(self.0).binary(op, other),
            None => Ok(None),
        }
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match Number::of(other) {
            Some(other) => other.binary(op, Number::Float(self.0)),
            None => Ok(None),
        }
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        Number::Float(self.0).unary(op, "float")
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        match conversion {
            Conversion::Int | Conversion::Trunc => Ok(Value::int(to_int(self.0)?)),
            Conversion::Floor => Ok(Value::int(to_int(self.0.floor())?)),
            Conversion::Ceil => Ok(Value::int(to_int(self.0.ceil())?)),
            Conversion::Float => Ok(Value::float(self.0)),
            Conversion::Complex => Ok(Value::complex(self.0, 0.0)),
            Conversion::Index | Conversion::Oct | Conversion::Hex => {
                Err(ops::conversion_error(conversion, &self.py_type()))
            }
        }
    }

    fn py_round(&self, ndigits: Option<i64>) -> RunResult<Value> {
        let Some(ndigits) = ndigits else {
            return Ok(Value::int(to_int(self.0.round_ties_even())?));
        };
        if !self.0.is_finite() {
            return Ok(Value::float(self.0));
        }
        let scale = 10f64.powi(i32::try_from(ndigits.clamp(-400, 400)).unwrap_or_default());
        if scale == 0.0 {
            return Ok(Value::float(0.0_f64.copysign(self.0)));
        }
        let rounded = (self.0 * scale).round_ties_even() / scale;
        // a scale this large means the value is already exact at that precision
        Ok(Value::float(if rounded.is_finite() { rounded } else { self.0 }))
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        Ok(match Number::of(other) {
            Some(Number::Int(other)) => Some((Value::float(self.0), Value::float(other as f64))),
            Some(Number::Float(_)) => Some((Value::float(self.0), other.clone())),
            Some(Number::Complex(..)) => Some((Value::complex(self.0, 0.0), other.clone())),
            None => None,
        })
    }
}

/// Parses a float literal the way `float(text)` does.
pub(crate) fn parse_float(text: &str) -> RunResult<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let unsigned = lowered.trim_start_matches(['+', '-']);
    let negative = lowered.starts_with('-');
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(value) = special
        && lowered.len() - unsigned.len() <= 1
    {
        return Ok(if negative { -value } else { value });
    }
    let valid = !trimmed.is_empty()
        && !trimmed.contains("__")
        && !trimmed.starts_with('_')
        && !trimmed.ends_with('_');
    let cleaned: String = trimmed.chars().filter(|c| *c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if valid => Ok(value),
        _ => Err(ExcType::value_error(format!("could not convert string to float: '{text}'"))),
    }
}

/// `float()` and `float(x)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    let Some(value) = args.get_zero_one_arg("float")? else {
        return Ok(Value::float(0.0));
    };
    if let Some(text) = value.as_str() {
        return Ok(Value::float(parse_float(text)?));
    }
    if let Some(int) = value.as_int() {
        return Ok(Value::float(int as f64));
    }
    Ok(Value::float(ops::float(&value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!(parse_float(" 1.5 ").unwrap(), 1.5);
        assert_eq!(parse_float("-inf").unwrap(), f64::NEG_INFINITY);
        assert!(parse_float("nan").unwrap().is_nan());
        assert!(parse_float("1.5x").is_err());
        assert!(parse_float("--inf").is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(Float(2.7).py_convert(Conversion::Int).unwrap().as_int(), Some(2));
        assert_eq!(Float(-2.5).py_convert(Conversion::Floor).unwrap().as_int(), Some(-3));
        let err = Float(f64::NAN).py_convert(Conversion::Int).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ValueError);
        assert_eq!(Float(2.5).py_round(None).unwrap().as_int(), Some(2));
        assert_eq!(Float(1.25).py_round(Some(1)).unwrap().as_float(), Some(1.2));
    }

    #[test]
    fn repr_matches_shortest_form() {
        assert_eq!(Float(1.0).py_repr().unwrap(), "1.0");
        assert_eq!(Float(0.1).py_repr().unwrap(), "0.1");
    }
}
