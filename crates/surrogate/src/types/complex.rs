use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Conversion, Dunder, UnaryOp},
    exception::{ExcType, RunResult},
    format::float_repr,
    ops, py_hash,
    types::{PyTrait, TypeRef, builtins, int::numeric_slots, number::Number},
    value::Value,
};

pub(crate) const COMPLEX_SLOTS: &[Dunder] = numeric_slots!();

/// A `complex` number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub real: f64,
    pub imag: f64,
}

/// A component without the trailing `.0` floats carry.
fn component(value: f64) -> String {
    let repr = float_repr(value);
    match repr.strip_suffix(".0") {
        Some(short) => short.to_owned(),
        None => repr,
    }
}

impl Complex {
    fn number(self) -> Number {
        Number::Complex(self.real, self.imag)
    }
}

impl PyTrait for Complex {
    fn py_type(&self) -> TypeRef {
        builtins().complex.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        let imag = component(self.imag);
        if self.real == 0.0 && self.real.is_sign_positive() {
            return Ok(format!("{imag}j"));
        }
        let sign = if imag.starts_with('-') { "" } else { "+" };
        Ok(format!("({}{sign}{imag}j)", component(self.real)))
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(Number::of(other).and_then(|other| self.number().compare(op, other).map(Value::bool)))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_complex(self.real, self.imag))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(self.real != 0.0 || self.imag != 0.0)
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match Number::of(other) {
            Some(other) => self.number().binary(op, other),
            None => Ok(None),
        }
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match Number::of(other) {
            Some(other) => other.binary(op, self.number()),
            None => Ok(None),
        }
    }

    fn py_unary(&self, op: UnaryOp) -> RunResult<Value> {
        self.number().unary(op, "complex")
    }

    fn py_convert(&self, conversion: Conversion) -> RunResult<Value> {
        match conversion {
            Conversion::Complex => Ok(Value::complex(self.real, self.imag)),
            _ => Err(ops::conversion_error(conversion, &self.py_type())),
        }
    }

    fn py_getattr(&self, this: &Value, name: &str) -> RunResult<Value> {
        match name {
            "real" => Ok(Value::float(self.real)),
            "imag" => Ok(Value::float(self.imag)),
            _ => ops::generic_getattr(this, name),
        }
    }

    fn py_coerce(&self, other: &Value) -> RunResult<Option<(Value, Value)>> {
        Ok(match Number::of(other) {
            Some(Number::Int(value)) => Some((Value::complex(self.real, self.imag), Value::complex(value as f64, 0.0))),
            Some(Number::Float(value)) => Some((Value::complex(self.real, self.imag), Value::complex(value, 0.0))),
            Some(Number::Complex(..)) => Some((Value::complex(self.real, self.imag), other.clone())),
            None => None,
        })
    }
}

fn part(value: &Value, which: &str) -> RunResult<(f64, f64)> {
    match Number::of(value) {
        Some(Number::Int(int)) => Ok((int as f64, 0.0)),
        Some(Number::Float(float)) => Ok((float, 0.0)),
        Some(Number::Complex(real, imag)) => Ok((real, imag)),
        None => Err(ExcType::type_error(format!(
            "complex() {which} must be a number, not '{}'",
            value.type_name()
        ))),
    }
}

/// `complex(real=0, imag=0)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    let (positional, _) = args.into_parts();
    if positional.len() > 2 {
        return Err(ExcType::type_error_at_most("complex", 2, positional.len()));
    }
    let mut parts = positional.iter();
    let (a_real, a_imag) = match parts.next() {
        Some(value) => part(value, "first argument")?,
        None => (0.0, 0.0),
    };
    let (b_real, b_imag) = match parts.next() {
        Some(value) => part(value, "second argument")?,
        None => (0.0, 0.0),
    };
    // complex(a, b) is a + b*1j
    Ok(Value::complex(a_real - b_imag, a_imag + b_real))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_drops_integral_fractions() {
        assert_eq!(ops::repr(&Value::complex(1.0, 2.0)).unwrap(), "(1+2j)");
        assert_eq!(ops::repr(&Value::complex(0.0, 1.5)).unwrap(), "1.5j");
        assert_eq!(ops::repr(&Value::complex(1.5, -0.5)).unwrap(), "(1.5-0.5j)");
    }

    #[test]
    fn arithmetic_and_equality() {
        let product = ops::mul(&Value::complex(0.0, 1.0), &Value::complex(0.0, 1.0)).unwrap();
        assert!(ops::eq(&product, &Value::int(-1)).unwrap());
        let err = ops::lt(&product, &Value::int(0)).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }
}
