use std::{fmt::Write, sync::Arc};

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Dunder},
    exception::{ExcType, RunResult},
    ops, py_hash,
    types::{
        PyIterator, PyTrait, TypeRef, builtins,
        function::NativeFn,
        str::{normalize_index, repeat_count, repeat_len},
    },
    value::Value,
};

pub(crate) const BYTES_SLOTS: &[Dunder] = &[
    Dunder::Repr,
    Dunder::Str,
    Dunder::Lt,
    Dunder::Le,
    Dunder::Eq,
    Dunder::Ne,
    Dunder::Gt,
    Dunder::Ge,
    Dunder::Hash,
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Iter,
    Dunder::Contains,
    Dunder::Add,
    Dunder::Mul,
    Dunder::Rmul,
    Dunder::Bytes,
];

/// An immutable `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    #[must_use]
    pub fn new(value: Vec<u8>) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// `b'...'` with the same quote choice `str` makes.
fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') { b'"' } else { b'\'' };
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(char::from(quote));
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
    out.push(char::from(quote));
    out
}

impl PyTrait for Bytes {
    fn py_type(&self) -> TypeRef {
        builtins().bytes.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(bytes_repr(&self.0))
    }

    fn py_bytes(&self) -> RunResult<Vec<u8>> {
        Ok(self.0.clone())
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        Ok(other
            .as_bytes()
            .map(|other| Value::bool(op.matches(self.0.as_slice().cmp(other)))))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_bytes(&self.0))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(!self.0.is_empty())
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.0.len())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        let index = key.as_int().ok_or_else(|| {
            ExcType::type_error(format!("byte indices must be integers, not '{}'", key.type_name()))
        })?;
        let position = normalize_index(index, self.0.len(), "index")?;
        Ok(Value::int(i64::from(self.0[position])))
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        if let Some(needle) = item.as_bytes() {
            return Ok(Some(needle.is_empty() || self.0.windows(needle.len()).any(|w| w == needle)));
        }
        match item.as_int().and_then(|b| u8::try_from(b).ok()) {
            Some(byte) => Ok(Some(self.0.contains(&byte))),
            None => Err(ExcType::type_error(format!(
                "a bytes-like object is required, not '{}'",
                item.type_name()
            ))),
        }
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        Ok(PyIterator::over(self.0.iter().map(|b| Value::int(i64::from(*b))).collect()))
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Add => Ok(other.as_bytes().map(|other| Value::bytes([self.0.as_slice(), other].concat()))),
            BinaryOp::Mul => repeat_count(other)
                .map(|count| repeat_len(self.0.len(), count, "bytes").map(|_| Value::bytes(self.0.repeat(count))))
                .transpose(),
            _ => Ok(None),
        }
    }

    fn py_reflected(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Mul => self.py_binary(op, other),
            _ => Ok(None),
        }
    }
}

fn receiver(args: ArgValues, name: &str) -> RunResult<(Vec<u8>, ArgValues)> {
    let (receiver, rest) = args.split_first(name)?;
    let bytes = receiver.as_bytes().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor '{name}' for 'bytes' objects doesn't apply to a '{}' object",
            receiver.type_name()
        ))
    })?;
    Ok((bytes.to_vec(), rest))
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    let decode: NativeFn = Arc::new(|args| {
        let (bytes, rest) = receiver(args, "decode")?;
        rest.get_zero_one_arg("decode")?;
        String::from_utf8(bytes)
            .map(Value::str)
            .map_err(|err| ExcType::value_error(format!("'utf-8' codec can't decode bytes: {err}")))
    });
    let hex: NativeFn = Arc::new(|args| {
        let (bytes, rest) = receiver(args, "hex")?;
        rest.check_zero_args("hex")?;
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(out, "{byte:02x}");
        }
        Ok(Value::str(out))
    });
    vec![("decode", decode), ("hex", hex)]
}

/// `bytes()`, `bytes(n)`, `bytes(text, encoding)`, `bytes(iterable_of_ints)` and `bytes(x)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    let (source, encoding) = match args.count() {
        0 => return Ok(Value::bytes(Vec::new())),
        _ => args.get_one_two_args("bytes")?,
    };
    if let Some(text) = source.as_str() {
        if encoding.is_none() {
            return Err(ExcType::type_error("string argument without an encoding"));
        }
        return Ok(Value::bytes(text.as_bytes()));
    }
    if let Some(count) = source.as_int() {
        let count = usize::try_from(count).map_err(|_| ExcType::value_error("negative count"))?;
        return Ok(Value::bytes(vec![0; count]));
    }
    if source.py_type().has_attr(Dunder::Bytes.as_str()) {
        return Ok(Value::bytes(ops::bytes(&source)?));
    }
    let mut out = Vec::new();
    for item in ops::collect(&source)? {
        let byte = ops::index(&item)?;
        out.push(u8::try_from(byte).map_err(|_| ExcType::value_error("bytes must be in range(0, 256)"))?);
    }
    Ok(Value::bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_escapes() {
        assert_eq!(bytes_repr(b"ab"), "b'ab'");
        assert_eq!(bytes_repr(b"\x00\n'"), "b\"\\x00\\n'\"");
    }

    #[test]
    fn decode_and_construct() {
        let value = Value::bytes(b"hi".to_vec());
        let text = ops::call_method(&value, "decode", ArgValues::Empty).unwrap();
        assert_eq!(text.as_str(), Some("hi"));
        let built = construct(ArgValues::One(Value::list(vec![Value::int(104), Value::int(105)]))).unwrap();
        assert_eq!(built.as_bytes(), Some(&b"hi"[..]));
        assert!(construct(ArgValues::One(Value::int(-1))).is_err());
    }
}
