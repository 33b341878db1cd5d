//! `str`, with the handful of methods the proxy layers and their users lean on.

use std::cmp::Ordering;

use crate::{
    args::ArgValues,
    dunder::{BinaryOp, CompareOp, Dunder},
    exception::{ExcType, RunResult},
    format::format_str,
    ops, py_hash,
    types::{PyIterator, PyTrait, TypeRef, builtins, function::NativeFn, native},
    value::Value,
};

pub(crate) const STR_SLOTS: &[Dunder] = &[
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
    Dunder::Len,
    Dunder::Getitem,
    Dunder::Iter,
    Dunder::Contains,
    Dunder::Add,
    Dunder::Mul,
    Dunder::Rmul,
];

/// An immutable `str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str(String);

impl Str {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Quotes `text` the way `repr()` does: single quotes unless the text contains a single
/// quote and no double quote.
pub(crate) fn quote(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = u32::from(c);
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else {
                    out.push_str(&format!("\\u{code:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Resolves a possibly negative index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize, type_name: &str) -> RunResult<usize> {
    let len_i = i64::try_from(len).map_err(|_| ExcType::overflow_error("sequence too long"))?;
    let resolved = if index < 0 { index + len_i } else { index };
    usize::try_from(resolved)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| ExcType::index_error(type_name))
}

/// Repeat count for `seq * n`, negative counts meaning empty.
pub(crate) fn repeat_count(value: &Value) -> Option<usize> {
    value.as_int().map(|n| usize::try_from(n).unwrap_or(0))
}

/// Longest sequence a repetition may build.
const MAX_REPEAT_LEN: usize = u32::MAX as usize;

/// Length of `seq * count` for a sequence of `len` items, if it can be built.
pub(crate) fn repeat_len(len: usize, count: usize, what: &str) -> RunResult<usize> {
    let total = len
        .checked_mul(count)
        .ok_or_else(|| ExcType::overflow_error(format!("repeated {what} is too long")))?;
    if total > MAX_REPEAT_LEN {
        return Err(ExcType::memory_error(format!("repeated {what} is too long")));
    }
    Ok(total)
}

/// `items * count` for item sequences.
pub(crate) fn repeat_items(items: &[Value], count: usize, what: &str) -> RunResult<Vec<Value>> {
    let total = repeat_len(items.len(), count, what)?;
    Ok(items.iter().cloned().cycle().take(total).collect())
}

impl PyTrait for Str {
    fn py_type(&self) -> TypeRef {
        builtins().str.clone()
    }

    fn py_repr(&self) -> RunResult<String> {
        Ok(quote(&self.0))
    }

    fn py_str(&self) -> RunResult<String> {
        Ok(self.0.clone())
    }

    fn py_format(&self, spec: &str) -> RunResult<String> {
        Ok(format_str(&self.0, spec)?)
    }

    fn py_compare(&self, op: CompareOp, other: &Value) -> RunResult<Option<Value>> {
        let Some(other) = other.as_str() else {
            return Ok(None);
        };
        let ordering: Ordering = self.0.as_str().cmp(other);
        Ok(Some(Value::bool(op.matches(ordering))))
    }

    fn py_hash(&self) -> RunResult<i64> {
        Ok(py_hash::hash_str(&self.0))
    }

    fn py_bool(&self) -> RunResult<bool> {
        Ok(!self.0.is_empty())
    }

    fn py_len(&self) -> RunResult<usize> {
        Ok(self.0.chars().count())
    }

    fn py_getitem(&self, key: &Value) -> RunResult<Value> {
        let index = key.as_int().ok_or_else(|| {
            ExcType::type_error(format!("string indices must be integers, not '{}'", key.type_name()))
        })?;
        let position = normalize_index(index, self.0.chars().count(), "string")?;
        let ch = self.0.chars().nth(position).ok_or_else(|| ExcType::index_error("string"))?;
        Ok(Value::str(ch.to_string()))
    }

    fn py_contains(&self, item: &Value) -> RunResult<Option<bool>> {
        match item.as_str() {
            Some(needle) => Ok(Some(self.0.contains(needle))),
            None => Err(ExcType::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                item.type_name()
            ))),
        }
    }

    fn py_iter(&self, _this: &Value) -> RunResult<Value> {
        let chars: Vec<Value> = self.0.chars().map(|ch| Value::str(ch.to_string())).collect();
        Ok(PyIterator::over(chars))
    }

    fn py_binary(&self, op: BinaryOp, other: &Value) -> RunResult<Option<Value>> {
        match op {
            BinaryOp::Add => Ok(other.as_str().map(|other| Value::str(format!("{}{other}", self.0)))),
            BinaryOp::Mul => repeat_count(other)
                .map(|count| repeat_len(self.0.len(), count, "string").map(|_| Value::str(self.0.repeat(count))))
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

/// Builds a `str` method taking the receiver's text and the remaining arguments.
fn method(name: &'static str, body: fn(&str, ArgValues) -> RunResult<Value>) -> (&'static str, NativeFn) {
    let func = native(move |args: ArgValues| {
        let (receiver, rest) = args.split_first(name)?;
        let text = receiver.as_str().ok_or_else(|| {
            ExcType::type_error(format!(
                "descriptor '{name}' for 'str' objects doesn't apply to a '{}' object",
                receiver.type_name()
            ))
        })?;
        body(text, rest)
    });
    (name, func)
}

fn str_arg(value: &Value, method: &str) -> RunResult<String> {
    value.as_str().map(str::to_owned).ok_or_else(|| {
        ExcType::type_error(format!("{method}() argument must be str, not {}", value.type_name()))
    })
}

/// Characters to strip, `None` meaning whitespace.
fn strip_chars(args: ArgValues, method: &str) -> RunResult<Option<Vec<char>>> {
    match args.get_zero_one_arg(method)? {
        Some(chars) if !chars.is_none() => Ok(Some(str_arg(&chars, method)?.chars().collect())),
        _ => Ok(None),
    }
}

/// A `str` prefix or a tuple of alternatives, for `startswith` and `endswith`.
fn affixes(value: &Value, method: &str) -> RunResult<Vec<String>> {
    if let Some(text) = value.as_str() {
        return Ok(vec![text.to_owned()]);
    }
    if value.py_type().is_subclass_of(&builtins().tuple) {
        return ops::collect_strings(value);
    }
    Err(ExcType::type_error(format!(
        "{method} first arg must be str or a tuple of str, not {}",
        value.type_name()
    )))
}

pub(crate) fn methods() -> Vec<(&'static str, NativeFn)> {
    vec![
        method("upper", |text, args| {
            args.check_zero_args("upper")?;
            Ok(Value::str(text.to_uppercase()))
        }),
        method("lower", |text, args| {
            args.check_zero_args("lower")?;
            Ok(Value::str(text.to_lowercase()))
        }),
        method("strip", |text, args| {
            Ok(Value::str(match strip_chars(args, "strip")? {
                Some(chars) => text.trim_matches(chars.as_slice()),
                None => text.trim(),
            }))
        }),
        method("lstrip", |text, args| {
            Ok(Value::str(match strip_chars(args, "lstrip")? {
                Some(chars) => text.trim_start_matches(chars.as_slice()),
                None => text.trim_start(),
            }))
        }),
        method("rstrip", |text, args| {
            Ok(Value::str(match strip_chars(args, "rstrip")? {
                Some(chars) => text.trim_end_matches(chars.as_slice()),
                None => text.trim_end(),
            }))
        }),
        method("startswith", |text, args| {
            let prefix = affixes(&args.get_one_arg("startswith")?, "startswith")?;
            Ok(Value::bool(prefix.iter().any(|p| text.starts_with(p.as_str()))))
        }),
        method("endswith", |text, args| {
            let suffix = affixes(&args.get_one_arg("endswith")?, "endswith")?;
            Ok(Value::bool(suffix.iter().any(|s| text.ends_with(s.as_str()))))
        }),
        method("join", |text, args| {
            let parts = ops::collect_strings(&args.get_one_arg("join")?)?;
            Ok(Value::str(parts.join(text)))
        }),
        method("split", |text, args| {
            let parts: Vec<Value> = match args.get_zero_one_arg("split")? {
                Some(sep) if !sep.is_none() => {
                    let sep = str_arg(&sep, "split")?;
                    if sep.is_empty() {
                        return Err(ExcType::value_error("empty separator"));
                    }
                    text.split(sep.as_str()).map(Value::str).collect()
                }
                _ => text.split_whitespace().map(Value::str).collect(),
            };
            Ok(Value::list(parts))
        }),
        method("replace", |text, args| {
            let (old, new) = args.get_two_args("replace")?;
            Ok(Value::str(text.replace(&str_arg(&old, "replace")?, &str_arg(&new, "replace")?)))
        }),
        method("find", |text, args| {
            let needle = str_arg(&args.get_one_arg("find")?, "find")?;
            match text.find(needle.as_str()) {
                Some(byte) => ops::int_from_usize(text[..byte].chars().count()),
                None => Ok(Value::int(-1)),
            }
        }),
        method("count", |text, args| {
            let needle = str_arg(&args.get_one_arg("count")?, "count")?;
            if needle.is_empty() {
                return ops::int_from_usize(text.chars().count() + 1);
            }
            ops::int_from_usize(text.matches(needle.as_str()).count())
        }),
        method("encode", |text, args| {
            if let Some(encoding) = args.get_zero_one_arg("encode")? {
                let encoding = str_arg(&encoding, "encode")?.to_lowercase().replace('-', "");
                if encoding != "utf8" {
                    return Err(ExcType::value_error(format!("unknown encoding: {encoding}")));
                }
            }
            Ok(Value::bytes(text.as_bytes()))
        }),
        method("format", |text, args| {
            let (positional, kwargs) = args.into_parts();
            Ok(Value::str(format_template(text, &positional, &kwargs)?))
        }),
    ]
}

/// `str.format` over `{}`, `{0}` and `{name}` fields with optional `:spec`.
fn format_template(template: &str, positional: &[Value], kwargs: &crate::args::Kwargs) -> RunResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut auto_index = 0;
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(ExcType::value_error("expected '}' before end of string")),
                    }
                }
                let (name, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let value = if name.is_empty() {
                    let value = positional.get(auto_index);
                    auto_index += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    positional.get(index)
                } else {
                    kwargs.get(name)
                };
                let value = value.ok_or_else(|| {
                    if name.is_empty() || name.parse::<usize>().is_ok() {
                        ExcType::index_error("format argument")
                    } else {
                        ExcType::key_error(quote(name))
                    }
                })?;
                out.push_str(&ops::format(value, spec)?);
            }
            '}' => return Err(ExcType::value_error("Single '}' encountered in format string")),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// `str()`, `str(x)` and `str(bytes, encoding)`.
pub(crate) fn construct(args: ArgValues) -> RunResult<Value> {
    let (positional, _) = args.into_parts();
    match positional.as_slice() {
        [] => Ok(Value::str("")),
        [value] => Ok(Value::str(ops::str(value)?)),
        [value, _encoding] => {
            let bytes = value.as_bytes().ok_or_else(|| {
                ExcType::type_error(format!("decoding to str: need a bytes-like object, {} found", value.type_name()))
            })?;
            String::from_utf8(bytes.to_vec())
                .map(Value::str)
                .map_err(|err| ExcType::value_error(format!("'utf-8' codec can't decode bytes: {err}")))
        }
        _ => Err(ExcType::type_error_at_most("str", 2, positional.len())),
    }
}
