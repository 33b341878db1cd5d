//! A file-like object over a Rust writer.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use surrogate::{ArgValues, ClassBuilder, ExcType, Exception, RunResult, Value, ops};

pub fn os_error(err: io::Error) -> Exception {
    Exception::new_msg(ExcType::OSError, err)
}

/// The bytes of a `write()` argument: `bytes` as is, `str` as UTF-8.
pub fn payload(data: &Value) -> RunResult<Vec<u8>> {
    if let Some(bytes) = data.as_bytes() {
        return Ok(bytes.to_vec());
    }
    if let Some(text) = data.as_str() {
        return Ok(text.as_bytes().to_vec());
    }
    Err(Exception::new_msg(
        ExcType::TypeError,
        format!("a bytes-like object or str is required, not '{}'", data.type_name()),
    ))
}

/// An object with `write(data)` and `flush()` methods backed by `writer`.
pub fn sink(writer: impl Write + Send + 'static) -> RunResult<Value> {
    let writer = Arc::new(Mutex::new(writer));
    let flushed = Arc::clone(&writer);
    let class = ClassBuilder::new("Sink")
        .method("write", move |_, args| {
            let data = payload(&args.get_one_arg("write")?)?;
            writer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write_all(&data)
                .map_err(os_error)?;
            Ok(Value::int(i64::try_from(data.len()).unwrap_or(i64::MAX)))
        })
        .method("flush", move |_, args| {
            args.check_zero_args("flush")?;
            flushed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush()
                .map_err(os_error)?;
            Ok(Value::none())
        })
        .build()?;
    ops::call(&class.to_value()?, ArgValues::Empty)
}
