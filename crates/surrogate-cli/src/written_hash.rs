//! `written_hash`: a proxy for file-like objects that hashes everything written.
//!
//! `write` is direct, so it runs on the proxy: it feeds the digest kept in the proxy
//! state, then calls the wrapped object's own `write`. Every other member is forwarded.

use std::{
    fmt::{self, Write as _},
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use clap::ValueEnum;
use sha2::digest::DynDigest;
use surrogate::{ArgValues, ExcType, Exception, Receiver, RunResult, Specialization, Value, ops};

use crate::sink::payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Algorithm {
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    fn hasher(self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Md5 => Box::new(md5::Md5::default()),
            Self::Sha1 => Box::new(sha1::Sha1::default()),
            Self::Sha256 => Box::new(sha2::Sha256::default()),
            Self::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }

    fn from_name(name: &str) -> RunResult<Self> {
        <Self as ValueEnum>::from_str(name, true)
            .map_err(|_| Exception::new_msg(ExcType::ValueError, format!("unsupported hash type {name}")))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        })
    }
}

/// The running digest, stored as a proxy state extension.
pub struct WrittenHash {
    hasher: Mutex<Box<dyn DynDigest + Send>>,
}

impl WrittenHash {
    fn new(algorithm: Algorithm) -> Self {
        Self {
            hasher: Mutex::new(algorithm.hasher()),
        }
    }

    fn update(&self, data: &[u8]) {
        self.hasher.lock().unwrap_or_else(PoisonError::into_inner).update(data);
    }

    /// Hex digest of everything written so far. Writing may continue afterwards.
    pub fn hexdigest(&self) -> String {
        let digest = self
            .hasher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .box_clone()
            .finalize();
        digest.iter().fold(String::with_capacity(digest.len() * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
    }
}

fn written_hash(receiver: &Receiver<'_>) -> RunResult<Arc<WrittenHash>> {
    receiver
        .state()
        .extension::<WrittenHash>()
        .ok_or_else(|| Exception::new_msg(ExcType::RuntimeError, "written_hash proxy has no digest"))
}

static WRITTEN_HASH: LazyLock<Arc<Specialization>> = LazyLock::new(|| {
    Specialization::builder("written_hash")
        .on_bind(|receiver, args| {
            let algorithm = match args.get_zero_one_arg("written_hash")? {
                Some(name) => Algorithm::from_name(&ops::str(&name)?)?,
                None => Algorithm::default(),
            };
            receiver.state().insert_extension(WrittenHash::new(algorithm));
            Ok(())
        })
        .direct_method("write", |receiver, args| {
            let data = args.get_one_arg("write")?;
            written_hash(receiver)?.update(&payload(&data)?);
            receiver.super_call("write", ArgValues::One(data))
        })
        .direct_property("hexdigest", |receiver| {
            Ok(Value::str(written_hash(receiver)?.hexdigest()))
        })
        .build()
});

/// Wraps the file-like `stream` so that writes through it are hashed with `algorithm`.
pub fn written_hash_proxy(stream: Value, algorithm: Algorithm) -> RunResult<Value> {
    WRITTEN_HASH.bind(stream, ArgValues::One(Value::str(algorithm.to_string())))
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use surrogate::get_state;

    use super::*;
    use crate::sink::sink;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn write(stream: &Value, data: &str) {
        ops::call_method(stream, "write", ArgValues::One(Value::str(data))).unwrap();
    }

    #[test]
    fn hashes_and_forwards_writes() {
        let buffer = Shared::default();
        let stream = written_hash_proxy(sink(buffer.clone()).unwrap(), Algorithm::Md5).unwrap();
        write(&stream, "hel");
        write(&stream, "lo");
        ops::call_method(&stream, "flush", ArgValues::Empty).unwrap();
        assert_eq!(buffer.0.lock().unwrap().as_slice(), b"hello");
        let hex = ops::getattr(&stream, "hexdigest").unwrap();
        assert_eq!(hex.as_str(), Some("5d41402abc4b2a76b9719d911017c592"));
    }

    #[test]
    fn algorithm_is_chosen_at_bind_time() {
        let stream = written_hash_proxy(sink(io::sink()).unwrap(), Algorithm::Sha256).unwrap();
        write(&stream, "hello");
        let hex = ops::getattr(&stream, "hexdigest").unwrap();
        assert_eq!(
            hex.as_str(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        // the digest lives in the proxy state, not on the sink
        assert!(get_state(&stream).is_ok());
        assert!(!ops::hasattr(&surrogate::get_original(&stream).unwrap(), "hexdigest").unwrap());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = WRITTEN_HASH
            .bind(sink(io::sink()).unwrap(), ArgValues::One(Value::str("crc32")))
            .unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ValueError);
        assert_eq!(err.arg(), Some("unsupported hash type crc32"));
    }
}
