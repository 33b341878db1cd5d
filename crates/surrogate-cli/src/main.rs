//! Copies bytes from a file or stdin to a file or stdout and reports their checksum.
//!
//! The output stream is wrapped in a `written_hash` proxy, so the checksum is computed by
//! intercepting `write` rather than by a separate pass over the data.

mod sink;
mod written_hash;

use std::{
    fs::File,
    io::{self, ErrorKind, Read},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use surrogate::{ArgValues, RunResult, Value, ops};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    sink::{os_error, sink},
    written_hash::{Algorithm, written_hash_proxy},
};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[clap(name = "surrogate-cli", version, about = "Copy data and report the checksum of what was written")]
struct Args {
    /// Digest algorithm
    #[clap(long, value_enum, default_value_t = Algorithm::Md5)]
    digest: Algorithm,

    /// File to read, stdin when omitted
    #[clap(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// File to write, stdout when omitted
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(hex) => {
            let input = args
                .input
                .as_ref()
                .map_or_else(|| "<stdin>".to_owned(), |path| path.display().to_string());
            eprintln!("{} of {input} is {hex}", args.digest);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Streams the input through the hashing proxy and returns the hex digest.
fn run(args: &Args) -> RunResult<String> {
    let mut reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(File::open(path).map_err(os_error)?),
        None => Box::new(io::stdin().lock()),
    };
    let output = match &args.output {
        Some(path) => sink(File::create(path).map_err(os_error)?)?,
        None => sink(io::stdout())?,
    };
    let stream = written_hash_proxy(output, args.digest)?;
    info!(digest = %args.digest, "copying");

    let mut buffer = vec![0; CHUNK_SIZE];
    let mut total = 0_usize;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(os_error(err)),
        };
        ops::call_method(&stream, "write", ArgValues::One(Value::bytes(&buffer[..read])))?;
        total += read;
    }
    ops::call_method(&stream, "flush", ArgValues::Empty)?;
    debug!(bytes = total, "copy finished");

    let hex = ops::getattr(&stream, "hexdigest")?;
    Ok(hex.as_str().unwrap_or_default().to_owned())
}
