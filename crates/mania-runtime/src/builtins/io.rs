//! `mania:io` (§4 of SPEC_FULL.md): `stdin`/`stdout`/`stderr` Streams and
//! `read`/`write` NativeFunctions over them. Grounded on
//! `mania/builtins/mania_io.py`'s `IO` module — the only place with
//! direct stdio access, since `mania-core::StreamHandle` only carries the
//! handle tag (see its doc comment).

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use mania_core::{ModuleData, NativeFunctionData, Scope, StreamHandle, Symbol, Value};

use crate::error::RuntimeError;

/// Reads `count` bytes from `handle`. Only `Stdin` makes sense to read
/// from; `stdout`/`stderr` reject it the same way a real file descriptor
/// opened write-only would.
pub fn read_from_stream(handle: StreamHandle, count: usize) -> Result<Value, RuntimeError> {
    match handle {
        StreamHandle::Stdin => {
            let mut buf = vec![0u8; count];
            let n = std::io::stdin().read(&mut buf).map_err(|e| RuntimeError::Io(e.to_string()))?;
            buf.truncate(n);
            let s = String::from_utf8_lossy(&buf).into_owned();
            Ok(Value::string(s))
        }
        _ => Err(RuntimeError::Io("stream is not readable".into())),
    }
}

/// Writes `data` to `handle`, returning the number of bytes written.
pub fn write_to_stream(handle: StreamHandle, data: &str) -> Result<usize, RuntimeError> {
    let bytes = data.as_bytes();
    match handle {
        StreamHandle::Stdout => std::io::stdout().write_all(bytes).map_err(|e| RuntimeError::Io(e.to_string()))?,
        StreamHandle::Stderr => std::io::stderr().write_all(bytes).map_err(|e| RuntimeError::Io(e.to_string()))?,
        StreamHandle::Stdin => return Err(RuntimeError::Io("stream is not writable".into())),
    }
    Ok(bytes.len())
}

fn native_fn(name: &str, f: impl Fn(&[Value]) -> Result<Value, mania_core::CoreError> + Send + Sync + 'static) -> Value {
    Value::NativeFunction(Arc::new(NativeFunctionData {
        name: Some(Symbol::new(name)),
        callable: Box::new(f),
    }))
}

fn as_stream(v: &Value) -> Result<StreamHandle, mania_core::CoreError> {
    match v {
        Value::Stream(h) => Ok(*h),
        other => Err(mania_core::CoreError::TypeError {
            expected: "stream",
            found: other.type_name(),
        }),
    }
}

fn as_count(v: &Value) -> Result<usize, mania_core::CoreError> {
    match v {
        Value::Integer(i) => Ok(i.to_string().parse().unwrap_or(0)),
        other => Err(mania_core::CoreError::TypeError {
            expected: "integer",
            found: other.type_name(),
        }),
    }
}

fn as_string(v: &Value) -> Result<Arc<str>, mania_core::CoreError> {
    match v {
        Value::String(s) => Ok(Arc::clone(s)),
        other => Err(mania_core::CoreError::TypeError {
            expected: "string",
            found: other.type_name(),
        }),
    }
}

/// Builds the `mania:io` Module value bound into the boot scope.
pub fn module() -> Arc<ModuleData> {
    let exports = Scope::root();
    exports.define(Symbol::new("stdin"), Value::Stream(StreamHandle::Stdin));
    exports.define(Symbol::new("stdout"), Value::Stream(StreamHandle::Stdout));
    exports.define(Symbol::new("stderr"), Value::Stream(StreamHandle::Stderr));

    exports.define(
        Symbol::new("read"),
        native_fn("read", |args| {
            let stream = as_stream(args.first().ok_or(mania_core::CoreError::StackUnderflow)?)?;
            let count = as_count(args.get(1).ok_or(mania_core::CoreError::StackUnderflow)?)?;
            read_from_stream(stream, count).map_err(|e| mania_core::CoreError::Decode(e.to_string()))
        }),
    );
    exports.define(
        Symbol::new("write"),
        native_fn("write", |args| {
            let stream = as_stream(args.first().ok_or(mania_core::CoreError::StackUnderflow)?)?;
            let data = as_string(args.get(1).ok_or(mania_core::CoreError::StackUnderflow)?)?;
            let n = write_to_stream(stream, &data).map_err(|e| mania_core::CoreError::Decode(e.to_string()))?;
            Ok(Value::int(n as i64))
        }),
    );

    Arc::new(ModuleData {
        name: Symbol::new("mania:io"),
        entry_point: 0,
        constants: vec![Value::Symbol(Symbol::new("mania:io"))],
        instructions: Vec::new(),
        scope: Mutex::new(Some(exports)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_exports_the_three_standard_streams() {
        let m = module();
        let exports = m.scope.lock().unwrap().clone().unwrap();
        assert_eq!(exports.lookup_local(&Symbol::new("stdin")), Some(Value::Stream(StreamHandle::Stdin)));
        assert_eq!(exports.lookup_local(&Symbol::new("stdout")), Some(Value::Stream(StreamHandle::Stdout)));
        assert_eq!(exports.lookup_local(&Symbol::new("stderr")), Some(Value::Stream(StreamHandle::Stderr)));
    }

    #[test]
    fn writing_to_stdin_is_rejected() {
        assert!(write_to_stream(StreamHandle::Stdin, "x").is_err());
    }

    #[test]
    fn reading_from_stdout_is_rejected() {
        assert!(read_from_stream(StreamHandle::Stdout, 1).is_err());
    }
}
