use thiserror::Error;

/// Every way encoding or decoding an OPC UA binary value can fail.
///
/// There are no retries and no silent recovery: every public encode/decode
/// function returns `Result<_, Error>` and propagates the first failure it
/// sees to its caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer underflow: requested {requested} bytes, {remaining} remaining")]
    Underflow { requested: usize, remaining: usize },

    #[error("unknown {kind} tag 0x{tag:02x}")]
    BadTag { kind: &'static str, tag: u8 },

    #[error("invalid utf-8 in string field")]
    BadUtf8(#[from] std::str::Utf8Error),

    #[error("invalid length prefix {length}")]
    BadLength { length: i32 },

    #[error("no schema registered for type {type_name}")]
    UnknownType { type_name: String },

    #[error("ExtensionObject for registered type {type_id} has no body")]
    MissingBody { type_id: String },

    #[error("unsupported ExtensionObject encoding 0x{encoding:02x}")]
    UnsupportedEncoding { encoding: u8 },

    #[error("DateTime value is outside the representable range")]
    DateTimeRange,

    #[error("array length {0} exceeds i32::MAX")]
    ArrayTooLong(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
