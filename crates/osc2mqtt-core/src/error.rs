//! Error types for the conversion engine.

/// Raised while compiling a rule set; aborts startup.
///
/// A rule set either compiles completely or not at all -- there is no
/// partially usable state.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rule '{rule}': invalid match pattern: {source}")]
    BadPattern {
        rule: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("rule '{rule}': malformed group list '{list}'")]
    BadGroupList { rule: String, list: String },

    #[error("duplicate rule name '{0}'")]
    DuplicateRule(String),
}

/// Raised when a payload does not fit the declared wire format.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is {got} bytes but layout '{layout}' needs {need}")]
    LengthMismatch {
        layout: String,
        need: usize,
        got: usize,
    },

    #[error("payload length {got} is not a multiple of element size {elem} (format '{code}')")]
    UnevenArray { code: char, elem: usize, got: usize },

    #[error("unknown format code '{0}'")]
    BadFormatCode(char),

    #[error("unsupported text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("payload is not valid {encoding} text")]
    BadText { encoding: String },

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised when a value sequence cannot be packed into the declared wire
/// format.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("layout '{layout}' packs {need} values, got {got}")]
    CountMismatch {
        layout: String,
        need: usize,
        got: usize,
    },

    #[error("unknown format code '{0}'")]
    BadFormatCode(char),

    #[error("{kind} value does not fit format code '{code}'")]
    TypeMismatch { code: char, kind: &'static str },

    #[error("value {value} is out of range for format code '{code}'")]
    OutOfRange { code: char, value: i64 },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-message translation failure.
///
/// Local to a single call; the caller logs it and drops the message.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("cannot coerce {kind} value '{value}' to {target}")]
    Coerce {
        target: &'static str,
        kind: &'static str,
        value: String,
    },
}
