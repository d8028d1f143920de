//! Error types for descriptor decoding and encoding.

use thiserror::Error;

/// Broad class of a [`DescriptorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wire framing is broken (lengths past the end of the buffer, oversized payloads).
    Structural,
    /// A numeric field does not fit its bit width.
    Range,
    /// Malformed command-line token or XML content.
    Format,
}

/// Errors raised while building, decoding or converting descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Declared length reads past the end of the buffer.
    #[error("Truncated descriptor data: need {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    /// Payload does not fit in the 8-bit length field.
    #[error("Descriptor payload too long: {0} bytes (max: 255)")]
    PayloadTooLong(usize),

    /// Buffer size disagrees with the length byte.
    #[error("Descriptor size mismatch: length field says {declared}, buffer holds {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// Numeric field wider than its domain.
    #[error("{field} out of range: {value} (max: {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Private data does not fit in a single descriptor.
    #[error("Private data too long: {0} bytes (max: 251)")]
    PrivateDataTooLong(usize),

    /// Badly formed command-line value.
    #[error("Invalid command-line value \"{0}\"")]
    InvalidToken(String),

    /// Not an even-length string of hexadecimal digits.
    #[error("Invalid hexadecimal data \"{0}\"")]
    InvalidHex(String),

    #[error("Missing attribute {attribute} in <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Invalid value \"{value}\" for attribute {attribute} in <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("Unexpected element <{found}>, expected <{expected}>")]
    UnexpectedElement { expected: String, found: String },

    /// Underlying XML parser or writer failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// No registered descriptor type for this tag or element name.
    #[error("Unknown descriptor: {0}")]
    UnknownDescriptor(String),
}

impl DescriptorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DescriptorError::Truncated { .. }
            | DescriptorError::PayloadTooLong(_)
            | DescriptorError::SizeMismatch { .. } => ErrorKind::Structural,
            DescriptorError::OutOfRange { .. } | DescriptorError::PrivateDataTooLong(_) => {
                ErrorKind::Range
            }
            _ => ErrorKind::Format,
        }
    }
}

impl From<quick_xml::Error> for DescriptorError {
    fn from(e: quick_xml::Error) -> Self {
        DescriptorError::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DescriptorError>;
