//! Error types for model import
//!
//! Every failure a decoder can hit is represented by a variant of [`Error`].
//! All errors carry an error code for categorization, followed by the
//! message a caller sees when an import fails.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O, archive and truncated-input errors
//! - **E2xxx**: Format decoding errors
//! - **E3xxx**: Model errors
//! - **E4xxx**: Unsupported features
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading file
//! - `E1002`: ZIP archive error
//! - `E1003`: Missing required file
//! - `E1004`: Unexpected end of binary data
//! - `E2001`: Invalid file format
//! - `E2002`: Numeric parse error
//! - `E2101`..`E2103`: Invalid OBJ index
//! - `E2201`..`E2203`: PLY header errors
//! - `E2301`..`E2304`: glTF container errors
//! - `E3001`: Invalid model structure
//! - `E3003`: Model without meshes
//! - `E4002`: Required extension not supported

use std::io;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding a model file
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading a file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - File not found
    /// - Insufficient permissions
    /// - Disk read error
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Unsupported compression method
    /// - Truncated archive
    #[cfg(feature = "archive")]
    #[error("[E1002] ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A file required by the import is not available
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - The main file was selected but its content never arrived
    /// - A referenced side file was not part of the upload
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// A read went past the end of a binary buffer
    ///
    /// **Error Code**: E1004
    ///
    /// **Common Causes**:
    /// - Truncated download or upload
    /// - Header fields (counts, chunk lengths) that disagree with the payload
    ///
    /// **Suggestions**:
    /// - Re-export the file from the authoring tool
    /// - Compare the file size with the size the header declares
    #[error(
        "[E1004] Unexpected end of data: needed {needed} bytes at offset {position}, but the buffer holds {length} bytes"
    )]
    TruncatedInput {
        /// Number of bytes the read required
        needed: usize,
        /// Cursor position at the time of the read
        position: usize,
        /// Total buffer length
        length: usize,
    },

    /// The content does not follow the expected file format
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Wrong file extension for the content
    /// - Corrupted header or chunk structure
    #[error("[E2001] {0}")]
    InvalidFormat(String),

    /// Parse error for numeric values in text formats
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - Invalid number format
    /// - Non-numeric characters in numeric fields
    ///
    /// **Suggestions**:
    /// - Verify numeric values use proper format (e.g., "1.5" not "1,5")
    #[error("[E2002] Parse error: {0}")]
    ParseError(String),

    /// An OBJ face references a vertex that does not exist
    ///
    /// **Error Code**: E2101
    #[error("[E2101] Invalid vertex index.")]
    InvalidVertexIndex,

    /// An OBJ face references a normal that does not exist
    ///
    /// **Error Code**: E2102
    #[error("[E2102] Invalid normal index.")]
    InvalidNormalIndex,

    /// An OBJ face references a texture coordinate that does not exist
    ///
    /// **Error Code**: E2103
    #[error("[E2103] Invalid uv index.")]
    InvalidUvIndex,

    /// A PLY header declares no usable vertex element
    ///
    /// **Error Code**: E2201
    #[error("[E2201] The model contains no vertices.")]
    NoVertices,

    /// A PLY header declares no usable face or tristrips element
    ///
    /// **Error Code**: E2202
    #[error("[E2202] The model contains no faces.")]
    NoFaces,

    /// A PLY header could not be interpreted
    ///
    /// **Error Code**: E2203
    ///
    /// **Common Causes**:
    /// - Unknown `format` line
    /// - Missing `end_header`
    #[error("[E2203] Invalid header information.")]
    InvalidHeader,

    /// A GLB container has a bad magic number or length
    ///
    /// **Error Code**: E2301
    #[error("[E2301] Invalid glTF file.")]
    InvalidGltf,

    /// The glTF asset version is not 2.x
    ///
    /// **Error Code**: E2302
    ///
    /// **Suggestions**:
    /// - Convert glTF 1.0 assets to glTF 2.0
    #[error("[E2302] Invalid glTF version.")]
    InvalidGltfVersion,

    /// A glTF buffer could not be resolved
    ///
    /// **Error Code**: E2303
    ///
    /// **Common Causes**:
    /// - The `.bin` side file was not uploaded with the `.gltf`
    #[error("[E2303] One of the requested buffers is missing.")]
    MissingBuffer,

    /// The glTF JSON document is malformed
    ///
    /// **Error Code**: E2304
    #[error("[E2304] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid model structure or validation failure
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Out-of-bounds vertex, normal, color or uv indices
    /// - NaN coordinates
    /// - Material index out of range
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// The decoded model does not reference any triangles
    ///
    /// **Error Code**: E3003
    #[error("[E3003] The model doesn't contain any meshes.")]
    EmptyModel,

    /// A matrix cannot be decomposed because one of its axes has zero length
    ///
    /// **Error Code**: E3004
    #[error("[E3004] Matrix has a degenerate scale axis and cannot be decomposed.")]
    DegenerateScale,

    /// Required extension not supported
    ///
    /// **Error Code**: E4002
    ///
    /// **Common Causes**:
    /// - glTF file lists an extension in `extensionsRequired` that this importer lacks
    ///
    /// **Suggestions**:
    /// - If possible, re-export without the extension
    #[error("[E4002] Unsupported extension: {}.", .0.join(", "))]
    UnsupportedExtension(Vec<String>),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl Error {
    /// Create an InvalidFormat error with context about which structure is invalid
    ///
    /// # Arguments
    /// * `context` - What part of the format is invalid (e.g., "3DS chunk", "GLB header")
    /// * `message` - Description of the error
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "vertex x coordinate")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'. \
             Verify the value is properly formatted.",
            field_name, expected_type, value
        ))
    }

    /// Create a TruncatedInput error for a read of `needed` bytes at `position`
    pub fn truncated(needed: usize, position: usize, length: usize) -> Self {
        Error::TruncatedInput {
            needed,
            position,
            length,
        }
    }

    /// The stable error code of this error (e.g. `"E2101"`)
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "E1001",
            #[cfg(feature = "archive")]
            Error::Archive(_) => "E1002",
            Error::MissingFile(_) => "E1003",
            Error::TruncatedInput { .. } => "E1004",
            Error::InvalidFormat(_) => "E2001",
            Error::ParseError(_) => "E2002",
            Error::InvalidVertexIndex => "E2101",
            Error::InvalidNormalIndex => "E2102",
            Error::InvalidUvIndex => "E2103",
            Error::NoVertices => "E2201",
            Error::NoFaces => "E2202",
            Error::InvalidHeader => "E2203",
            Error::InvalidGltf => "E2301",
            Error::InvalidGltfVersion => "E2302",
            Error::MissingBuffer => "E2303",
            Error::Json(_) => "E2304",
            Error::InvalidModel(_) => "E3001",
            Error::EmptyModel => "E3003",
            Error::DegenerateScale => "E3004",
            Error::UnsupportedExtension(_) => "E4002",
        }
    }

    /// The human readable message without the `[Exxxx]` prefix
    ///
    /// This is the text surfaced to callers through
    /// [`ImportError::ImportFailed`](crate::orchestrator::ImportError::ImportFailed).
    pub fn message(&self) -> String {
        let text = self.to_string();
        match text.strip_prefix('[').and_then(|rest| rest.split_once("] ")) {
            Some((_, message)) => message.to_string(),
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let missing_file = Error::MissingFile("texture.png".to_string());
        assert!(missing_file.to_string().contains("[E1003]"));

        let invalid_model = Error::InvalidModel("test error".to_string());
        assert!(invalid_model.to_string().contains("[E3001]"));

        let parse_err = Error::ParseError("test".to_string());
        assert!(parse_err.to_string().contains("[E2002]"));

        assert_eq!(Error::EmptyModel.code(), "E3003");
        assert_eq!(Error::InvalidUvIndex.code(), "E2103");
    }

    #[test]
    fn test_message_strips_code() {
        assert_eq!(Error::InvalidVertexIndex.message(), "Invalid vertex index.");
        assert_eq!(
            Error::EmptyModel.message(),
            "The model doesn't contain any meshes."
        );
        assert_eq!(Error::InvalidGltf.message(), "Invalid glTF file.");
    }

    #[test]
    fn test_unsupported_extension_lists_names() {
        let err = Error::UnsupportedExtension(vec![
            "KHR_a".to_string(),
            "EXT_b".to_string(),
        ]);
        assert_eq!(err.message(), "Unsupported extension: KHR_a, EXT_b.");
        assert!(err.to_string().contains("[E4002]"));
    }

    #[test]
    fn test_truncated_input_message() {
        let err = Error::truncated(4, 10, 12);
        let text = err.to_string();
        assert!(text.contains("[E1004]"));
        assert!(text.contains("needed 4 bytes at offset 10"));
        assert!(text.contains("holds 12 bytes"));
    }

    #[test]
    fn test_invalid_format_context_helper() {
        let err = Error::invalid_format_context("3DS chunk", "length exceeds parent");
        assert!(err.to_string().contains("3DS chunk"));
        assert!(err.to_string().contains("length exceeds parent"));
        assert!(err.to_string().contains("[E2001]"));
    }

    #[test]
    fn test_parse_error_with_context_helper() {
        let err =
            Error::parse_error_with_context("vertex x coordinate", "abc", "floating-point number");
        assert!(err.to_string().contains("vertex x coordinate"));
        assert!(err.to_string().contains("floating-point number"));
        assert!(err.to_string().contains("'abc'"));
        assert!(err.to_string().contains("[E2002]"));
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "not_a_number".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err
            .to_string()
            .contains("Failed to parse floating-point number"));
        assert!(err.to_string().contains("[E2002]"));
    }

    #[test]
    fn test_parse_int_error_conversion() {
        let parse_err: std::num::ParseIntError = "not_a_number".parse::<i32>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.to_string().contains("Failed to parse integer"));
    }
}
