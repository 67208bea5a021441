//! Binary and text primitives shared by the format decoders
//!
//! All binary access goes through [`BinaryReader`], which reports reads past
//! the end of the buffer as [`Error::TruncatedInput`](crate::Error::TruncatedInput).
//! Text formats use the line and token helpers in [`text`].

mod binary_reader;
pub mod buffer;
pub mod text;

pub use binary_reader::{BinaryReader, Endianness};
pub use buffer::{
    DataUri, base64_data_uri_to_buffer, file_extension_from_mime_type, get_file_extension,
    get_file_name, utf8_string_from_bytes,
};
pub use text::{name_from_line, parameters_from_line, parse_integer, parse_number, read_lines};
