//! Buffer and file name helpers

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decoded content of a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Mime type between `data:` and `;`
    pub mime_type: String,
    /// Decoded payload
    pub buffer: Vec<u8>,
}

/// Decode a `data:<mime>;base64,<payload>` URI
///
/// Returns `None` for anything that is not a well-formed base64 data URI.
pub fn base64_data_uri_to_buffer(uri: &str) -> Option<DataUri> {
    let rest = uri.strip_prefix("data:")?;
    let mime_end = rest.find(';')?;
    let payload_start = rest.find(',')?;
    let buffer = STANDARD.decode(rest[payload_start + 1..].trim()).ok()?;
    Some(DataUri {
        mime_type: rest[..mime_end].to_string(),
        buffer,
    })
}

/// The last component of a mime type (`image/png` → `png`)
pub fn file_extension_from_mime_type(mime_type: &str) -> &str {
    mime_type.rsplit('/').next().unwrap_or("")
}

/// The bare file name of a path or URL
///
/// Drops the query string and any directories (`/` or `\`), then
/// percent-decodes what is left.
pub fn get_file_name(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or(path);
    let name = match without_query.rfind('/') {
        Some(index) => &without_query[index + 1..],
        None => match without_query.rfind('\\') {
            Some(index) => &without_query[index + 1..],
            None => without_query,
        },
    };
    match urlencoding::decode(name) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => name.to_string(),
    }
}

/// Lowercase extension of a path, without the dot; empty if there is none
pub fn get_file_extension(path: &str) -> String {
    let name = get_file_name(path);
    match name.rfind('.') {
        Some(index) => name[index + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences and dropping a BOM
pub fn utf8_string_from_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        let uri = "data:application/octet-stream;base64,AQID";
        let decoded = base64_data_uri_to_buffer(uri).unwrap();
        assert_eq!(decoded.mime_type, "application/octet-stream");
        assert_eq!(decoded.buffer, vec![1, 2, 3]);

        assert!(base64_data_uri_to_buffer("buffer.bin").is_none());
        assert!(base64_data_uri_to_buffer("data:abc").is_none());
    }

    #[test]
    fn test_mime_extension() {
        assert_eq!(file_extension_from_mime_type("image/png"), "png");
        assert_eq!(file_extension_from_mime_type("jpeg"), "jpeg");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(get_file_name("models/cube.obj"), "cube.obj");
        assert_eq!(get_file_name("C:\\models\\cube.obj"), "cube.obj");
        assert_eq!(get_file_name("http://host/a/my%20cube.obj?v=2"), "my cube.obj");
        assert_eq!(get_file_name("cube.obj"), "cube.obj");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(get_file_extension("dir/Model.GLTF"), "gltf");
        assert_eq!(get_file_extension("archive.tar.zip"), "zip");
        assert_eq!(get_file_extension("README"), "");
    }

    #[test]
    fn test_utf8_with_bom() {
        assert_eq!(utf8_string_from_bytes(b"\xEF\xBB\xBFsolid"), "solid");
        assert_eq!(utf8_string_from_bytes(b"v 1 2 3"), "v 1 2 3");
    }
}
