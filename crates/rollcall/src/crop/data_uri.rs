//! `data:` URI encoding for cropped pictures.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Wrap `bytes` as a base64 `data:` URI.
#[must_use]
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes.
///
/// # Errors
///
/// Returns [`Error::DataUri`] if the URI is not a base64 `data:` URI or the
/// payload does not decode.
pub fn decode(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::data_uri("missing data: scheme"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::data_uri("missing ',' separator"))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::data_uri("only base64 payloads are supported"))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| Error::data_uri(e.to_string()))?;

    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        assert_eq!(encode("image/jpeg", b"hi"), "data:image/jpeg;base64,aGk=");
    }

    #[test]
    fn test_decode_recovers_mime_and_bytes() {
        let (mime, bytes) = decode("data:image/png;base64,aGk=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn test_decode_rejects_non_data_uri() {
        let err = decode("https://example.com/a.jpg").unwrap_err();
        assert!(err.to_string().contains("data: scheme"));
    }

    #[test]
    fn test_decode_rejects_plain_payload() {
        assert!(decode("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_decode_defaults_empty_mime() {
        let (mime, _) = decode("data:;base64,aGk=").unwrap();
        assert_eq!(mime, "application/octet-stream");
    }
}
