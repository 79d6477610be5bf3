//! PDF plumbing shared by the PDF importer and exporter

use lopdf::{Document, Object, StringFormat};

/// Producer written into documents made by this crate
pub const PRODUCER: &str = "comicon";

/// Extra-metadata key holding per-chapter page counts in an embedded comic
pub const PDF_PAGES_KEY: &str = "pdf_pages";

/// Encode a PDF text string: a literal when ASCII, UTF-16BE with BOM otherwise
pub(crate) fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or
/// single-byte PDFDocEncoding, read as Latin-1)
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Follow an indirect reference
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Pixel size of a JPEG 2000 image, from its `ihdr` box.
///
/// `image` has no JPEG 2000 codec, so only this header box is read.
pub(crate) fn jp2_size(data: &[u8]) -> Option<(u32, u32)> {
    let at = data.windows(4).position(|w| w == b"ihdr")? + 4;
    let field = |offset: usize| -> Option<u32> {
        let bytes = data.get(at + offset..at + offset + 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    };
    let height = field(0)?;
    let width = field(4)?;
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_string_round_trip() {
        for text in ["Plain title", "Çà et là", "漫画"] {
            let encoded = text_string(text);
            let bytes = encoded.as_str().unwrap();
            assert_eq!(decode_text_string(bytes), text);
        }
    }

    #[test]
    fn test_ascii_is_literal() {
        assert!(matches!(
            text_string("abc"),
            Object::String(_, StringFormat::Literal)
        ));
    }

    #[test]
    fn test_jp2_size() {
        let mut data = b"\x00\x00\x00\x16ihdr".to_vec();
        data.extend_from_slice(&20u32.to_be_bytes());
        data.extend_from_slice(&30u32.to_be_bytes());
        assert_eq!(jp2_size(&data), Some((30, 20)));
    }
}
