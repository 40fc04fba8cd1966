use async_trait::async_trait;
use futures::stream::BoxStream;

use super::NfcError;

/// A raw NDEF record as delivered by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    pub record_type: String,
    pub encoding: Option<String>,
    pub data: Vec<u8>,
}

impl NdefRecord {
    pub fn text(value: &str) -> Self {
        Self {
            record_type: "text".to_string(),
            encoding: Some("utf-8".to_string()),
            data: value.as_bytes().to_vec(),
        }
    }
}

/// One physical tag presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReading {
    pub serial: String,
    pub records: Vec<NdefRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    Discovered(TagReading),
    /// The reader saw something but could not read it. The session keeps going.
    ReadError(String),
}

pub type TagEventStream = BoxStream<'static, TagEvent>;

/// Proximity reading capability.
///
/// `scan` opens a session whose stream runs until the adapter tears it down
/// or the consumer drops it.
#[async_trait]
pub trait TagReader: Send + Sync {
    fn is_supported(&self) -> bool;

    async fn scan(&self) -> Result<TagEventStream, NfcError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRecord {
    Text(String),
    /// Not a text record; carries the record type for logging.
    Skipped(String),
}

pub fn decode_record(record: &NdefRecord) -> Result<DecodedRecord, NfcError> {
    if record.record_type != "text" {
        return Ok(DecodedRecord::Skipped(record.record_type.clone()));
    }

    let encoding = record
        .encoding
        .as_deref()
        .unwrap_or("utf-8")
        .to_ascii_lowercase();

    let text = match encoding.as_str() {
        "utf-8" | "utf8" => String::from_utf8(record.data.clone()).map_err(|err| decode_error(record, err))?,
        "utf-16" | "utf-16le" => decode_utf16(&record.data, false).map_err(|err| decode_error(record, err))?,
        "utf-16be" => decode_utf16(&record.data, true).map_err(|err| decode_error(record, err))?,
        other => {
            return Err(NfcError::Decode {
                record_type: record.record_type.clone(),
                reason: format!("unsupported encoding '{other}'"),
            })
        }
    };

    Ok(DecodedRecord::Text(text))
}

fn decode_error(record: &NdefRecord, err: impl std::fmt::Display) -> NfcError {
    NfcError::Decode {
        record_type: record.record_type.clone(),
        reason: err.to_string(),
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err(format!("odd byte length {}", bytes.len()));
    }

    // A byte order mark overrides the declared endianness.
    let (big_endian, body) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        _ => (big_endian, bytes),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: &str, encoding: Option<&str>, data: &[u8]) -> NdefRecord {
        NdefRecord {
            record_type: record_type.to_string(),
            encoding: encoding.map(str::to_string),
            data: data.to_vec(),
        }
    }

    #[test]
    fn decodes_utf8_text() {
        let decoded = decode_record(&record("text", Some("utf-8"), b"hi")).unwrap();
        assert_eq!(decoded, DecodedRecord::Text("hi".into()));
    }

    #[test]
    fn missing_encoding_defaults_to_utf8() {
        let decoded = decode_record(&record("text", None, "Größe".as_bytes())).unwrap();
        assert_eq!(decoded, DecodedRecord::Text("Größe".into()));
    }

    #[test]
    fn decodes_utf16_with_and_without_bom() {
        let le = decode_record(&record("text", Some("utf-16"), &[b'h', 0, b'i', 0])).unwrap();
        assert_eq!(le, DecodedRecord::Text("hi".into()));

        let be = decode_record(&record("text", Some("utf-16be"), &[0, b'o', 0, b'k'])).unwrap();
        assert_eq!(be, DecodedRecord::Text("ok".into()));

        let bom = decode_record(&record("text", Some("utf-16le"), &[0xFE, 0xFF, 0, b'x'])).unwrap();
        assert_eq!(bom, DecodedRecord::Text("x".into()));
    }

    #[test]
    fn non_text_records_are_skipped() {
        let decoded = decode_record(&record("url", None, b"https://example.org")).unwrap();
        assert_eq!(decoded, DecodedRecord::Skipped("url".into()));
    }

    #[test]
    fn bad_bytes_are_decode_errors() {
        let err = decode_record(&record("text", Some("utf-8"), &[0xFF, 0xFE, 0xFD])).unwrap_err();
        assert!(matches!(err, NfcError::Decode { .. }));

        let err = decode_record(&record("text", Some("latin-9"), b"x")).unwrap_err();
        assert!(err.to_string().contains("latin-9"));
    }
}
