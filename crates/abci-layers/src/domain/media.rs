//! Media object metadata and the `<object-id>/<password>` transaction format.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Metadata document stored next to the sources of a media object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    /// `img`, `audio` or `video`.
    #[serde(rename = "h", default, skip_serializing_if = "String::is_empty")]
    pub html_type: String,

    /// One MIME type per `<source>` of the object.
    #[serde(rename = "m", default, skip_serializing_if = "Vec::is_empty")]
    pub mime_types: Vec<String>,

    #[serde(rename = "t", default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(rename = "descr", default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Free-form `(name, content)` meta tags.
    #[serde(rename = "meta", default, skip_serializing_if = "Vec::is_empty")]
    pub meta_tags: Vec<(String, String)>,
}

/// A parsed media transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTx<'a> {
    /// Borrowed when the id is valid UTF-8, lossily decoded otherwise.
    pub object_id: Cow<'a, str>,
    pub password: &'a [u8],
}

/// Parse `<object-id>/<password>`.
///
/// Both parts must be non-empty and free of ASCII whitespace and `/`. Any
/// other byte is accepted; invalid UTF-8 in the object id becomes U+FFFD.
pub fn parse_media_tx(tx: &[u8]) -> Option<MediaTx<'_>> {
    let split = tx.iter().position(|b| *b == b'/')?;
    let (id, password) = (&tx[..split], &tx[split + 1..]);

    let valid_part =
        |part: &[u8]| !part.is_empty() && !part.iter().any(|b| *b == b'/' || b.is_ascii_whitespace());
    if !valid_part(id) || !valid_part(password) {
        return None;
    }

    Some(MediaTx {
        object_id: String::from_utf8_lossy(id),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_tx() {
        let tx = b"QmTp2hEo8eXRp6wg7jXv1BLCMh5a4F3B7buAUZNZUu772j/28dh743dh87d3h983h8dh8";
        let parsed = parse_media_tx(tx).unwrap();
        assert_eq!(parsed.object_id, "QmTp2hEo8eXRp6wg7jXv1BLCMh5a4F3B7buAUZNZUu772j");
        assert_eq!(parsed.password, b"28dh743dh87d3h983h8dh8");
    }

    #[test]
    fn test_parse_rejects_malformed_tx() {
        assert!(parse_media_tx(b"no-separator").is_none());
        assert!(parse_media_tx(b"/password").is_none());
        assert!(parse_media_tx(b"object/").is_none());
        assert!(parse_media_tx(b"a/b/c").is_none());
        assert!(parse_media_tx(b"obj ect/pw").is_none());
        assert!(parse_media_tx(b"object/p\tw").is_none());
    }

    #[test]
    fn test_parse_non_utf8_object_id() {
        let parsed = parse_media_tx(b"obj\xff\xfe/pw").unwrap();
        assert_eq!(parsed.object_id, "obj\u{FFFD}\u{FFFD}");
        assert!(matches!(parsed.object_id, Cow::Owned(_)));
        assert_eq!(parsed.password, b"pw");

        let utf8 = parse_media_tx("vidéo/pw".as_bytes()).unwrap();
        assert!(matches!(utf8.object_id, Cow::Borrowed("vidéo")));
    }

    #[test]
    fn test_meta_uses_compact_field_names() {
        let meta = MediaMeta {
            html_type: "video".into(),
            mime_types: vec!["video/webm".into()],
            title: "Clip".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"h":"video","m":["video/webm"],"t":"Clip"}"#);

        let parsed: MediaMeta =
            serde_json::from_str(r#"{"h":"img","meta":[["author","x"]]}"#).unwrap();
        assert_eq!(parsed.html_type, "img");
        assert_eq!(parsed.meta_tags, vec![("author".to_string(), "x".to_string())]);
    }
}
