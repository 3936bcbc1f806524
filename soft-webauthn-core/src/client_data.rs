//! CollectedClientData serialization (WebAuthn section 5.8.1.1)
//!
//! The output is the byte-exact limited-verification JSON that relying
//! parties hash and compare, not generic JSON: members are written in a fixed
//! order and strings go through [`to_quoted_string`], which escapes a
//! narrower set of characters than a JSON serializer would.

use std::fmt::Write as _;

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

/// `type` member of the collected client data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientDataType {
    Create,
    Get,
}

impl ClientDataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "webauthn.create",
            Self::Get => "webauthn.get",
        }
    }
}

/// Client data collected for one ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedClientData {
    pub ty: ClientDataType,
    /// Base64 of the relying party's challenge
    pub challenge: String,
    pub origin: String,
    pub cross_origin: bool,
    pub top_origin: Option<String>,
}

impl CollectedClientData {
    /// Collect client data for a raw challenge
    pub fn new(
        ty: ClientDataType,
        challenge: &[u8],
        origin: impl Into<String>,
        cross_origin: bool,
    ) -> Self {
        Self {
            ty,
            challenge: STANDARD.encode(challenge),
            origin: origin.into(),
            cross_origin,
            top_origin: None,
        }
    }

    /// Set the top-level origin for cross-origin ceremonies
    pub fn with_top_origin(mut self, top_origin: impl Into<String>) -> Self {
        self.top_origin = Some(top_origin.into());
        self
    }

    /// Serialize to the canonical JSON form
    ///
    /// # Examples
    ///
    /// ```
    /// use soft_webauthn_core::client_data::{ClientDataType, CollectedClientData};
    ///
    /// let ccd = CollectedClientData::new(
    ///     ClientDataType::Create,
    ///     &[0, 1, 2],
    ///     "https://example.com",
    ///     false,
    /// );
    /// assert_eq!(
    ///     ccd.serialize(),
    ///     r#"{"type":"webauthn.create","challenge":"AAEC","origin":"https://example.com","crossOrigin":false}"#
    /// );
    /// ```
    pub fn serialize(&self) -> String {
        let mut json = String::with_capacity(128);
        json.push_str("{\"type\":");
        json.push_str(&to_quoted_string(self.ty.as_str()));
        json.push_str(",\"challenge\":");
        json.push_str(&to_quoted_string(&self.challenge));
        json.push_str(",\"origin\":");
        json.push_str(&to_quoted_string(&self.origin));
        json.push_str(",\"crossOrigin\":");
        json.push_str(if self.cross_origin { "true" } else { "false" });
        if let Some(top_origin) = &self.top_origin {
            json.push_str(",\"topOrigin\":");
            json.push_str(&to_quoted_string(top_origin));
        }
        json.push('}');
        json
    }

    /// SHA-256 of the serialized form
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.serialize().as_bytes()).into()
    }
}

/// Quote a string the way CollectedClientData serialization requires
///
/// U+0020, U+0021, U+0023..=U+005B and U+005D and above pass through.
/// `"` and `\` are backslash-escaped. Everything else is written as
/// `\uXXXX` with lowercase hex.
pub fn to_quoted_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        push_quoted_char(&mut quoted, ch);
    }
    quoted.push('"');
    quoted
}

/// Quote raw UTF-16 text, escaping unpaired surrogates as `\uXXXX`
///
/// Properly paired surrogates decode to the character they form and pass
/// through like any other character above U+005D.
pub fn to_quoted_utf16(units: &[u16]) -> String {
    let mut quoted = String::with_capacity(units.len() + 2);
    quoted.push('"');
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => push_quoted_char(&mut quoted, ch),
            Err(lone) => push_unicode_escape(&mut quoted, lone.unpaired_surrogate()),
        }
    }
    quoted.push('"');
    quoted
}

fn push_quoted_char(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        // Pass-through ranges of the WebAuthn CCDToString algorithm; a
        // supplementary character is a valid surrogate pair and stays as is
        // https://www.w3.org/TR/webauthn-3/#clientdatajson-serialization
        '\u{20}' | '\u{21}' | '\u{23}'..='\u{5b}' | '\u{5d}'..=char::MAX => out.push(ch),
        // Remaining characters are all below U+0020, a single UTF-16 unit
        _ => push_unicode_escape(out, ch as u16),
    }
}

fn push_unicode_escape(out: &mut String, unit: u16) {
    let _ = write!(out, "\\u{unit:04x}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_strings_pass_through() {
        assert_eq!(
            to_quoted_string("http://google.com/foo?=123"),
            "\"http://google.com/foo?=123\""
        );
        assert_eq!(to_quoted_string("hello, world!"), "\"hello, world!\"");
        assert_eq!(to_quoted_string(""), "\"\"");
    }

    #[test]
    fn test_quote_and_backslash_escaped() {
        assert_eq!(
            to_quoted_string("Bob: \"你好！\""),
            "\"Bob: \\\"你好！\\\"\""
        );
        assert_eq!(to_quoted_string("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_control_characters_escaped_lowercase() {
        assert_eq!(to_quoted_string("\n"), "\"\\u000a\"");
        assert_eq!(to_quoted_string("\u{1f}"), "\"\\u001f\"");
        assert_eq!(to_quoted_string("\u{0}x"), "\"\\u0000x\"");
    }

    #[test]
    fn test_boundary_characters_pass_through() {
        assert_eq!(to_quoted_string(" !#[]~"), "\" !#[]~\"");
        assert_eq!(to_quoted_string("\u{7f}"), "\"\u{7f}\"");
    }

    #[test]
    fn test_supplementary_character_passes_through() {
        assert_eq!(to_quoted_string("𩸽"), "\"𩸽\"");

        let units: Vec<u16> = "𩸽".encode_utf16().collect();
        assert_eq!(units, vec![0xd867, 0xde3d]);
        assert_eq!(to_quoted_utf16(&units), "\"𩸽\"");
    }

    #[test]
    fn test_lone_surrogates_escaped() {
        assert_eq!(to_quoted_utf16(&[0x61, 0xd800, 0x62]), "\"a\\ud800b\"");
        assert_eq!(to_quoted_utf16(&[0xde3d, 0xd867]), "\"\\ude3d\\ud867\"");
    }

    #[test]
    fn test_utf16_matches_str_for_valid_text() {
        let text = "Bob: \"你好！\"\t\\";
        let units: Vec<u16> = text.encode_utf16().collect();
        assert_eq!(to_quoted_utf16(&units), to_quoted_string(text));
    }

    #[test]
    fn test_serialize_member_order() {
        let challenge: Vec<u8> = (0..16).collect();
        let ccd = CollectedClientData::new(
            ClientDataType::Create,
            &challenge,
            "https://google.com",
            false,
        );

        assert_eq!(
            ccd.serialize(),
            "{\"type\":\"webauthn.create\",\"challenge\":\"AAECAwQFBgcICQoLDA0ODw==\",\
             \"origin\":\"https://google.com\",\"crossOrigin\":false}"
        );
    }

    #[test]
    fn test_serialize_top_origin() {
        let ccd = CollectedClientData::new(ClientDataType::Get, b"c", "https://a.example", true)
            .with_top_origin("https://top.example");

        assert_eq!(
            ccd.serialize(),
            "{\"type\":\"webauthn.get\",\"challenge\":\"Yw==\",\"origin\":\"https://a.example\",\
             \"crossOrigin\":true,\"topOrigin\":\"https://top.example\"}"
        );
    }

    #[test]
    fn test_serialized_form_is_valid_json() {
        let ccd = CollectedClientData::new(
            ClientDataType::Get,
            b"challenge",
            "https://exa\"mple.com",
            false,
        );
        let parsed: serde_json::Value = serde_json::from_str(&ccd.serialize()).unwrap();

        assert_eq!(parsed["type"], "webauthn.get");
        assert_eq!(parsed["origin"], "https://exa\"mple.com");
        assert_eq!(parsed["crossOrigin"], false);
    }

    #[test]
    fn test_hash_is_sha256_of_serialization() {
        let ccd = CollectedClientData::new(ClientDataType::Create, b"x", "https://e.com", false);
        let expected: [u8; 32] = Sha256::digest(ccd.serialize().as_bytes()).into();
        assert_eq!(ccd.hash(), expected);
    }
}
