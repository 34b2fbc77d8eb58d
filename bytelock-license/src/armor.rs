//! Clear-signed license documents.
//!
//! ```text
//! -----BEGIN BYTELOCK SIGNED LICENSE-----
//! Hash: SHA512
//!
//! <claims, dash-escaped>
//! -----BEGIN BYTELOCK SIGNATURE-----
//! Version: 1
//!
//! <base64 signature packet>
//! -----END BYTELOCK SIGNATURE-----
//! ```
//!
//! The signature covers the claims exactly as they appear after removing the
//! `- ` escape prefix, including their original line endings. The line break
//! that precedes the signature marker belongs to the armor, not the claims.
//!
//! The claims carry the license JSON in a base64 envelope:
//!
//! ```text
//! -----BEGIN BYTELOCK LICENSE-----
//! Format: 1
//!
//! <base64 license JSON>
//! -----END BYTELOCK LICENSE-----
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::error::{DocumentSection, LicenseError, LicenseResult};

pub const SIGNED_MESSAGE_BEGIN: &str = "-----BEGIN BYTELOCK SIGNED LICENSE-----";
pub const SIGNATURE_BEGIN: &str = "-----BEGIN BYTELOCK SIGNATURE-----";
pub const SIGNATURE_END: &str = "-----END BYTELOCK SIGNATURE-----";
pub const LICENSE_BEGIN: &str = "-----BEGIN BYTELOCK LICENSE-----";
pub const LICENSE_END: &str = "-----END BYTELOCK LICENSE-----";

const ARMOR_LINE_PREFIX: &str = "-----";
const DASH_ESCAPE: &str = "- ";
const BASE64_LINE_WIDTH: usize = 64;

/// Signature packet version.
pub const PACKET_VERSION: u8 = 1;
/// Algorithm id for Ed25519.
pub const ALGORITHM_ED25519: u8 = 1;
/// Encoded packet length.
pub const PACKET_LEN: usize = 1 + 1 + 8 + 32 + 64;

/// Binary signature packet carried in the signature block.
///
/// Layout: `version u8 || algorithm u8 || created_at i64 BE || issuer
/// fingerprint [u8; 32] || signature [u8; 64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePacket {
    /// Unix seconds.
    pub created_at: i64,
    /// SHA-256 of the signing public key.
    pub issuer_fingerprint: [u8; 32],
    pub signature: [u8; 64],
}

impl SignaturePacket {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PACKET_LEN);
        out.push(PACKET_VERSION);
        out.push(ALGORITHM_ED25519);
        out.extend_from_slice(&self.created_at.to_be_bytes());
        out.extend_from_slice(&self.issuer_fingerprint);
        out.extend_from_slice(&self.signature);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> LicenseResult<Self> {
        if bytes.len() != PACKET_LEN {
            return Err(LicenseError::MalformedSignature(format!(
                "packet is {} bytes, expected {PACKET_LEN}",
                bytes.len()
            )));
        }
        if bytes[0] != PACKET_VERSION {
            return Err(LicenseError::MalformedSignature(format!(
                "unsupported packet version {}",
                bytes[0]
            )));
        }
        if bytes[1] != ALGORITHM_ED25519 {
            return Err(LicenseError::MalformedSignature(format!(
                "unsupported signature algorithm {}",
                bytes[1]
            )));
        }

        let (created_at, rest) = bytes[2..].split_at(8);
        let (issuer, signature) = rest.split_at(32);
        Ok(Self {
            created_at: i64::from_be_bytes(fixed(created_at)?),
            issuer_fingerprint: fixed(issuer)?,
            signature: fixed(signature)?,
        })
    }

    /// Upper-case hex issuer fingerprint.
    #[must_use]
    pub fn issuer_fingerprint_hex(&self) -> String {
        hex::encode_upper(self.issuer_fingerprint)
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> LicenseResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| LicenseError::MalformedSignature("truncated packet".into()))
}

/// A parsed clear-signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearSignedDocument {
    headers: Vec<(String, String)>,
    claims: String,
    packet: SignaturePacket,
}

impl ClearSignedDocument {
    /// Splits a document into headers, claims and signature packet.
    ///
    /// Performs no cryptographic verification.
    pub fn parse(document: &str) -> LicenseResult<Self> {
        let mut lines = document.split_inclusive('\n').skip_while(|l| is_blank(l));

        match lines.next() {
            Some(first) if content(first) == SIGNED_MESSAGE_BEGIN => {}
            _ => return Err(LicenseError::MissingSection(DocumentSection::Header)),
        }

        let mut headers = Vec::new();
        let mut header_closed = false;
        for line in lines.by_ref() {
            if is_blank(line) {
                header_closed = true;
                break;
            }
            if let Some(header) = parse_header(content(line)) {
                headers.push(header);
            }
        }
        if !header_closed {
            return Err(LicenseError::MissingSection(DocumentSection::Header));
        }

        let mut claims = String::new();
        let mut signature_found = false;
        for line in lines.by_ref() {
            if content(line) == SIGNATURE_BEGIN {
                signature_found = true;
                break;
            }
            claims.push_str(line.strip_prefix(DASH_ESCAPE).unwrap_or(line));
        }
        if !signature_found {
            return Err(LicenseError::MissingSection(DocumentSection::Signature));
        }
        strip_line_ending(&mut claims);
        if claims.is_empty() {
            return Err(LicenseError::MissingSection(DocumentSection::Claims));
        }

        let mut body = String::new();
        let mut signature_closed = false;
        for line in lines {
            let line = content(line).trim();
            if line == SIGNATURE_END {
                signature_closed = true;
                break;
            }
            if line.is_empty() || parse_header(line).is_some() {
                continue;
            }
            body.push_str(line);
        }
        if !signature_closed || body.is_empty() {
            return Err(LicenseError::MissingSection(DocumentSection::Signature));
        }

        let packet_bytes = BASE64
            .decode(body.as_bytes())
            .map_err(|e| LicenseError::MalformedSignature(format!("signature is not base64: {e}")))?;

        Ok(Self {
            headers,
            claims,
            packet: SignaturePacket::from_bytes(&packet_bytes)?,
        })
    }

    /// Renders a document. Claim lines starting with `-` are dash-escaped.
    #[must_use]
    pub fn render(claims: &str, packet: &SignaturePacket) -> String {
        let mut out = String::with_capacity(claims.len() + 512);
        out.push_str(SIGNED_MESSAGE_BEGIN);
        out.push_str("\nHash: SHA512\n\n");
        for line in claims.split_inclusive('\n') {
            if line.starts_with('-') {
                out.push_str(DASH_ESCAPE);
            }
            out.push_str(line);
        }
        out.push('\n');
        out.push_str(SIGNATURE_BEGIN);
        out.push_str("\nVersion: 1\n\n");
        push_wrapped(&mut out, &BASE64.encode(packet.to_bytes()));
        out.push_str(SIGNATURE_END);
        out.push('\n');
        out
    }

    /// The signed claims, unescaped, with original line endings.
    #[must_use]
    pub fn claims(&self) -> &str {
        &self.claims
    }

    #[must_use]
    pub fn packet(&self) -> &SignaturePacket {
        &self.packet
    }

    /// Armor headers (e.g. `Hash`), in document order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Wraps license JSON in the claims envelope.
#[must_use]
pub fn wrap_payload(json: &[u8]) -> String {
    let mut out = String::new();
    out.push_str(LICENSE_BEGIN);
    out.push_str("\nFormat: 1\n\n");
    push_wrapped(&mut out, &BASE64.encode(json));
    out.push_str(LICENSE_END);
    out
}

/// Extracts and decodes the base64 payload from the claims.
///
/// Blank lines, armor lines and `Key: Value` lines are skipped; lines made
/// only of base64 characters are concatenated and decoded.
pub fn extract_payload(claims: &str) -> LicenseResult<Vec<u8>> {
    let encoded: String = claims
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with(ARMOR_LINE_PREFIX))
        .filter(|l| parse_header(l).is_none())
        .filter(|l| l.bytes().all(is_base64_byte))
        .collect();

    if encoded.is_empty() {
        return Err(LicenseError::MissingPayload);
    }

    BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| LicenseError::InvalidPayload(format!("payload is not base64: {e}")))
}

fn push_wrapped(out: &mut String, encoded: &str) {
    // Base64 output is ASCII, so byte chunks are valid str boundaries.
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
}

fn parse_header(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(": ")?;
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

/// Line without its terminator.
fn content(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn is_blank(line: &str) -> bool {
    content(line).trim().is_empty()
}

fn strip_line_ending(s: &mut String) {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
}
