//! Licensing for bytelock.
//!
//! This crate handles:
//! - Clear-signed license documents verified with a pinned Ed25519 key
//! - License policy checks (signature, expiry, instances, machine binding)
//! - Machine identity for license binding
//! - Locating the license file on the host
//! - Offline issuance for vendor tooling
//!
//! # Trust
//!
//! The signing key's fingerprint is pinned. A [`TrustAnchor`] is built once
//! from the pinned key and passed explicitly to [`LicenseCodec`] and
//! [`LicenseValidator`]; nothing reads a global key.
//!
//! # Document Format
//!
//! See [`ClearSignedDocument`] for the armor and [`License::signing_payload`]
//! for the canonical form covered by the license's own signature.

mod armor;
mod codec;
mod device;
mod discovery;
mod error;
mod issuer;
mod model;
mod trust;
mod validator;

pub use armor::{
    extract_payload, wrap_payload, ClearSignedDocument, SignaturePacket, LICENSE_BEGIN,
    LICENSE_END, PACKET_LEN, SIGNATURE_BEGIN, SIGNATURE_END, SIGNED_MESSAGE_BEGIN,
};
pub use codec::LicenseCodec;
pub use device::{DeviceFingerprint, MachineIdentity, StaticMachineId};
pub use discovery::{LicenseLocator, LICENSE_ENV_VAR, LICENSE_FILE_NAME};
pub use error::{DocumentSection, LicenseError, LicenseResult};
pub use issuer::{generate_license_id, IssuedLicense, LicenseDraft, LicenseIssuer};
pub use model::{Authorization, BindingMode, License, LicenseType, LICENSE_VERSION};
pub use trust::{fingerprint, TrustAnchor, LICENSE_KEY_FINGERPRINT};
pub use validator::{describe, LicenseValidator};
