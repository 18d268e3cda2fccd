//! System-wide constants for Packmint.

/// Domain separator prefixed to every order digest.
pub const ORDER_DOMAIN: &[u8] = b"packmint:order:v1:";

/// Envelope prefixed to an order digest before it is signed, so a raw order
/// digest can never be mistaken for some other signed payload.
pub const SIGNED_ORDER_DOMAIN: &[u8] = b"packmint:signed-order:v1:";

/// Domain separator for receipt payload hashes.
pub const RECEIPT_DOMAIN: &[u8] = b"packmint:receipt:v1:";

/// First token id issued by a registry.
pub const FIRST_TOKEN_ID: u64 = 1;

/// Prefix of a self-contained JSON token descriptor.
pub const JSON_DATA_URI_PREFIX: &str = "data:application/json;base64,";

/// Prefix of an inlined SVG image.
pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Width of the generated token card, in SVG user units.
pub const CARD_WIDTH: u32 = 700;

/// Height of the generated token card, in SVG user units.
pub const CARD_HEIGHT: u32 = 300;

/// Attribute key naming the owning package in token descriptors.
pub const PACKAGE_TRAIT: &str = "package";
