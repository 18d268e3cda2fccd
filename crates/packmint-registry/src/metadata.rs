//! Self-contained token descriptors.
//!
//! When a token has neither an explicit URI nor a base URI to hang off, the
//! registry inlines everything a wallet needs into a `data:` URI:
//!
//! ```text
//! data:application/json;base64,<b64 {"name","description","image","attributes"}>
//! ```
//!
//! Colour covers are rendered as a 700×300 SVG card showing the token id,
//! itself inlined as `data:image/svg+xml;base64,...`. Reference covers are
//! used as the image verbatim.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use packmint_types::constants::{
    CARD_HEIGHT, CARD_WIDTH, JSON_DATA_URI_PREFIX, PACKAGE_TRAIT, SVG_DATA_URI_PREFIX,
};
use packmint_types::{Cover, Package, Result, TokenId};
use serde::Serialize;

/// JSON body of a token descriptor. Field order is part of the format.
#[derive(Debug, Serialize)]
struct Descriptor<'a> {
    name: String,
    description: &'a str,
    image: String,
    attributes: [Attribute<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Attribute<'a> {
    trait_type: &'static str,
    value: &'a str,
}

/// Build the `data:application/json;base64,...` descriptor for token `id`
/// of `package`.
///
/// # Errors
/// Returns `Serialization` if the descriptor cannot be encoded.
pub fn descriptor_uri(id: TokenId, package: &Package) -> Result<String> {
    let descriptor = Descriptor {
        name: format!("#{id}"),
        description: &package.description,
        image: image_for(id, package.cover()),
        attributes: [Attribute {
            trait_type: PACKAGE_TRAIT,
            value: &package.name,
        }],
    };
    let json = serde_json::to_vec(&descriptor)?;
    Ok(format!("{JSON_DATA_URI_PREFIX}{}", STANDARD.encode(json)))
}

fn image_for(id: TokenId, cover: Cover<'_>) -> String {
    match cover {
        Cover::Color(color) => {
            format!("{SVG_DATA_URI_PREFIX}{}", STANDARD.encode(card_svg(color, id)))
        }
        Cover::Reference(reference) => reference.to_owned(),
    }
}

/// The SVG card: solid `color` background, token id centred with a drop shadow.
#[must_use]
pub fn card_svg(color: &str, id: TokenId) -> String {
    format!(
        concat!(
            r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg">"#,
            r#"<rect width="100%" height="100%" style="fill:{color}"/>"#,
            r#"<g style="dominant-baseline:middle;text-anchor:middle;font-size:200;font-weight:bold;">"#,
            r#"<defs><filter id="shadow"><feGaussianBlur stdDeviation="2 2" result="shadow"/>"#,
            r#"<feOffset dx="6" dy="6"/></filter></defs>"#,
            r#"<text x="50%" y="54%" style="filter:url(#shadow);fill:black">{id}</text>"#,
            r#"<text x="50%" y="54%" style="fill:white">{id}</text>"#,
            r#"</g></svg>"#,
        ),
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
        color = color,
        id = id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(uri: &str, prefix: &str) -> String {
        let body = uri.strip_prefix(prefix).unwrap();
        String::from_utf8(STANDARD.decode(body).unwrap()).unwrap()
    }

    #[test]
    fn card_layout() {
        let svg = card_svg("#09f", TokenId(1));
        assert_eq!(
            svg,
            concat!(
                r#"<svg width="700" height="300" xmlns="http://www.w3.org/2000/svg">"#,
                r#"<rect width="100%" height="100%" style="fill:#09f"/>"#,
                r#"<g style="dominant-baseline:middle;text-anchor:middle;font-size:200;font-weight:bold;">"#,
                r#"<defs><filter id="shadow"><feGaussianBlur stdDeviation="2 2" result="shadow"/>"#,
                r#"<feOffset dx="6" dy="6"/></filter></defs>"#,
                r#"<text x="50%" y="54%" style="filter:url(#shadow);fill:black">1</text>"#,
                r#"<text x="50%" y="54%" style="fill:white">1</text></g></svg>"#,
            )
        );
    }

    #[test]
    fn colour_cover_embeds_card() {
        let pkg = Package::new("P1", "PD1", 10, "#09f");
        let uri = descriptor_uri(TokenId(7), &pkg).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&decode(&uri, JSON_DATA_URI_PREFIX)).unwrap();
        assert_eq!(json["name"], "#7");
        assert_eq!(json["description"], "PD1");
        assert_eq!(json["attributes"][0]["trait_type"], "package");
        assert_eq!(json["attributes"][0]["value"], "P1");
        let svg = decode(json["image"].as_str().unwrap(), SVG_DATA_URI_PREFIX);
        assert!(svg.contains("fill:#09f"));
        assert!(svg.contains(">7</text>"));
    }

    #[test]
    fn reference_cover_used_verbatim() {
        let pkg = Package::new("P2", "art", 1, "ipfs://cover.png");
        let uri = descriptor_uri(TokenId(2), &pkg).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&decode(&uri, JSON_DATA_URI_PREFIX)).unwrap();
        assert_eq!(json["image"], "ipfs://cover.png");
    }

    #[test]
    fn empty_cover_renders_card() {
        let pkg = Package::new("P3", "", 1, "");
        let uri = descriptor_uri(TokenId(1), &pkg).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&decode(&uri, JSON_DATA_URI_PREFIX)).unwrap();
        assert!(
            json["image"]
                .as_str()
                .unwrap()
                .starts_with(SVG_DATA_URI_PREFIX)
        );
    }
}
