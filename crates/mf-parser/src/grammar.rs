//! Transformation URL grammar.
//!
//! A request path has the shape
//! `/{domain}/upload/{transform}/{transform}/.../{public_id}[?query]`, where
//! every transform segment is a comma-joined list of a type token followed by
//! `key_value` parameter tokens.

use serde::Serialize;
use tracing::debug;

use mf_core::{AssetReference, Error, Params, Result, TransformationChain, TransformationSpec};

use crate::coerce::coerce;

/// Path segment separating the domain prefix from the transformation chain.
pub const DELIMITER: &str = "upload";

/// Separator between a key and its value inside a token.
pub const KEY_VALUE_SEPARATOR: char = '_';

/// Separator between the type token and parameter tokens of one segment.
pub const PARAM_SEPARATOR: char = ',';

/// Result of parsing a transformation URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedUrl {
    domain: Option<String>,
    asset: AssetReference,
    chain: TransformationChain,
}

impl ParsedUrl {
    /// The segment immediately preceding the delimiter, if there is one.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn asset(&self) -> &AssetReference {
        &self.asset
    }

    pub fn public_id(&self) -> &str {
        self.asset.public_id()
    }

    pub fn chain(&self) -> &TransformationChain {
        &self.chain
    }

    /// Split into domain, asset and chain.
    pub fn into_parts(self) -> (Option<String>, AssetReference, TransformationChain) {
        (self.domain, self.asset, self.chain)
    }
}

/// Parse a raw request path into its asset reference and transformation chain.
///
/// Fails with [`Error::MalformedUrl`] when the path has no `upload` segment
/// or names no asset after it. Segments without a `_` are dropped silently.
pub fn parse(raw_path: &str) -> Result<ParsedUrl> {
    let path = match raw_path.split_once('?') {
        Some((path, _query)) => path,
        None => raw_path,
    };

    let segments: Vec<&str> = path.split('/').collect();

    let delimiter = segments
        .iter()
        .position(|s| *s == DELIMITER)
        .ok_or_else(|| Error::MalformedUrl(format!("no '{DELIMITER}' segment in {raw_path}")))?;

    let last = segments.len() - 1;
    if delimiter == last {
        return Err(Error::MalformedUrl(format!(
            "no asset named after '{DELIMITER}' in {raw_path}"
        )));
    }

    let public_id = segments[last];
    if public_id.is_empty() {
        return Err(Error::MalformedUrl(format!("empty asset id in {raw_path}")));
    }

    let domain = delimiter
        .checked_sub(1)
        .map(|i| segments[i])
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut specs = Vec::new();
    for token in &segments[delimiter + 1..last] {
        if !token.contains(KEY_VALUE_SEPARATOR) {
            debug!(token = %token, "Dropping path segment without parameters");
            continue;
        }
        match parse_segment(token) {
            Some(spec) => specs.push(spec),
            None => debug!(token = %token, "Dropping path segment without a type"),
        }
    }

    Ok(ParsedUrl {
        domain,
        asset: AssetReference::new(public_id),
        chain: TransformationChain::new(specs),
    })
}

/// Parse one `type,key_value,...` segment; `None` when the type is empty.
fn parse_segment(token: &str) -> Option<TransformationSpec> {
    let mut parts = token.split(PARAM_SEPARATOR);
    let kind = parts.next().filter(|kind| !kind.is_empty())?;

    let mut params = Params::new();
    for param in parts {
        let (key, value) = param.split_once(KEY_VALUE_SEPARATOR).unwrap_or((param, ""));
        params.insert(key, coerce(value));
    }

    Some(TransformationSpec::new(kind, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::ParamValue;

    fn kinds(parsed: &ParsedUrl) -> Vec<&str> {
        parsed.chain().iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn fill_scenario() {
        let parsed = parse("/image/upload/c_fill,w_200,h_200/photo.jpg").unwrap();
        assert_eq!(parsed.domain(), Some("image"));
        assert_eq!(parsed.public_id(), "photo.jpg");
        assert_eq!(parsed.chain().len(), 1);

        let spec = &parsed.chain().specs()[0];
        assert_eq!(spec.kind(), "c_fill");
        assert_eq!(spec.params().number("w"), Some(200.0));
        assert_eq!(spec.params().number("h"), Some(200.0));
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let err = parse("/image/badpath").unwrap_err();
        assert!(matches!(err, Error::MalformedUrl(_)));
    }

    #[test]
    fn delimiter_must_match_whole_segment() {
        assert!(parse("/image/uploads/photo.jpg").is_err());
        assert!(parse("/image/upload_x/photo.jpg").is_err());
    }

    #[test]
    fn query_string_is_stripped() {
        let parsed = parse("/image/upload/q_auto/photo.jpg?v=3&cache=no").unwrap();
        assert_eq!(parsed.public_id(), "photo.jpg");
        assert_eq!(kinds(&parsed), vec!["q_auto"]);
    }

    #[test]
    fn query_containing_slash_is_stripped() {
        let parsed = parse("/image/upload/photo.jpg?next=/a/b").unwrap();
        assert_eq!(parsed.public_id(), "photo.jpg");
        assert!(parsed.chain().is_empty());
    }

    #[test]
    fn no_transformations_gives_empty_chain() {
        let parsed = parse("/video/upload/clip.mp4").unwrap();
        assert_eq!(parsed.domain(), Some("video"));
        assert!(parsed.chain().is_empty());
    }

    #[test]
    fn segments_without_separator_are_dropped() {
        let parsed = parse("/image/upload/v1234/c_scale,w_50/folder/photo.jpg").unwrap();
        assert_eq!(kinds(&parsed), vec!["c_scale"]);
    }

    #[test]
    fn chain_order_is_preserved() {
        let parsed =
            parse("/image/upload/c_crop,w_100,h_100,x_0,y_0/c_scale,w_50/photo.jpg").unwrap();
        assert_eq!(kinds(&parsed), vec!["c_crop", "c_scale"]);
        let crop = parsed.chain().specs()[0].params();
        assert_eq!(crop.number("x"), Some(0.0));
        assert_eq!(crop.number("y"), Some(0.0));
    }

    #[test]
    fn directive_type_token_is_kept_whole() {
        let parsed = parse("/video/upload/so_5,du_10/clip.mp4").unwrap();
        let spec = &parsed.chain().specs()[0];
        assert_eq!(spec.kind(), "so_5");
        assert_eq!(spec.params().number("du"), Some(10.0));
    }

    #[test]
    fn string_values_are_kept() {
        let parsed = parse("/video/upload/fl_splice,l_video:intro.mp4/clip.mp4").unwrap();
        let spec = &parsed.chain().specs()[0];
        assert_eq!(spec.params().text("l"), Some("video:intro.mp4"));
    }

    #[test]
    fn value_split_happens_once() {
        let parsed = parse("/image/upload/c_pad,w_10,h_10,b_rgb_ff0000/photo.jpg").unwrap();
        let spec = &parsed.chain().specs()[0];
        assert_eq!(spec.params().text("b"), Some("rgb_ff0000"));
    }

    #[test]
    fn parameter_without_separator_has_empty_value() {
        let parsed = parse("/image/upload/c_fill,w_10,h_10,flag/photo.jpg").unwrap();
        let spec = &parsed.chain().specs()[0];
        assert_eq!(spec.params().get("flag"), Some(&ParamValue::Text(String::new())));
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let parsed = parse("/image/upload/c_scale,w_10,w_20/photo.jpg").unwrap();
        assert_eq!(parsed.chain().specs()[0].params().number("w"), Some(20.0));
    }

    #[test]
    fn empty_public_id_is_malformed() {
        assert!(matches!(parse("/image/upload"), Err(Error::MalformedUrl(_))));
        assert!(matches!(parse("/image/upload/c_fill,w_1/"), Err(Error::MalformedUrl(_))));
        assert!(matches!(parse("/image/upload/?x=1"), Err(Error::MalformedUrl(_))));
    }

    #[test]
    fn first_delimiter_wins() {
        let parsed = parse("/image/upload/c_scale,w_5/upload/photo.jpg").unwrap();
        assert_eq!(kinds(&parsed), vec!["c_scale"]);
        assert_eq!(parsed.public_id(), "photo.jpg");
    }

    #[test]
    fn missing_domain_prefix() {
        let parsed = parse("upload/photo.jpg").unwrap();
        assert_eq!(parsed.domain(), None);
        let parsed = parse("/upload/photo.jpg").unwrap();
        assert_eq!(parsed.domain(), None);
    }

    #[test]
    fn serializes_to_json() {
        let parsed = parse("/image/upload/q_auto,quality_60/photo.jpg").unwrap();
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["domain"], "image");
        assert_eq!(json["asset"]["public_id"], "photo.jpg");
        assert_eq!(json["chain"][0]["type"], "q_auto");
        assert_eq!(json["chain"][0]["params"]["quality"], 60.0);
    }

    #[test]
    fn segment_with_empty_type_is_dropped() {
        let parsed = parse("/image/upload/,w_10/c_scale,w_5/photo.jpg").unwrap();
        assert_eq!(kinds(&parsed), ["c_scale"]);

        let parsed = parse("/image/upload/,w_10/photo.jpg").unwrap();
        assert!(parsed.chain().is_empty());
        assert_eq!(parsed.public_id(), "photo.jpg");
    }
}
