//! Query-string and parameter decoding helpers.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Decode a query string into a flat map. Repeated keys: last one wins.
///
/// Accepts the query with or without its leading `?`.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Percent-decode a captured path parameter, falling back to the raw text
/// when the bytes are not valid UTF-8.
pub fn decode_param(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
