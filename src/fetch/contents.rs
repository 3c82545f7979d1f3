// src/fetch/contents.rs
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::error::FetchError;

/// The subset of a GitHub contents API response we use.
#[derive(Debug, Deserialize)]
pub struct ContentsResponse {
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// Unwrap a contents API JSON envelope and base64-decode its payload.
pub fn decode_contents(body: &[u8]) -> Result<Vec<u8>, FetchError> {
    let resp: ContentsResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::Decode(format!("invalid contents envelope: {}", e)))?;

    // Files past the API's inline size limit come back as encoding "none".
    if resp.encoding != "base64" {
        return Err(FetchError::Decode(format!(
            "{}: unsupported encoding {:?}",
            resp.name, resp.encoding
        )));
    }

    // The API wraps the payload at 60 columns.
    let packed: String = resp
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(packed.as_bytes())
        .map_err(|e| FetchError::Decode(format!("{}: {}", resp.name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_payload() {
        let csv = "Province/State,Country/Region,1/22/20\n,US,1\n";
        let encoded = STANDARD.encode(csv);
        let (a, b) = encoded.split_at(20);
        let body = serde_json::json!({
            "name": "series.csv",
            "encoding": "base64",
            "content": format!("{}\n{}\n", a, b),
        });
        let decoded = decode_contents(body.to_string().as_bytes()).unwrap();
        assert_eq!(decoded, csv.as_bytes());
    }

    #[test]
    fn test_decode_rejects_bad_envelopes() {
        assert!(matches!(
            decode_contents(b"<html>rate limited</html>"),
            Err(FetchError::Decode(_))
        ));

        let too_large = br#"{"name":"big.csv","encoding":"none","content":""}"#;
        assert!(matches!(
            decode_contents(too_large),
            Err(FetchError::Decode(_))
        ));

        let bad_base64 = br#"{"name":"x.csv","encoding":"base64","content":"@@@"}"#;
        assert!(matches!(
            decode_contents(bad_base64),
            Err(FetchError::Decode(_))
        ));
    }
}
