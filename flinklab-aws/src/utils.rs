//! Value helpers for the AWS provider

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Encode instance user data the way the control plane expects it
pub fn encode_user_data(script: &str) -> String {
    BASE64.encode(script.as_bytes())
}

/// Decode user data back to its script text (used when reading state)
pub fn decode_user_data(encoded: &str) -> Option<String> {
    BASE64
        .decode(encoded.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_data_round_trip() {
        let script = "#!/bin/bash\necho hello\n";
        let encoded = encode_user_data(script);
        assert_ne!(encoded, script);
        assert_eq!(decode_user_data(&encoded).as_deref(), Some(script));
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_user_data("not base64!!").is_none());
    }
}
