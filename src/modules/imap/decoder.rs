use mail_parser::parsers::MessageStream;

/// Decodes an RFC 2047 encoded-word if the input looks like one; any other
/// input passes through unchanged.
pub fn try_decode_string(encoded: &str) -> String {
    if encoded.starts_with("=?") && encoded.ends_with("?=") {
        // Remove the first equals sign and try to decode
        let modified_encoded = &encoded[1..];
        if let Some(result) = MessageStream::new(modified_encoded.as_bytes()).decode_rfc2047() {
            return result;
        }
    }
    encoded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_encoded_word() {
        assert_eq!(
            try_decode_string("=?utf-8?q?Quarterly_report?="),
            "Quarterly report"
        );
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(try_decode_string("Quarterly report"), "Quarterly report");
    }
}
