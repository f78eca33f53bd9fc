// src/backend/utils/sanitize.rs
// Input cleanup for the public signing form.
use crate::error::ContractError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const MAX_NAME_CHARS: usize = 100;
pub const MIN_NAME_CHARS: usize = 2;
/// Ceiling on the decoded signature image.
pub const MAX_SIGNATURE_BYTES: usize = 512 * 1024;

/// Trims, strips angle brackets, `javascript:` and `on<event>=` patterns,
/// then caps the length. Fails if fewer than two characters remain.
pub fn sanitize_full_name(raw: &str) -> Result<String, ContractError> {
    let without_brackets: String = raw.chars().filter(|c| *c != '<' && *c != '>').collect();
    let without_scheme = strip_ascii_case_insensitive(&without_brackets, "javascript:");
    let cleaned = strip_event_handlers(&without_scheme);
    let capped: String = cleaned.trim().chars().take(MAX_NAME_CHARS).collect();
    let capped = capped.trim_end().to_string();
    if capped.chars().count() < MIN_NAME_CHARS {
        return Err(ContractError::NameTooShort(MIN_NAME_CHARS));
    }
    Ok(capped)
}

fn strip_ascii_case_insensitive(input: &str, needle: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    let mut search_from = 0;
    while let Some(pos) = lower[search_from..].find(needle) {
        let start = search_from + pos;
        out.push_str(&input[last..start]);
        last = start + needle.len();
        search_from = last;
    }
    out.push_str(&input[last..]);
    out
}

/// Removes `on` + word characters + `=` sequences, case-insensitively.
fn strip_event_handlers(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut copied_to = 0;
    while i + 1 < bytes.len() {
        if bytes[i].eq_ignore_ascii_case(&b'o') && bytes[i + 1].eq_ignore_ascii_case(&b'n') {
            let mut j = i + 2;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 2 && j < bytes.len() && bytes[j] == b'=' {
                out.push_str(&input[copied_to..i]);
                i = j + 1;
                copied_to = i;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&input[copied_to..]);
    out
}

/// Validates a `data:image/<subtype>;base64,<payload>` URL.
pub fn validate_signature_data_url(data_url: &str) -> Result<(), ContractError> {
    let rest = data_url
        .strip_prefix("data:image/")
        .ok_or(ContractError::InvalidSignatureFormat)?;
    let (subtype, payload) = rest
        .split_once(";base64,")
        .ok_or(ContractError::InvalidSignatureFormat)?;
    let valid_subtype = !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_subtype || payload.is_empty() {
        return Err(ContractError::InvalidSignatureFormat);
    }

    let estimated = payload.len() / 4 * 3;
    if estimated > MAX_SIGNATURE_BYTES {
        return Err(ContractError::PayloadTooLarge(format!(
            "Signature image exceeds {} KiB",
            MAX_SIGNATURE_BYTES / 1024
        )));
    }

    STANDARD
        .decode(payload)
        .map(|_| ())
        .map_err(|_| ContractError::InvalidSignatureEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_script_patterns() {
        assert_eq!(sanitize_full_name("  Jane Doe  ").unwrap(), "Jane Doe");
        assert_eq!(
            sanitize_full_name("<b>Jane</b> onclick=Doe").unwrap(),
            "bJane/b Doe"
        );
        assert_eq!(sanitize_full_name("JavaScript:Jane").unwrap(), "Jane");
        assert_eq!(sanitize_full_name("Jane ONMOUSEOVER=x").unwrap(), "Jane x");
        // Names that merely contain "on" survive.
        assert_eq!(sanitize_full_name("Jon Doe").unwrap(), "Jon Doe");
    }

    #[test]
    fn enforces_length_bounds() {
        assert_eq!(sanitize_full_name(" J "), Err(ContractError::NameTooShort(2)));
        assert_eq!(sanitize_full_name("<>"), Err(ContractError::NameTooShort(2)));
        let long = "a".repeat(150);
        assert_eq!(sanitize_full_name(&long).unwrap().chars().count(), 100);
    }

    #[test]
    fn signature_data_url_shapes() {
        assert!(validate_signature_data_url("data:image/png;base64,aGVsbG8=").is_ok());
        assert!(validate_signature_data_url("data:image/svg+xml;base64,PHN2Zz4=").is_ok());
        assert_eq!(
            validate_signature_data_url("data:text/plain;base64,aGVsbG8="),
            Err(ContractError::InvalidSignatureFormat)
        );
        assert_eq!(
            validate_signature_data_url("data:image/png,aGVsbG8="),
            Err(ContractError::InvalidSignatureFormat)
        );
        assert_eq!(
            validate_signature_data_url("data:image/png;base64,@@@@"),
            Err(ContractError::InvalidSignatureEncoding)
        );
    }

    #[test]
    fn oversized_signatures_are_rejected_before_decoding() {
        let payload = "A".repeat(MAX_SIGNATURE_BYTES / 3 * 4 + 8);
        let url = format!("data:image/png;base64,{}", payload);
        assert!(matches!(
            validate_signature_data_url(&url),
            Err(ContractError::PayloadTooLarge(_))
        ));
    }
}
