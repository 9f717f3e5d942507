use sha2::Digest;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheIdentityError {
    #[error("Cannot compute a cache identity for empty operation text")]
    EmptyText,
}

/// Compute the cache identity of an operation: the lowercase hex SHA-256 of
/// the wire text bytes. A pure function of the text only; identical text
/// always yields the identical identity.
pub fn cache_identity(text: &str) -> Result<String, CacheIdentityError> {
    if text.trim().is_empty() {
        return Err(CacheIdentityError::EmptyText);
    }

    let digest = sha2::Sha256::digest(text.as_bytes());
    Ok(base16ct::lower::encode_string(&digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let text = "query Sessions { sessions { id } }";
        assert_eq!(cache_identity(text), cache_identity(text));
    }

    #[test]
    fn sensitive_to_any_text_change() {
        let a = cache_identity("query Sessions { sessions { id } }").unwrap();
        let b = cache_identity("query Sessions { sessions { id } } ").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn known_digest() {
        // sha256("{ id }")
        assert_eq!(
            cache_identity("{ id }").unwrap(),
            "5048eb75d7cd7641b8587f45f2314b4479e95f93955f929046990ce7f5dc47f9"
        );
    }

    #[test]
    fn blank_text_rejected() {
        assert_eq!(cache_identity(""), Err(CacheIdentityError::EmptyText));
        assert_eq!(cache_identity("  \n\t"), Err(CacheIdentityError::EmptyText));
    }
}
