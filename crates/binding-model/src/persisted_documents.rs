use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::Digest;
use thiserror::Error;
use tracing::warn;

use crate::operation::QueryBinding;

/// The persisted-document map of a binding pack: cache identity → wire text.
///
/// An execution engine may send only the cache identity instead of the full
/// operation text; this map resolves it. In `ListedOnly` mode the map is also
/// an allow-list: text that does not hash to a known identity is rejected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PersistedDocuments {
    /// Allow any text; use the map only to resolve identity-only requests.
    Any(Option<HashMap<String, String>>),
    /// Allow only documents contained in the map.
    ListedOnly(HashMap<String, String>),
}

impl PersistedDocuments {
    pub fn any() -> PersistedDocuments {
        PersistedDocuments::Any(None)
    }

    pub fn from_bindings<'a>(
        bindings: impl IntoIterator<Item = &'a QueryBinding>,
        allow_unlisted: bool,
    ) -> PersistedDocuments {
        let mapping = bindings
            .into_iter()
            .map(|binding| (binding.cache_identity.clone(), binding.text.clone()))
            .collect();

        if allow_unlisted {
            PersistedDocuments::Any(Some(mapping))
        } else {
            PersistedDocuments::ListedOnly(mapping)
        }
    }

    pub fn get<'a>(&'a self, cache_identity: &str) -> Option<&'a str> {
        match self {
            PersistedDocuments::Any(mapping) => {
                mapping.as_ref().and_then(|mapping| mapping.get(cache_identity))
            }
            PersistedDocuments::ListedOnly(mapping) => mapping.get(cache_identity),
        }
        .map(|s| s.as_str())
    }

    /// Resolve a request payload carrying the text, the identity, or both,
    /// without enforcing the allow-list.
    pub fn resolve_unchecked<'a>(
        &'a self,
        text: Option<&'a str>,
        cache_identity: Option<&str>,
    ) -> Result<&'a str, PersistedDocumentError> {
        match (text, cache_identity) {
            (Some(text), None) => Ok(text),
            (None, Some(cache_identity)) => self
                .get(cache_identity)
                .ok_or(PersistedDocumentError::NotFound),
            (Some(_), Some(_)) => Err(PersistedDocumentError::BothPresent),
            _ => Err(PersistedDocumentError::NonePresent),
        }
    }

    /// Resolve a request payload, enforcing the allow-list in `ListedOnly`
    /// mode: full text is accepted only if it hashes to a listed identity.
    pub fn resolve<'a>(
        &'a self,
        text: Option<&'a str>,
        cache_identity: Option<&str>,
    ) -> Result<&'a str, PersistedDocumentError> {
        match self {
            PersistedDocuments::Any(_) => self.resolve_unchecked(text, cache_identity),
            PersistedDocuments::ListedOnly(_) => match (text, cache_identity) {
                (Some(text), None) => {
                    warn!("Operation text sent when sending only the cache identity is sufficient");
                    let digest = sha2::Sha256::digest(text.as_bytes());
                    let computed = base16ct::lower::encode_string(&digest);
                    self.get(&computed)
                        .ok_or(PersistedDocumentError::NotListed)
                }
                (None, Some(cache_identity)) => self
                    .get(cache_identity)
                    .ok_or(PersistedDocumentError::NotListed),
                (Some(_), Some(_)) => Err(PersistedDocumentError::BothPresent),
                _ => Err(PersistedDocumentError::NonePresent),
            },
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PersistedDocumentError {
    #[error("The document is not in the persisted-document list")]
    NotListed,

    #[error("The cache identity does not match any persisted document")]
    NotFound,

    #[error("Both text and cache identity present in the payload, only one should be")]
    BothPresent,

    #[error("Neither text nor cache identity present in the payload")]
    NonePresent,
}
