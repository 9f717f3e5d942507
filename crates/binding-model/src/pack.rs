use serde::{Deserialize, Serialize};

use crate::{
    error::PackSerializationError, operation::QueryBinding,
    pack_serializer::PackSerializer, persisted_documents::PersistedDocuments,
};

const PREFIX_TAG: &[u8] = b"graphbind";
const PREFIX_TAG_LEN: usize = PREFIX_TAG.len();

/// A set of query bindings packaged as one artifact file, consumed read-only
/// by an execution engine. Regeneration fully replaces the file.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct BindingPack {
    pub bindings: Vec<QueryBinding>,
    pub persisted_documents: PersistedDocuments,
}

impl BindingPack {
    pub fn binding(&self, operation_name: &str) -> Option<&QueryBinding> {
        self.bindings.iter().find(|b| b.name == operation_name)
    }
}

/// File header for binding pack files. Checked on deserialization so that an
/// artifact produced by a different generator version is rejected instead of
/// being misread.
#[derive(Serialize, Deserialize, Debug)]
struct Header {
    builder_version: String,
    artifact_version: String,
}

impl Header {
    fn new() -> Header {
        let version = env!("CARGO_PKG_VERSION").to_string();
        Header {
            builder_version: version.clone(),
            artifact_version: version,
        }
    }

    fn check_header(&self, header: Header) -> Result<(), String> {
        if self.artifact_version != header.artifact_version {
            return Err(format!(
                "Artifact version of this file {0} does not match current version {1}",
                header.artifact_version, self.artifact_version
            ));
        }
        if self.builder_version != header.builder_version {
            return Err(format!(
                "Builder version of this file {0} does not match current version {1}",
                header.builder_version, self.builder_version
            ));
        }
        Ok(())
    }
}

impl PackSerializer for BindingPack {
    type Underlying = Self;

    fn serialize(&self) -> Result<Vec<u8>, PackSerializationError> {
        serialize_header_and_pack(&Header::new(), self)
    }

    fn deserialize_reader(
        mut reader: impl std::io::Read,
    ) -> Result<Self::Underlying, PackSerializationError> {
        fn error(msg: &str, io_error: Option<std::io::Error>) -> PackSerializationError {
            let msg = match io_error {
                Some(e) => format!("{msg}: {e}"),
                None => msg.to_string(),
            };
            PackSerializationError::Deserialize(bincode::error::DecodeError::OtherString(msg))
        }
        {
            let mut prefix = [0_u8; PREFIX_TAG_LEN];
            reader
                .read_exact(&mut prefix)
                .map_err(|e| error("Failed to read binding pack prefix", Some(e)))?;

            if prefix != PREFIX_TAG {
                return Err(error("Invalid binding pack file prefix", None));
            }
        }
        // Header len is a u64 to make pack files platform independent
        // (32-bit vs 64-bit systems)
        let header_len = {
            let mut header_len = [0_u8; std::mem::size_of::<u64>()];
            reader
                .read_exact(&mut header_len)
                .map_err(|e| error("Failed to read binding pack header size", Some(e)))?;
            u64::from_le_bytes(header_len)
        };
        let header_len = header_len
            .try_into()
            .map_err(|_| error("Failed to convert the binding pack header size to usize", None))?;

        // Each artifact version may have a different header size, so read
        // exactly header_len bytes before decoding.
        let mut header_bytes = vec![0_u8; header_len];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| error("Failed to read the binding pack header", Some(e)))?;

        let (header, size) = bincode::serde::decode_from_slice::<Header, _>(
            &header_bytes,
            bincode::config::standard(),
        )
        .map_err(PackSerializationError::Deserialize)?;
        if size != header_bytes.len() {
            return Err(error("Incomplete header deserialization", None));
        }
        Header::new()
            .check_header(header)
            .map_err(|e| error(&e, None))?;

        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .map_err(PackSerializationError::Deserialize)
    }
}

fn serialize_header_and_pack(
    header: &Header,
    pack: &BindingPack,
) -> Result<Vec<u8>, PackSerializationError> {
    let header: Vec<u8> = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(PackSerializationError::Serialize)?;
    let header_len: u64 = u64::try_from(header.len()).map_err(|e| {
        PackSerializationError::Serialize(bincode::error::EncodeError::OtherString(format!(
            "Failed to convert header len to u64 {e:?}"
        )))
    })?;

    let header_len: Vec<u8> = header_len.to_le_bytes().to_vec();
    let pack = bincode::serde::encode_to_vec(pack, bincode::config::standard())
        .map_err(PackSerializationError::Serialize)?;
    Ok([PREFIX_TAG.to_vec(), header_len, header, pack].concat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_identity::cache_identity;
    use crate::operation::OperationKind;
    use crate::selection::{FieldKind, FieldSelection, FragmentArena, Selection, WireType};

    fn mk_pack() -> BindingPack {
        let text = "query Sessions { sessions { id } }";
        let id_field = Selection::Field(FieldSelection {
            alias: None,
            name: "id".to_string(),
            arguments: Default::default(),
            ty: WireType::non_null("ID"),
            kind: FieldKind::Scalar,
            selections: vec![],
        });
        let tree = vec![Selection::Field(FieldSelection {
            alias: None,
            name: "sessions".to_string(),
            arguments: Default::default(),
            ty: WireType::non_null("ProjectSession"),
            kind: FieldKind::Composite,
            selections: vec![id_field],
        })];

        let binding = QueryBinding {
            name: "Sessions".to_string(),
            kind: OperationKind::Query,
            text: text.to_string(),
            cache_identity: cache_identity(text).unwrap(),
            variables: vec![],
            fragments: FragmentArena::default(),
            fragment_tree: tree.clone(),
            operation_tree: tree,
        };

        let persisted_documents = PersistedDocuments::from_bindings([&binding], false);
        BindingPack {
            bindings: vec![binding],
            persisted_documents,
        }
    }

    #[test]
    fn serialize_deserialize_ok() {
        let pack = mk_pack();
        let bytes = PackSerializer::serialize(&pack).expect("Pack should serialize");
        let read = BindingPack::deserialize_reader(bytes.as_slice())
            .expect("Deserialization should succeed");

        assert_eq!(read, pack);
    }

    #[test]
    fn deserialize_different_version() {
        let pack = mk_pack();
        let mut header = Header::new();
        header.builder_version = "0.0.1".to_string();
        let bytes = serialize_header_and_pack(&header, &pack).expect("Should serialize");
        assert!(
            BindingPack::deserialize_reader(bytes.as_slice()).is_err(),
            "Old builder_version should fail to deserialize"
        );

        let mut header = Header::new();
        header.artifact_version = "0.0.1".to_string();
        let bytes = serialize_header_and_pack(&header, &pack).expect("Should serialize");
        assert!(
            BindingPack::deserialize_reader(bytes.as_slice()).is_err(),
            "Old artifact_version should fail to deserialize"
        );
    }

    #[test]
    fn deserialize_wrong_prefix() {
        let pack = mk_pack();
        let mut bytes = PackSerializer::serialize(&pack).expect("Pack should serialize");
        bytes[0] ^= 0xff;
        assert!(BindingPack::deserialize_reader(bytes.as_slice()).is_err());
    }
}
