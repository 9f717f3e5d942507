use bytes::{Buf, Bytes};

use crate::error::PackSerializationError;

/// Serialize and deserialize a binding artifact.
///
/// Implementations must ensure that serialization and deserialization are
/// compatible with the same version of the underlying type; beyond that the
/// format is unconstrained.
pub trait PackSerializer {
    type Underlying;

    fn serialize(&self) -> Result<Vec<u8>, PackSerializationError>;

    fn deserialize_reader(
        reader: impl std::io::Read,
    ) -> Result<Self::Underlying, PackSerializationError>;

    fn deserialize(bytes: Vec<u8>) -> Result<Self::Underlying, PackSerializationError> {
        Self::deserialize_reader(Bytes::from(bytes).reader())
    }
}
