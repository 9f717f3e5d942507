use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackSerializationError {
    #[error("Unable to serialize binding pack: {0}")]
    Serialize(bincode::error::EncodeError),

    #[error("Unable to deserialize binding pack: {0}")]
    Deserialize(bincode::error::DecodeError),
}
