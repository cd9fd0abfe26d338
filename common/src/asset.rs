use std::{
    fs,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode asset: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode asset: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub trait Asset: Sized + Encode + Decode<()> {
    fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let mut file = BufWriter::new(fs::File::create(path)?);

        bincode::encode_into_std_write(self, &mut file, config::standard())?;
        file.flush()?;

        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let mut file = BufReader::new(fs::File::open(path)?);

        Ok(bincode::decode_from_std_read(&mut file, config::standard())?)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, AssetError> {
        Ok(bincode::encode_to_vec(self, config::standard())?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let (asset, _) = bincode::decode_from_slice(bytes, config::standard())?;
        Ok(asset)
    }
}
