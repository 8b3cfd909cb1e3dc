//! Value codecs - how setting values become text and back
//!
//! The store never looks at a value's type itself; it hands values to a
//! [`ValueCodec`] on the way in and asks it for the requested type on the
//! way out.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Encodes values to the text stored in the `Value` column and decodes
/// them back into the type requested by the caller.
pub trait ValueCodec: Clone + Send + Sync + 'static {
    /// Encode a value as text
    fn encode<T>(&self, value: &T) -> Result<String>
    where
        T: Serialize + ?Sized;

    /// Decode text into the requested type
    fn decode<T>(&self, text: &str) -> Result<T>
    where
        T: DeserializeOwned;
}

/// JSON codec backed by serde_json (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn encode<T>(&self, value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_string(value).map_err(Error::Serialization)
    }

    fn decode<T>(&self, text: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(text).map_err(Error::Deserialization)
    }
}
