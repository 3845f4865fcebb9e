//! JOSE headers, shared by JWS and JWE.
//!
//! A [`Header`] is the combination of the essential parameters, a closed
//! and typed set defined by the JOSE specifications, and an open map of
//! extension parameters. On the wire both groups are merged into a single
//! JSON object.
//!
//! [`JWSHeader`] and [`JWEHeader`] are the two instantiations of it,
//! with [`EncodedHeader`] wrapping a header that is integrity protected.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned, de::Error as _,
    ser::Error as _,
};
use serde_json::{Map, Value};

use crate::{JoseError, error::ErrorContext as _};

mod encoded;
pub use encoded::EncodedHeader;

mod jws;
pub use jws::{JWSEssentialHeader, JWSHeader};

mod jwe;
pub use jwe::{JWEEssentialHeader, JWEHeader};

/// Closed set of typed header parameters.
///
/// Implemented by [`JWSEssentialHeader`] and [`JWEEssentialHeader`].
pub trait EssentialParameters:
    Default + Clone + PartialEq + Serialize + DeserializeOwned + private::SealedEssentialParameters
{
    /// Names of all parameters, as used on the wire.
    const KEYS: &'static [&'static str];

    /// Set the parameter `key`, which is always one of [`Self::KEYS`].
    ///
    /// On error the parameter is left untouched.
    fn set_value(&mut self, key: &'static str, value: Value) -> Result<(), JoseError>;

    /// Overwrite every parameter which is set in `other`.
    fn merge_from(&mut self, other: &Self);

    /// Current value of parameter `key`, [`Value::Null`] if unset.
    fn get_value(&self, key: &str) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(key).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

mod private {
    pub trait SealedEssentialParameters {}
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Header made of typed essential parameters and free-form extension parameters
pub struct Header<E> {
    essential: E,
    extensions: Map<String, Value>,
}

impl<E: EssentialParameters> Header<E> {
    /// Create an empty [`Header`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`Header`] from the given essential parameters, without extensions
    #[must_use]
    pub fn from_essential(essential: E) -> Self {
        Self {
            essential,
            extensions: Map::new(),
        }
    }

    /// Reference to the essential parameters
    pub fn essential(&self) -> &E {
        &self.essential
    }

    /// Mutable reference to the essential parameters
    pub fn essential_mut(&mut self) -> &mut E {
        &mut self.essential
    }

    /// Reference to the extension parameters
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// Returns true if no parameter is set at all
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.essential == E::default()
    }

    fn essential_key(key: &str) -> Option<&'static str> {
        E::KEYS.iter().copied().find(|known| *known == key)
    }

    /// Set parameter `key` to `value`.
    ///
    /// Essential parameters are validated against their type, for example
    /// `alg` has to be a known algorithm and `jku` a valid url.
    /// Any other key is stored as-is as an extension parameter.
    ///
    /// The header is unchanged if an error is returned.
    pub fn try_set(&mut self, key: &str, value: impl Serialize) -> Result<&mut Self, JoseError> {
        match Self::essential_key(key) {
            Some(key) => {
                let value =
                    serde_json::to_value(value).map_err(|_err| JoseError::InvalidHeaderValue { key })?;
                self.essential.set_value(key, value)?;
            }
            None => {
                let value = serde_json::to_value(value).context("serialize extension header value")?;
                self.extensions.insert(key.to_owned(), value);
            }
        }
        Ok(self)
    }

    /// Consuming version of [`Self::try_set`]
    pub fn try_with(mut self, key: &str, value: impl Serialize) -> Result<Self, JoseError> {
        self.try_set(key, value)?;
        Ok(self)
    }

    /// Get the value of parameter `key`.
    ///
    /// Unset essential parameters are returned as [`Value::Null`],
    /// a missing extension parameter is a [`JoseError::UnknownHeaderKey`].
    pub fn get(&self, key: &str) -> Result<Value, JoseError> {
        if Self::essential_key(key).is_some() {
            return Ok(self.essential.get_value(key));
        }
        self.extensions
            .get(key)
            .cloned()
            .ok_or_else(|| JoseError::UnknownHeaderKey(key.to_owned()))
    }

    /// Remove extension parameter `key`, returning its value if it was present
    pub fn remove_extension(&mut self, key: &str) -> Option<Value> {
        self.extensions.remove(key)
    }

    /// Create a new header which starts as a copy of `self`,
    /// overlayed with every parameter that is set in `other`.
    ///
    /// Neither `self` nor `other` is modified.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.essential.merge_from(&other.essential);
        for (key, value) in &other.extensions {
            merged.extensions.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Replace all parameters of `self` with the ones of `other`
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Serialize this header as a single flat JSON object
    pub fn marshal(&self) -> Result<Vec<u8>, JoseError> {
        Ok(serde_json::to_vec(self).context("marshal header")?)
    }

    /// Parse a header from a JSON object
    pub fn unmarshal(data: &[u8]) -> Result<Self, JoseError> {
        Ok(serde_json::from_slice(data).context("unmarshal header")?)
    }
}

impl<E: EssentialParameters> Serialize for Header<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = match serde_json::to_value(&self.essential).map_err(S::Error::custom)? {
            Value::Object(map) => map,
            _ => return Err(S::Error::custom("essential header is not a JSON object")),
        };
        for (key, value) in &self.extensions {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map.serialize(serializer)
    }
}

impl<'de, E: EssentialParameters> Deserialize<'de> for Header<E> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // first the typed parameters, then whatever remains is an extension
        let mut extensions = Map::<String, Value>::deserialize(deserializer)?;
        let mut essential = Map::new();
        for key in E::KEYS {
            if let Some(value) = extensions.remove(*key) {
                essential.insert((*key).to_owned(), value);
            }
        }
        let essential = serde_json::from_value(Value::Object(essential)).map_err(D::Error::custom)?;
        Ok(Self {
            essential,
            extensions,
        })
    }
}

/// Deserialize `value` for essential parameter `key`.
fn parse_value<T: DeserializeOwned>(key: &'static str, value: Value) -> Result<T, JoseError> {
    serde_json::from_value(value).map_err(|_err| JoseError::InvalidHeaderValue { key })
}

/// Same as [`parse_value`] but JSON `null` unsets the parameter.
fn parse_optional<T: DeserializeOwned>(
    key: &'static str,
    value: Value,
) -> Result<Option<T>, JoseError> {
    match value {
        Value::Null => Ok(None),
        value => parse_value(key, value).map(Some),
    }
}

fn merge_option<T: Clone>(target: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        target.clone_from(other);
    }
}
