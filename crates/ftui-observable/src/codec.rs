#![forbid(unsafe_code)]

//! Order-preserving snapshot encodings.
//!
//! Each container converts to and from a flat encoding that an external
//! persistence layer can embed in whatever format it owns:
//!
//! | Container               | Encoding              | Shape                          |
//! |-------------------------|-----------------------|--------------------------------|
//! | `ObservableSequence<T>` | [`ListEncoding<T>`]   | `items` in sequence order      |
//! | `ObservableSet<T>`      | [`SetEncoding<T>`]    | `items` in enumeration order   |
//! | `ObservableMap<K, V>`   | [`MapEncoding<K, V>`] | parallel `keys` / `values`     |
//!
//! # Invariants
//!
//! 1. `decode(encode(c))` is element-equivalent to `c`: same order for
//!    sequences, same membership for sets, same associations for maps.
//! 2. `encode` reads the container under a single borrow, so `keys[i]` and
//!    `values[i]` always belong to the same entry.
//! 3. Neither direction emits change events. `decode` builds a fresh
//!    container with no listeners; it is not a mutation sequence.
//!
//! Encoding is never automatic. The owner calls it at whatever point its own
//! lifecycle dictates.
//!
//! # Failure Modes
//!
//! | Failure                       | Behavior                      |
//! |-------------------------------|-------------------------------|
//! | `keys.len() != values.len()`  | `Err(InvalidArgument)`        |
//! | Repeated key in map encoding  | `Err(DuplicateKey)`           |
//! | Repeated item in set encoding | Collapsed to one member       |

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

use crate::error::{ObservableError, Result};
use crate::map::ObservableMap;
use crate::sequence::ObservableSequence;
use crate::set::ObservableSet;

/// Conversion between a container and its flat snapshot encoding.
pub trait SnapshotCodec: Sized {
    /// The flat representation.
    type Encoded;

    /// Capture the current contents in enumeration order.
    fn encode(&self) -> Self::Encoded;

    /// Build a fresh container from `encoded`, without emitting events.
    fn decode(encoded: Self::Encoded) -> Result<Self>;
}

/// Encoding of an [`ObservableSequence`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ListEncoding<T> {
    pub items: Vec<T>,
}

/// Encoding of an [`ObservableSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct SetEncoding<T> {
    pub items: Vec<T>,
}

/// Encoding of an [`ObservableMap`] as two order-aligned sequences.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapEncoding<K, V> {
    pub keys: Vec<K>,
    pub values: Vec<V>,
}

impl<T: Clone + PartialEq + 'static> SnapshotCodec for ObservableSequence<T> {
    type Encoded = ListEncoding<T>;

    fn encode(&self) -> ListEncoding<T> {
        ListEncoding {
            items: self.to_vec(),
        }
    }

    fn decode(encoded: ListEncoding<T>) -> Result<Self> {
        Ok(Self::from_vec(encoded.items))
    }
}

impl<T: Eq + Hash + Clone + 'static> SnapshotCodec for ObservableSet<T> {
    type Encoded = SetEncoding<T>;

    fn encode(&self) -> SetEncoding<T> {
        SetEncoding {
            items: self.to_vec(),
        }
    }

    fn decode(encoded: SetEncoding<T>) -> Result<Self> {
        Ok(encoded.items.into_iter().collect())
    }
}

impl<K, V> SnapshotCodec for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    type Encoded = MapEncoding<K, V>;

    fn encode(&self) -> MapEncoding<K, V> {
        self.with(|entries| {
            let (keys, values): (Vec<K>, Vec<V>) = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .unzip();
            MapEncoding { keys, values }
        })
    }

    fn decode(encoded: MapEncoding<K, V>) -> Result<Self> {
        let MapEncoding { keys, values } = encoded;
        if keys.len() != values.len() {
            debug!(
                keys = keys.len(),
                values = values.len(),
                "map decode: misaligned encoding"
            );
            return Err(ObservableError::InvalidArgument(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        let mut entries = HashMap::with_capacity(keys.len());
        for (key, value) in keys.into_iter().zip(values) {
            if entries.insert(key, value).is_some() {
                debug!("map decode: repeated key");
                return Err(ObservableError::DuplicateKey);
            }
        }
        Ok(Self::from_map(entries))
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    //! Containers (de)serialize through their snapshot encodings.

    use std::hash::Hash;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{ListEncoding, MapEncoding, SetEncoding, SnapshotCodec};
    use crate::map::ObservableMap;
    use crate::sequence::ObservableSequence;
    use crate::set::ObservableSet;

    impl<T> Serialize for ObservableSequence<T>
    where
        T: Clone + PartialEq + Serialize + 'static,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.encode().serialize(serializer)
        }
    }

    impl<'de, T> Deserialize<'de> for ObservableSequence<T>
    where
        T: Clone + PartialEq + Deserialize<'de> + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Self::decode(ListEncoding::deserialize(deserializer)?).map_err(D::Error::custom)
        }
    }

    impl<T> Serialize for ObservableSet<T>
    where
        T: Eq + Hash + Clone + Serialize + 'static,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.encode().serialize(serializer)
        }
    }

    impl<'de, T> Deserialize<'de> for ObservableSet<T>
    where
        T: Eq + Hash + Clone + Deserialize<'de> + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Self::decode(SetEncoding::deserialize(deserializer)?).map_err(D::Error::custom)
        }
    }

    impl<K, V> Serialize for ObservableMap<K, V>
    where
        K: Eq + Hash + Clone + Serialize + 'static,
        V: Clone + Serialize + 'static,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.encode().serialize(serializer)
        }
    }

    impl<'de, K, V> Deserialize<'de> for ObservableMap<K, V>
    where
        K: Eq + Hash + Clone + Deserialize<'de> + 'static,
        V: Clone + Deserialize<'de> + 'static,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            Self::decode(MapEncoding::deserialize(deserializer)?).map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[test]
    fn map_round_trip_keeps_associations() {
        let map = ObservableMap::new();
        map.add("x".to_string(), 1).unwrap();
        map.add("y".to_string(), 2).unwrap();

        let encoded = map.encode();
        assert_eq!(encoded.keys.len(), encoded.values.len());
        let decoded = ObservableMap::decode(encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get("x"), Some(1));
        assert_eq!(decoded.get("y"), Some(2));
    }

    #[test]
    fn map_encoding_is_aligned() {
        let map: ObservableMap<u16, u16> = (0..100).map(|k| (k, k + 1000)).collect();
        let MapEncoding { keys, values } = map.encode();
        for (k, v) in keys.iter().zip(&values) {
            assert_eq!(*k + 1000, *v);
        }
    }

    #[test]
    fn list_round_trip_keeps_order() {
        let seq = ObservableSequence::from_vec(vec![3, 1, 2, 1]);
        let decoded = ObservableSequence::decode(seq.encode()).unwrap();
        assert_eq!(decoded.to_vec(), vec![3, 1, 2, 1]);
    }

    #[test]
    fn set_round_trip_keeps_membership() {
        let set: ObservableSet<u32> = (0..20).collect();
        let encoded = set.encode();
        assert_eq!(encoded.items, set.to_vec());
        let decoded = ObservableSet::decode(encoded).unwrap();
        let a: HashSet<u32> = set.to_vec().into_iter().collect();
        let b: HashSet<u32> = decoded.to_vec().into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn set_decode_collapses_duplicates() {
        let decoded = ObservableSet::decode(SetEncoding {
            items: vec![1, 1, 2],
        })
        .unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn misaligned_map_encoding_rejected() {
        let err = ObservableMap::<u8, u8>::decode(MapEncoding {
            keys: vec![1, 2],
            values: vec![1],
        })
        .err();
        assert!(matches!(err, Some(ObservableError::InvalidArgument(_))));
    }

    #[test]
    fn repeated_map_key_rejected() {
        let err = ObservableMap::<u8, u8>::decode(MapEncoding {
            keys: vec![1, 1],
            values: vec![1, 2],
        })
        .err();
        assert_eq!(err, Some(ObservableError::DuplicateKey));
    }

    #[test]
    fn encode_emits_nothing() {
        let seq = ObservableSequence::from_vec(vec![1, 2]);
        let count = Rc::new(Cell::new(0u32));
        let c1 = Rc::clone(&count);
        let c2 = Rc::clone(&count);
        let _i = seq.subscribe_items(move |_| c1.set(c1.get() + 1));
        let _c = seq.subscribe_collection(move |_| c2.set(c2.get() + 1));

        let _ = seq.encode();
        assert_eq!(count.get(), 0);
        assert_eq!(seq.version(), 0);
    }

    #[test]
    fn decoded_container_starts_fresh() {
        let decoded = ObservableSequence::decode(ListEncoding { items: vec!['a'] }).unwrap();
        assert_eq!(decoded.version(), 0);
        assert_eq!(decoded.item_subscriber_count(), 0);
        assert_eq!(decoded.collection_subscriber_count(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_json_round_trip() {
        let map: ObservableMap<String, i64> =
            [("x".to_string(), 1), ("y".to_string(), 2)].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        let back: ObservableMap<String, i64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("x"), Some(1));
        assert_eq!(back.get("y"), Some(2));

        let seq = ObservableSequence::from_vec(vec![1u8, 2, 3]);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "[1,2,3]");

        let bad = serde_json::from_str::<ObservableMap<String, i64>>(
            r#"{"keys":["a","b"],"values":[1]}"#,
        );
        assert!(bad.is_err());
    }
}
