//! # Row Schemas
//!
//! The flat record shapes shared by every reader and writer of Sphynx data.
//! Row files are positional postcard, so field order and types are the
//! on-disk contract and must not change. Field names only surface in
//! self-describing encodings such as JSON:
//!
//! | row                              | fields                                       |
//! |----------------------------------|----------------------------------------------|
//! | `VertexRow`                      | `id: int64`                                  |
//! | `EdgeRow`                        | `id: int64, src: int64, dst: int64`          |
//! | `SingleStringAttributeRow`       | `id: int64, value: utf8`                     |
//! | `SingleDoubleAttributeRow`       | `id: int64, value: double`                   |
//! | `SingleDoubleTuple2AttributeRow` | `id: int64, value1: double, value2: double`  |

use crate::entity::ColumnValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRow {
    pub id: i64,
}

/// One edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub id: i64,
    pub src: i64,
    pub dst: i64,
}

/// One defined value of a string attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleStringAttributeRow {
    pub id: i64,
    pub value: String,
}

/// One defined value of a double attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleDoubleAttributeRow {
    pub id: i64,
    pub value: f64,
}

/// One defined value of a double-pair attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleDoubleTuple2AttributeRow {
    pub id: i64,
    pub value1: f64,
    pub value2: f64,
}

/// Row shape of an attribute column with values of type `Self::Value`.
pub trait AttributeRow: Serialize + DeserializeOwned {
    type Value: ColumnValue;

    fn from_parts(id: i64, value: &Self::Value) -> Self;

    fn into_parts(self) -> (i64, Self::Value);
}

impl AttributeRow for SingleStringAttributeRow {
    type Value = String;

    fn from_parts(id: i64, value: &String) -> Self {
        Self {
            id,
            value: value.clone(),
        }
    }

    fn into_parts(self) -> (i64, String) {
        (self.id, self.value)
    }
}

impl AttributeRow for SingleDoubleAttributeRow {
    type Value = f64;

    fn from_parts(id: i64, value: &f64) -> Self {
        Self { id, value: *value }
    }

    fn into_parts(self) -> (i64, f64) {
        (self.id, self.value)
    }
}

impl AttributeRow for SingleDoubleTuple2AttributeRow {
    type Value = (f64, f64);

    fn from_parts(id: i64, value: &(f64, f64)) -> Self {
        Self {
            id,
            value1: value.0,
            value2: value.1,
        }
    }

    fn into_parts(self) -> (i64, (f64, f64)) {
        (self.id, (self.value1, self.value2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postcard_rows_are_positional() {
        // Zigzag varints in declaration order: id, src, dst.
        let edge = postcard::to_stdvec(&EdgeRow {
            id: 7,
            src: 0,
            dst: 1,
        })
        .expect("encode");
        assert_eq!(edge, vec![14, 0, 2]);

        let double = postcard::to_stdvec(&SingleDoubleAttributeRow { id: 1, value: 1.5 })
            .expect("encode");
        let mut expected = vec![2];
        expected.extend_from_slice(&1.5f64.to_le_bytes());
        assert_eq!(double, expected);
    }

    #[test]
    fn json_field_names() {
        let edge = serde_json::to_value(EdgeRow {
            id: 7,
            src: 0,
            dst: 1,
        })
        .expect("json");
        assert_eq!(edge, serde_json::json!({"id": 7, "src": 0, "dst": 1}));

        let pair = serde_json::to_value(SingleDoubleTuple2AttributeRow {
            id: 2,
            value1: 1.5,
            value2: -2.5,
        })
        .expect("json");
        assert_eq!(
            pair,
            serde_json::json!({"id": 2, "value1": 1.5, "value2": -2.5})
        );
    }

    #[test]
    fn tuple_row_parts() {
        let row = SingleDoubleTuple2AttributeRow::from_parts(4, &(1.0, 2.0));
        assert_eq!(row.into_parts(), (4, (1.0, 2.0)));
    }
}
