//! Dtype-tagged host values
//!
//! A host runtime hands arrays across as a tagged JSON object:
//! `{"type": "array", "dtype": "float64", "shape": [2, 3], "data": "<base64>"}`
//! with little-endian, row-major element bytes. Strings and raw bytes use
//! `{"type": "string", ...}` and `{"type": "bytes", ...}`. Converting such a
//! value into a native buffer checks the dtype and rank against what the
//! native call declares instead of reinterpreting the bytes.

use std::convert::TryFrom;

use base64::Engine;
use byteorder::{ByteOrder, LittleEndian};
use serde_json::{json, Value};

use crate::errors::{Result, SpiceError};
use crate::marshal::numeric::NativeMatrix;
use crate::types::{NativeElement, SpiceBoolean, SpiceDouble, SpiceInt};

/// Values a host runtime can hand to the binding layer
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Bytes data (base64 encoded on the wire)
    Bytes(Vec<u8>),

    /// String data
    String(String),

    /// Array data with shape and dtype
    Array(HostArray),
}

/// A host array: dtype tag, shape and little-endian row-major element bytes
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

/// Native element types with a little-endian wire encoding
pub trait WireElement: NativeElement {
    /// Bytes per element
    const SIZE: usize;

    fn read_all(src: &[u8], dst: &mut [Self]);

    fn write_all(src: &[Self], dst: &mut [u8]);
}

impl WireElement for SpiceDouble {
    const SIZE: usize = 8;

    fn read_all(src: &[u8], dst: &mut [Self]) {
        LittleEndian::read_f64_into(src, dst);
    }

    fn write_all(src: &[Self], dst: &mut [u8]) {
        LittleEndian::write_f64_into(src, dst);
    }
}

impl WireElement for SpiceInt {
    const SIZE: usize = 4;

    fn read_all(src: &[u8], dst: &mut [Self]) {
        LittleEndian::read_i32_into(src, dst);
    }

    fn write_all(src: &[Self], dst: &mut [u8]) {
        LittleEndian::write_i32_into(src, dst);
    }
}

/// Product of the extents, or `TypeMismatch` if it overflows
fn element_count(shape: &[usize]) -> Result<usize> {
    if shape.contains(&0) {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
        .ok_or_else(|| {
            SpiceError::type_mismatch(format!(
                "shape {:?} exceeds the addressable element count",
                shape
            ))
        })
}

impl HostArray {
    /// Encode a native buffer of the given shape
    pub fn from_native<N: WireElement>(values: &[N], shape: Vec<usize>) -> Result<Self> {
        let expected = element_count(&shape)?;
        if expected != values.len() {
            return Err(SpiceError::type_mismatch(format!(
                "shape {:?} holds {} elements, buffer has {}",
                shape,
                expected,
                values.len()
            )));
        }
        let mut data = vec![0u8; values.len() * N::SIZE];
        N::write_all(values, &mut data);
        Ok(Self {
            dtype: N::DTYPE.to_string(),
            shape,
            data,
        })
    }

    /// Number of elements implied by the shape
    ///
    /// Saturates at `usize::MAX` for shapes too large to address; decoding
    /// such a shape fails with `TypeMismatch`.
    pub fn len(&self) -> usize {
        element_count(&self.shape).unwrap_or(usize::MAX)
    }

    /// True when the shape has a zero extent
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn decode<N: WireElement>(&self) -> Result<Vec<N>> {
        if self.dtype != N::DTYPE {
            return Err(SpiceError::type_mismatch(format!(
                "expected dtype {}, got {}",
                N::DTYPE,
                self.dtype
            )));
        }
        let count = element_count(&self.shape)?;
        let expected = count.checked_mul(N::SIZE).ok_or_else(|| {
            SpiceError::type_mismatch(format!(
                "{} elements of {} exceed the addressable size",
                count,
                N::DTYPE
            ))
        })?;
        if self.data.len() != expected {
            return Err(SpiceError::type_mismatch(format!(
                "{} bytes cannot hold {} elements of {}",
                self.data.len(),
                count,
                N::DTYPE
            )));
        }
        let mut out = vec![N::default(); count];
        N::read_all(&self.data, &mut out);
        Ok(out)
    }

    /// Native vector, requiring rank 1 and an exact dtype match
    pub fn to_native_vector<N: WireElement>(&self) -> Result<Vec<N>> {
        if self.shape.len() != 1 {
            return Err(SpiceError::type_mismatch(format!(
                "expected a 1-D array, got shape {:?}",
                self.shape
            )));
        }
        self.decode()
    }

    /// Native row-major matrix, requiring rank 2 and an exact dtype match
    pub fn to_native_matrix<N: WireElement>(&self) -> Result<NativeMatrix<N>> {
        if self.shape.len() != 2 {
            return Err(SpiceError::type_mismatch(format!(
                "expected a 2-D array, got shape {:?}",
                self.shape
            )));
        }
        let data = self.decode()?;
        Ok(NativeMatrix::from_parts(data, self.shape[0], self.shape[1]))
    }

    /// Native boolean vector from a one-byte-per-element `bool` array
    pub fn to_native_bools(&self) -> Result<Vec<SpiceBoolean>> {
        if self.dtype != "bool" || self.shape.len() != 1 {
            return Err(SpiceError::type_mismatch(format!(
                "expected a 1-D bool array, got {} with shape {:?}",
                self.dtype, self.shape
            )));
        }
        let count = element_count(&self.shape)?;
        if self.data.len() != count {
            return Err(SpiceError::type_mismatch(format!(
                "{} bytes cannot hold {} bools",
                self.data.len(),
                count
            )));
        }
        Ok(self.data.iter().map(|&b| SpiceBoolean::from(b != 0)).collect())
    }
}

impl HostValue {
    /// Encode into the tagged JSON form
    pub fn to_json(&self) -> String {
        let engine = base64::engine::general_purpose::STANDARD;
        let value = match self {
            HostValue::Bytes(bytes) => json!({"type": "bytes", "data": engine.encode(bytes)}),
            HostValue::String(s) => json!({"type": "string", "data": s}),
            HostValue::Array(array) => json!({
                "type": "array",
                "dtype": array.dtype,
                "shape": array.shape,
                "data": engine.encode(&array.data),
            }),
        };
        value.to_string()
    }
}

fn decode_base64(data: &Value) -> Result<Vec<u8>> {
    let base64_data = data
        .as_str()
        .ok_or_else(|| SpiceError::Serialization("'data' field should be a string".into()))?;

    base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| SpiceError::Serialization(format!("Invalid base64: {}", e)))
}

impl TryFrom<&str> for HostValue {
    type Error = SpiceError;

    fn try_from(json_str: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| SpiceError::Serialization(e.to_string()))?;

        let obj = value
            .as_object()
            .ok_or_else(|| SpiceError::Serialization("Expected JSON object".into()))?;

        let value_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SpiceError::Serialization("Missing 'type' field".into()))?;

        let data = obj
            .get("data")
            .ok_or_else(|| SpiceError::Serialization("Missing 'data' field".into()))?;

        match value_type {
            "bytes" => Ok(HostValue::Bytes(decode_base64(data)?)),
            "string" => {
                let string_data = data.as_str().ok_or_else(|| {
                    SpiceError::Serialization("'data' field should be a string".into())
                })?;

                Ok(HostValue::String(string_data.to_string()))
            }
            "array" => {
                let dtype = obj
                    .get("dtype")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SpiceError::Serialization("Missing 'dtype' field".into()))?
                    .to_string();

                let shape = obj
                    .get("shape")
                    .and_then(Value::as_array)
                    .ok_or_else(|| SpiceError::Serialization("Missing 'shape' field".into()))?
                    .iter()
                    .map(|v| {
                        v.as_u64().and_then(|v| usize::try_from(v).ok()).ok_or_else(|| {
                            SpiceError::Serialization("Shape should be array of integers".into())
                        })
                    })
                    .collect::<Result<Vec<usize>>>()?;

                Ok(HostValue::Array(HostArray {
                    dtype,
                    shape,
                    data: decode_base64(data)?,
                }))
            }
            _ => Err(SpiceError::Serialization(format!(
                "Unknown value type: {}",
                value_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_deserialization() {
        // 2x3 float64 array [[1, 2, 3], [4, 5, 6]]
        let values = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut bytes = vec![0u8; 48];
        LittleEndian::write_f64_into(&values, &mut bytes);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let json = format!(
            r#"{{"type": "array", "dtype": "float64", "shape": [2, 3], "data": "{}"}}"#,
            encoded
        );

        let value = HostValue::try_from(json.as_str()).unwrap();
        match value {
            HostValue::Array(array) => {
                assert_eq!(array.dtype, "float64");
                assert_eq!(array.shape, vec![2, 3]);
                let m = array.to_native_matrix::<SpiceDouble>().unwrap();
                assert_eq!(m.shape(), (2, 3));
                assert_eq!(m.as_slice(), &values);

                // rank and dtype are both enforced
                assert!(matches!(
                    array.to_native_vector::<SpiceDouble>(),
                    Err(SpiceError::TypeMismatch(_))
                ));
                assert!(matches!(
                    array.to_native_matrix::<SpiceInt>(),
                    Err(SpiceError::TypeMismatch(_))
                ));
            }
            other => panic!("Expected Array, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let json = r#"{"type":"array","dtype":"float64","shape":[4294967296,4294967296],"data":""}"#;
        let array = match HostValue::try_from(json).unwrap() {
            HostValue::Array(array) => array,
            other => panic!("Expected Array, got {:?}", other),
        };
        assert_eq!(array.len(), usize::MAX);
        assert!(!array.is_empty());
        assert!(matches!(
            array.to_native_matrix::<SpiceDouble>(),
            Err(SpiceError::TypeMismatch(_))
        ));

        let vector = HostArray {
            dtype: "float64".to_string(),
            shape: vec![usize::MAX / 4],
            data: Vec::new(),
        };
        assert!(matches!(
            vector.to_native_vector::<SpiceDouble>(),
            Err(SpiceError::TypeMismatch(_))
        ));

        let bools = HostArray {
            dtype: "bool".to_string(),
            shape: vec![usize::MAX, 2],
            data: Vec::new(),
        };
        assert!(bools.to_native_bools().is_err());

        assert!(matches!(
            HostArray::from_native::<SpiceDouble>(&[], vec![usize::MAX, 3]),
            Err(SpiceError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let array = HostArray::from_native::<SpiceInt>(&[10, -20, 399], vec![3]).unwrap();
        let value = HostValue::Array(array);
        let back = HostValue::try_from(value.to_json().as_str()).unwrap();
        assert_eq!(back, value);

        if let HostValue::Array(array) = back {
            assert_eq!(array.to_native_vector::<SpiceInt>().unwrap(), vec![10, -20, 399]);
        }

        let value = HostValue::Bytes(b"abcd".to_vec());
        assert_eq!(HostValue::try_from(value.to_json().as_str()).unwrap(), value);

        let value = HostValue::String("J2000".into());
        assert_eq!(HostValue::try_from(value.to_json().as_str()).unwrap(), value);
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let array = HostArray {
            dtype: "float64".into(),
            shape: vec![2],
            data: vec![0u8; 12],
        };
        assert!(matches!(
            array.to_native_vector::<SpiceDouble>(),
            Err(SpiceError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_on_encode() {
        assert!(HostArray::from_native::<SpiceDouble>(&[1.0, 2.0], vec![3]).is_err());
    }

    #[test]
    fn test_bool_arrays() {
        let array = HostArray {
            dtype: "bool".into(),
            shape: vec![3],
            data: vec![1, 0, 1],
        };
        assert_eq!(array.to_native_bools().unwrap(), vec![1, 0, 1]);

        let wrong = HostArray {
            dtype: "int32".into(),
            shape: vec![1],
            data: vec![0; 4],
        };
        assert!(wrong.to_native_bools().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            HostValue::try_from("[1, 2]"),
            Err(SpiceError::Serialization(_))
        ));
        assert!(matches!(
            HostValue::try_from(r#"{"type": "tensor", "data": ""}"#),
            Err(SpiceError::Serialization(_))
        ));
        assert!(matches!(
            HostValue::try_from(r#"{"type": "bytes", "data": "!!!"}"#),
            Err(SpiceError::Serialization(_))
        ));
    }
}
