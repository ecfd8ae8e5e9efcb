//! Typed n-dimensional arrays with a numpy compatible serde form
//!
//! Arrays serialize as the map produced by `msgpack_numpy`:
//!
//! | key     | value                                   |
//! |---------|-----------------------------------------|
//! | `nd`    | `true`                                  |
//! | `type`  | numpy dtype string, e.g. `<u2`          |
//! | `kind`  | empty binary                            |
//! | `shape` | sequence of dimensions                  |
//! | `data`  | little-endian element bytes, row-major  |
//!
//! Keys are written as binary strings, matching what numpy based clients expect.

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::{ByteBuf, Bytes};
use std::fmt;
use std::marker::PhantomData;

use crate::{BridgeError, Result};

/// Numeric element types that can live in an [`NdArray`].
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// numpy dtype string
    const DTYPE: &'static str;
    /// Size of one element in bytes
    const SIZE: usize;

    /// Append the little-endian bytes of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read one element from exactly `SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:literal) => {
        impl Element for $ty {
            const DTYPE: &'static str = $dtype;
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }
        }
    };
}

impl_element!(u8, "|u1");
impl_element!(i8, "|i1");
impl_element!(u16, "<u2");
impl_element!(u32, "<u4");
impl_element!(u64, "<u8");

/// Row-major n-dimensional array.
#[derive(Clone, PartialEq)]
pub struct NdArray<T: Element> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> NdArray<T> {
    /// Create an array, checking the element count against the shape.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(BridgeError::Array { shape, len: data.len() });
        }
        Ok(Self { shape, data })
    }

    /// Build from parts the caller already knows to agree.
    pub(crate) fn from_shape_unchecked(shape: Vec<usize>, data: Vec<T>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    /// One-dimensional array over `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { shape: vec![data.len()], data }
    }

    /// One-dimensional array of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from_vec(vec![value; len])
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> &'static str {
        T::DTYPE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Element at a multi-dimensional index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.get(flat).copied()
    }

    /// Little-endian byte image of the elements.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * T::SIZE);
        for &value in &self.data {
            value.write_le(&mut out);
        }
        out
    }

    fn from_le_bytes(shape: Vec<usize>, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % T::SIZE != 0 {
            return Err(BridgeError::decode(format!(
                "{} bytes is not a multiple of the {} element size",
                bytes.len(),
                T::DTYPE
            )));
        }
        let data = bytes.chunks_exact(T::SIZE).map(T::read_le).collect();
        Self::new(shape, data)
    }
}

impl<T: Element> fmt::Debug for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Image tensors hold millions of samples
        f.debug_struct("NdArray")
            .field("dtype", &T::DTYPE)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl<T: Element> Serialize for NdArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = self.to_le_bytes();
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(Bytes::new(b"nd"), &true)?;
        map.serialize_entry(Bytes::new(b"type"), T::DTYPE)?;
        map.serialize_entry(Bytes::new(b"kind"), Bytes::new(b""))?;
        map.serialize_entry(Bytes::new(b"shape"), &self.shape)?;
        map.serialize_entry(Bytes::new(b"data"), Bytes::new(&data))?;
        map.end()
    }
}

impl<'de, T: Element> Deserialize<'de> for NdArray<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(NdArrayVisitor(PhantomData))
    }
}

struct NdArrayVisitor<T>(PhantomData<T>);

impl<'de, T: Element> Visitor<'de> for NdArrayVisitor<T> {
    type Value = NdArray<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a numpy array map of dtype {}", T::DTYPE)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut nd = false;
        let mut dtype: Option<String> = None;
        let mut shape: Option<Vec<usize>> = None;
        let mut data: Option<ByteBuf> = None;

        while let Some(key) = map.next_key::<ByteBuf>()? {
            match key.as_slice() {
                b"nd" => nd = map.next_value()?,
                b"type" => dtype = Some(map.next_value()?),
                b"kind" => {
                    map.next_value::<ByteBuf>()?;
                }
                b"shape" => shape = Some(map.next_value()?),
                b"data" => data = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        if !nd {
            return Err(de::Error::custom("map is not tagged as an nd array"));
        }
        let dtype = dtype.ok_or_else(|| de::Error::missing_field("type"))?;
        if dtype != T::DTYPE {
            return Err(de::Error::custom(format!(
                "dtype mismatch: expected {}, found {}",
                T::DTYPE,
                dtype
            )));
        }
        let shape = shape.ok_or_else(|| de::Error::missing_field("shape"))?;
        let data = data.ok_or_else(|| de::Error::missing_field("data"))?;

        NdArray::from_le_bytes(shape, &data).map_err(de::Error::custom)
    }
}
