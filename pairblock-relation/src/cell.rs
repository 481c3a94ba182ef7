use std::fmt;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array,
    Int64Array, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use pairblock_result::{Error, Result};

/// A single cell value, with NULL handling.
///
/// This is the dynamically-typed currency of the blocking layer: join-map
/// keys, inverted-index probes, and predicate inputs all move through it.
/// Floats are stored as raw bits so the enum can implement `Eq` and `Hash`;
/// two floats compare equal exactly when their bit patterns do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    /// `f32` bit pattern.
    Float32(u32),
    /// `f64` bit pattern.
    Float64(u64),
    Utf8(String),
}

macro_rules! extract_primitive {
    ($column:expr, $row:expr, $array:ty, $variant:ident) => {
        CellValue::$variant(
            $column
                .as_any()
                .downcast_ref::<$array>()
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "array type mismatch: expected {}",
                        stringify!($array)
                    ))
                })?
                .value($row),
        )
    };
}

impl CellValue {
    /// Extract the cell at `row` from an Arrow array.
    ///
    /// Returns [`CellValue::Null`] for null slots. Types outside the
    /// supported set fail with an internal error rather than silently
    /// degrading to text.
    pub fn from_array(column: &ArrayRef, row: usize) -> Result<CellValue> {
        if column.is_null(row) {
            return Ok(CellValue::Null);
        }

        let value = match column.data_type() {
            DataType::Boolean => extract_primitive!(column, row, BooleanArray, Boolean),
            DataType::Int8 => extract_primitive!(column, row, Int8Array, Int8),
            DataType::Int16 => extract_primitive!(column, row, Int16Array, Int16),
            DataType::Int32 => extract_primitive!(column, row, Int32Array, Int32),
            DataType::Int64 => extract_primitive!(column, row, Int64Array, Int64),
            DataType::UInt8 => extract_primitive!(column, row, UInt8Array, UInt8),
            DataType::UInt16 => extract_primitive!(column, row, UInt16Array, UInt16),
            DataType::UInt32 => extract_primitive!(column, row, UInt32Array, UInt32),
            DataType::UInt64 => extract_primitive!(column, row, UInt64Array, UInt64),
            DataType::Float32 => {
                let val = column
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| Error::Internal("array type mismatch: Float32".into()))?
                    .value(row);
                CellValue::Float32(val.to_bits())
            }
            DataType::Float64 => {
                let val = column
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| Error::Internal("array type mismatch: Float64".into()))?
                    .value(row);
                CellValue::Float64(val.to_bits())
            }
            DataType::Utf8 => CellValue::Utf8(
                column
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| Error::Internal("array type mismatch: Utf8".into()))?
                    .value(row)
                    .to_string(),
            ),
            dt => {
                return Err(Error::Internal(format!(
                    "unsupported cell type for blocking: {dt:?}"
                )));
            }
        };

        Ok(value)
    }

    /// True for [`CellValue::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Boolean(v) => write!(f, "{v}"),
            CellValue::Int8(v) => write!(f, "{v}"),
            CellValue::Int16(v) => write!(f, "{v}"),
            CellValue::Int32(v) => write!(f, "{v}"),
            CellValue::Int64(v) => write!(f, "{v}"),
            CellValue::UInt8(v) => write!(f, "{v}"),
            CellValue::UInt16(v) => write!(f, "{v}"),
            CellValue::UInt32(v) => write!(f, "{v}"),
            CellValue::UInt64(v) => write!(f, "{v}"),
            CellValue::Float32(bits) => write!(f, "{}", f32::from_bits(*bits)),
            CellValue::Float64(bits) => write!(f, "{}", f64::from_bits(*bits)),
            CellValue::Utf8(v) => write!(f, "{v}"),
        }
    }
}
