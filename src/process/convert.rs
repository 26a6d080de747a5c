use crate::process::{date_parser, utils};
use arrow::{
    array::{Array, ArrayRef, Date32Builder, Float64Array, Float64Builder, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Date32Type, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Numeric view of a column. Text that does not parse becomes null;
/// an already-numeric `Float64` column is returned as is.
pub fn to_float64(arr: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    if arr.data_type() == &DataType::Float64 {
        return Ok(arr.clone());
    }
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        let mut b = Float64Builder::with_capacity(sarr.len());
        for opt in sarr.iter() {
            b.append_option(opt.and_then(utils::parse_number));
        }
        return Ok(Arc::new(b.finish()) as ArrayRef);
    }
    // ints, other float widths, large strings: arrow's safe cast nulls failures
    cast(arr, &DataType::Float64)
}

/// Calendar-date view of a column (`Date32`). Unparseable text becomes null.
pub fn to_date32(arr: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    if arr.data_type() == &DataType::Date32 {
        return Ok(arr.clone());
    }
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        let mut b = Date32Builder::with_capacity(sarr.len());
        for opt in sarr.iter() {
            let days = opt
                .and_then(date_parser::parse_calendar_date)
                .map(Date32Type::from_naive_date);
            b.append_option(days);
        }
        return Ok(Arc::new(b.finish()) as ArrayRef);
    }
    if arr.data_type() == &DataType::Null {
        return Ok(arrow::array::new_null_array(&DataType::Date32, arr.len()));
    }
    cast(arr, &DataType::Date32)
}

/// `Int64` copy of a `Float64` column holding only whole numbers (nulls
/// allowed). `None` for any other column.
pub fn whole_to_int64(arr: &ArrayRef) -> Option<ArrayRef> {
    let floats = arr.as_any().downcast_ref::<Float64Array>()?;
    // beyond 2^53 a float no longer round-trips through i64
    let whole = floats
        .iter()
        .flatten()
        .all(|v| v.fract() == 0.0 && v.abs() <= 9_007_199_254_740_992.0);
    if !whole {
        return None;
    }
    let ints: Int64Array = floats.iter().map(|v| v.map(|v| v as i64)).collect();
    Some(Arc::new(ints) as ArrayRef)
}

/// Swap column `idx` for `array`, retyping its field to match.
pub fn replace_column(
    batch: &RecordBatch,
    idx: usize,
    array: ArrayRef,
) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == idx {
                Field::new(f.name(), array.data_type().clone(), true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();

    let mut columns = batch.columns().to_vec();
    columns[idx] = array;

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(schema), columns)
}
