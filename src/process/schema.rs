use arrow::{
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};

use crate::error::CleaningError;

pub const PRICE: &str = "price";
pub const LAST_REVIEW: &str = "last_review";
pub const NAME: &str = "name";
pub const HOST_NAME: &str = "host_name";
pub const REVIEWS_PER_MONTH: &str = "reviews_per_month";
pub const LONGITUDE: &str = "longitude";
pub const LATITUDE: &str = "latitude";

/// Columns the cleaning rules read or rewrite.
pub const REQUIRED_COLUMNS: &[&str] = &[
    PRICE,
    LAST_REVIEW,
    NAME,
    HOST_NAME,
    REVIEWS_PER_MONTH,
    LONGITUDE,
    LATITUDE,
];

/// Every column is read as nullable text; typing happens during cleaning.
pub fn raw_schema(headers: &[String]) -> Schema {
    Schema::new(
        headers
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

/// Position of a required column, or `MissingColumn` if the table lacks it.
pub fn column_index(batch: &RecordBatch, name: &'static str) -> Result<usize, CleaningError> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| CleaningError::MissingColumn(name))
}

pub fn check_required_columns(batch: &RecordBatch) -> Result<(), CleaningError> {
    for &name in REQUIRED_COLUMNS {
        column_index(batch, name)?;
    }
    Ok(())
}
