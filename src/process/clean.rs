use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray},
    compute::filter_record_batch,
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::CleaningError;
use crate::process::{
    convert::{replace_column, to_date32, to_float64},
    schema::{
        check_required_columns, column_index, HOST_NAME, LAST_REVIEW, LATITUDE, LONGITUDE, NAME,
        PRICE, REVIEWS_PER_MONTH,
    },
};

/// Inclusive price window for the outlier filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Longitude/latitude rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

/// New York City. Listings outside are dropped.
pub const NYC_BOUNDING_BOX: BoundingBox = BoundingBox {
    min_longitude: -74.25,
    max_longitude: -73.50,
    min_latitude: 40.5,
    max_latitude: 41.2,
};

impl BoundingBox {
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        between(longitude, self.min_longitude, self.max_longitude)
            && between(latitude, self.min_latitude, self.max_latitude)
    }
}

/// NaN on either side compares false.
fn between(v: f64, lo: f64, hi: f64) -> bool {
    lo <= v && v <= hi
}

/// Apply the cleaning rules, in order:
///
/// 1. drop rows whose `price` is outside `range` (or not a number)
/// 2. parse `last_review` into a calendar date, null when unparseable
/// 3. fill missing `name`/`host_name` with "" and `reviews_per_month` with 0
/// 4. drop rows outside [`NYC_BOUNDING_BOX`]
///
/// Surviving rows keep their input order. Already-typed columns are
/// accepted, so cleaning a cleaned table returns it unchanged.
#[tracing::instrument(level = "debug", skip(batch), fields(rows_in = batch.num_rows()))]
pub fn clean(batch: &RecordBatch, range: PriceRange) -> Result<RecordBatch, CleaningError> {
    check_required_columns(batch)?;
    if range.min > range.max {
        warn!(
            min_price = range.min,
            max_price = range.max,
            "min_price exceeds max_price; every row will be dropped"
        );
    }

    info!(
        "Filtering prices between 'min={}' and 'max={}'",
        range.min, range.max
    );
    let batch = filter_price(batch, range)?;

    info!("Converting last_review to date");
    let batch = normalize_last_review(&batch)?;

    info!("Fill missing values with either '0' or empty string");
    let batch = impute_missing(&batch)?;

    let batch = filter_bounding_box(&batch, &NYC_BOUNDING_BOX)?;
    debug!(rows_out = batch.num_rows(), "cleaning done");
    Ok(batch)
}

fn filter_price(batch: &RecordBatch, range: PriceRange) -> Result<RecordBatch, CleaningError> {
    let idx = column_index(batch, PRICE)?;
    let price = to_float64(batch.column(idx))?;
    let batch = replace_column(batch, idx, price.clone())?;

    let prices = float_column(&price)?;
    let keep: BooleanArray = prices
        .iter()
        .map(|v| Some(v.is_some_and(|p| between(p, range.min, range.max))))
        .collect();

    let kept = filter_record_batch(&batch, &keep)?;
    debug!(
        dropped = batch.num_rows() - kept.num_rows(),
        "price filter"
    );
    Ok(kept)
}

fn normalize_last_review(batch: &RecordBatch) -> Result<RecordBatch, CleaningError> {
    let idx = column_index(batch, LAST_REVIEW)?;
    let dates = to_date32(batch.column(idx))?;
    Ok(replace_column(batch, idx, dates)?)
}

fn impute_missing(batch: &RecordBatch) -> Result<RecordBatch, CleaningError> {
    let mut batch = batch.clone();
    for name in [NAME, HOST_NAME] {
        let idx = column_index(&batch, name)?;
        let filled = fill_text(batch.column(idx));
        batch = replace_column(&batch, idx, filled)?;
    }

    let idx = column_index(&batch, REVIEWS_PER_MONTH)?;
    let reviews = to_float64(batch.column(idx))?;
    let filled: Float64Array = float_column(&reviews)?
        .iter()
        .map(|v| Some(v.unwrap_or(0.0)))
        .collect();
    Ok(replace_column(&batch, idx, Arc::new(filled) as ArrayRef)?)
}

/// Nulls become "". Non-text columns are rendered as text first.
fn fill_text(arr: &ArrayRef) -> ArrayRef {
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        if sarr.null_count() == 0 {
            return arr.clone();
        }
        let filled: StringArray = sarr.iter().map(|v| Some(v.unwrap_or(""))).collect();
        return Arc::new(filled) as ArrayRef;
    }
    let filled: StringArray = (0..arr.len())
        .map(|i| {
            if arr.is_null(i) {
                Some(String::new())
            } else {
                arrow::util::display::array_value_to_string(arr, i).ok()
            }
        })
        .collect();
    Arc::new(filled) as ArrayRef
}

fn filter_bounding_box(
    batch: &RecordBatch,
    bbox: &BoundingBox,
) -> Result<RecordBatch, CleaningError> {
    let lon_idx = column_index(batch, LONGITUDE)?;
    let lon = to_float64(batch.column(lon_idx))?;
    let batch = replace_column(batch, lon_idx, lon.clone())?;

    let lat_idx = column_index(&batch, LATITUDE)?;
    let lat = to_float64(batch.column(lat_idx))?;
    let batch = replace_column(&batch, lat_idx, lat.clone())?;

    let keep: BooleanArray = float_column(&lon)?
        .iter()
        .zip(float_column(&lat)?.iter())
        .map(|(x, y)| Some(matches!((x, y), (Some(x), Some(y)) if bbox.contains(x, y))))
        .collect();

    let kept = filter_record_batch(&batch, &keep)?;
    debug!(
        dropped = batch.num_rows() - kept.num_rows(),
        "bounding box filter"
    );
    Ok(kept)
}

fn float_column(arr: &ArrayRef) -> Result<&Float64Array, ArrowError> {
    arr.as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ArrowError::CastError(format!("expected Float64, found {}", arr.data_type())))
}
