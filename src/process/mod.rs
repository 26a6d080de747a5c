// src/process/mod.rs
use arrow::{
    compute::concat_batches,
    csv::{ReaderBuilder, WriterBuilder},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::{
    fs,
    io::{BufWriter, Cursor, Write},
    path::Path,
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CleaningError;

pub mod clean;
pub mod convert;
pub mod date_parser;
pub mod schema;
pub mod summary;
pub mod utils;

pub use clean::{clean, BoundingBox, PriceRange, NYC_BOUNDING_BOX};
pub use summary::TableSummary;

/// Parse an in-memory CSV (header row required) into a single batch.
/// Every column comes back as nullable text; empty fields and the usual
/// missing-value tokens are null, as are trailing fields a short row omits.
/// A row with more fields than the header is an error.
pub fn read_csv(data: &[u8]) -> Result<RecordBatch, ArrowError> {
    let headers: Vec<String> = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data)
        .headers()
        .map_err(|e| ArrowError::CsvError(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    let schema = Arc::new(schema::raw_schema(&headers));
    if headers.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_truncated_rows(true)
        .with_null_regex(utils::missing_value_regex())
        .build(Cursor::new(data))?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    concat_batches(&schema, &batches)
}

/// Read the downloaded artifact at `path` into memory and parse it.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_listings(path: impl AsRef<Path>) -> Result<RecordBatch, CleaningError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| CleaningError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let batch = read_csv(&data).map_err(|source| CleaningError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "parsed"
    );
    Ok(batch)
}

/// Serialise `batch` as CSV to `out` (header row, no index column).
/// A whole-dollar `price` column is written without a fractional part.
pub fn write_csv<W: Write>(batch: &RecordBatch, out: W) -> Result<(), ArrowError> {
    let batch = match batch.schema().index_of(schema::PRICE) {
        Ok(idx) => match convert::whole_to_int64(batch.column(idx)) {
            Some(ints) => convert::replace_column(batch, idx, ints)?,
            None => batch.clone(),
        },
        Err(_) => batch.clone(),
    };
    let mut writer = WriterBuilder::new().with_header(true).build(out);
    writer.write(&batch)
}

/// Write `batch` to `path` via a temp file in the same directory, renamed
/// into place once complete. Returns the bytes written.
pub fn write_listings(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<u64, CleaningError> {
    let path = path.as_ref();
    let write_err = |source: ArrowError| CleaningError::Write {
        path: path.to_path_buf(),
        source,
    };
    let io_err = |source: std::io::Error| CleaningError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write_csv(batch, &mut out).map_err(write_err)?;
        out.flush().map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    let bytes = fs::metadata(path).map_err(io_err)?.len();
    debug!(path = %path.display(), bytes, rows = batch.num_rows(), "wrote csv");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, StringArray};
    use arrow::datatypes::DataType;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
id,name,host_id,host_name,neighbourhood_group,latitude,longitude,price,last_review,reviews_per_month
2539,Clean & quiet apt home by the park,2787,John,Brooklyn,40.64749,-73.97237,149,2018-10-19,0.21
2595,Skylit Midtown Castle,2845,Jennifer,Manhattan,40.75362,-73.98377,225,2019-05-21,0.38
3647,THE VILLAGE OF HARLEM....NEW YORK !,4632,Elisabeth,Manhattan,40.80902,-73.94190,150,,
5022,\"Entire Apt: Spacious Studio/Loft, by central park\",7192,,Manhattan,40.79851,-73.94399,80,2018-11-19,NA
";

    #[test]
    fn test_read_csv_all_text_with_nulls() {
        let batch = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.num_columns(), 10);
        assert!(batch
            .schema()
            .fields()
            .iter()
            .all(|f| f.data_type() == &DataType::Utf8));

        let names = batch.column_by_name("name").unwrap();
        let names = names.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(3), "Entire Apt: Spacious Studio/Loft, by central park");

        assert_eq!(batch.column_by_name("host_name").unwrap().null_count(), 1);
        assert_eq!(batch.column_by_name("last_review").unwrap().null_count(), 1);
        assert_eq!(
            batch.column_by_name("reviews_per_month").unwrap().null_count(),
            2
        );
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();
        assert!(matches!(
            load_listings(&path),
            Err(CleaningError::Parse { .. })
        ));
    }

    #[test]
    fn test_short_row_is_padded_with_nulls() {
        let data = "\
id,name,host_name,latitude,longitude,price,last_review,reviews_per_month
1,a,b,40.7,-73.9,50,2019-05-01
";
        let batch = read_csv(data.as_bytes()).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(
            batch.column_by_name("reviews_per_month").unwrap().null_count(),
            1
        );

        let cleaned = clean(&batch, PriceRange::new(10.0, 100.0)).unwrap();
        assert_eq!(cleaned.num_rows(), 1);
        let rpm = cleaned
            .column_by_name("reviews_per_month")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(rpm.value(0), 0.0);
    }

    #[test]
    fn test_whole_prices_written_without_fraction() {
        let data = "\
id,name,host_name,latitude,longitude,price,last_review,reviews_per_month
1,a,b,40.7,-73.9,50,2019-05-01,0.5
2,c,d,40.7,-73.9,75,,
";
        let cleaned = clean(&read_csv(data.as_bytes()).unwrap(), PriceRange::new(10.0, 100.0))
            .unwrap();
        let mut out = Vec::new();
        write_csv(&cleaned, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines().skip(1);
        assert_eq!(lines.next().unwrap(), "1,a,b,40.7,-73.9,50,2019-05-01,0.5");
        assert!(lines.next().unwrap().starts_with("2,c,d,40.7,-73.9,75,,"));

        // the cleaned table itself keeps float prices
        assert_eq!(
            cleaned.column_by_name("price").unwrap().data_type(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_listings(dir.path().join("absent.csv")),
            Err(CleaningError::Io { .. })
        ));
    }

    #[test]
    fn test_clean_write_reload_is_stable() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.csv");
        let output = dir.path().join("clean_sample.csv");
        fs::write(&input, SAMPLE).unwrap();

        let range = PriceRange::new(10.0, 200.0);
        let cleaned = clean(&load_listings(&input).unwrap(), range).unwrap();
        assert_eq!(cleaned.num_rows(), 3);

        let bytes = write_listings(&cleaned, &output).unwrap();
        assert!(bytes > 0);

        let text = fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,name,host_id,host_name,neighbourhood_group,latitude,longitude,price,last_review,reviews_per_month"
        );
        assert!(text.contains("2018-10-19"));

        let reloaded = clean(&load_listings(&output).unwrap(), range).unwrap();
        assert_eq!(reloaded, cleaned);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let batch = read_csv(SAMPLE.as_bytes()).unwrap();
        write_listings(&batch, dir.path().join("out.csv")).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
