use arrow::{array::Array, datatypes::DataType, record_batch::RecordBatch};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub non_null: usize,
    pub data_type: DataType,
}

/// Row count plus per-column type and non-null count of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

impl TableSummary {
    pub fn of(batch: &RecordBatch) -> Self {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, col)| ColumnInfo {
                name: field.name().clone(),
                non_null: col.len() - col.null_count(),
                data_type: field.data_type().clone(),
            })
            .collect();
        Self {
            rows: batch.num_rows(),
            columns,
        }
    }
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max("Column".len());

        writeln!(f, "{} entries, {} columns", self.rows, self.columns.len())?;
        writeln!(f, " #   {:<width$}  Non-Null Count  Dtype", "Column")?;
        for (i, c) in self.columns.iter().enumerate() {
            writeln!(
                f,
                " {:<3} {:<width$}  {:<14}  {}",
                i,
                c.name,
                format!("{} non-null", c.non_null),
                c.data_type
            )?;
        }
        Ok(())
    }
}
