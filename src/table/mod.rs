//! In-memory tabular data with an explicit schema.
//!
//! [`Table`] is row oriented: every row holds exactly one [`Value`] per
//! schema field, and every non-null value matches its column's
//! [`DataType`]. Column presence and type checks go through
//! [`Table::require_column`] and friends so that callers get a
//! [`DataError`] instead of a panic.

pub mod coerce;
mod schema;
mod value;

pub use schema::{Field, Schema};
pub use value::{DATE_FORMAT, DataType, TIMESTAMP_FORMAT, Value};

use chrono::NaiveDateTime;
use serde_json::Map;
use std::collections::HashSet;

use crate::error::{DataError, DataResult};

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    pub fn dtype(&self, name: &str) -> Option<DataType> {
        self.column_index(name).map(|i| self.schema.field(i).dtype)
    }

    pub fn require_column(&self, name: &str) -> DataResult<usize> {
        self.column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Index of `name`, failing unless the column is int or float.
    pub fn require_numeric(&self, name: &str) -> DataResult<usize> {
        let idx = self.require_column(name)?;
        let dtype = self.schema.field(idx).dtype;
        if !dtype.is_numeric() {
            return Err(DataError::wrong_type(name, "numeric", dtype));
        }
        Ok(idx)
    }

    /// Index of `name`, failing unless the column is a date or timestamp.
    pub fn require_temporal(&self, name: &str) -> DataResult<usize> {
        let idx = self.require_column(name)?;
        let dtype = self.schema.field(idx).dtype;
        if !dtype.is_temporal() {
            return Err(DataError::wrong_type(name, "timestamp", dtype));
        }
        Ok(idx)
    }

    pub fn get(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    pub fn column(&self, name: &str) -> DataResult<impl Iterator<Item = &Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn floats(&self, name: &str) -> DataResult<Vec<Option<f64>>> {
        let idx = self.require_numeric(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_f64()).collect())
    }

    pub fn timestamps(&self, name: &str) -> DataResult<Vec<Option<NaiveDateTime>>> {
        let idx = self.require_temporal(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_timestamp()).collect())
    }

    pub fn push_row(&mut self, row: Row) -> DataResult<()> {
        if row.len() != self.width() {
            return Err(DataError::InvalidArgument(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.width()
            )));
        }
        let mut checked = Vec::with_capacity(row.len());
        for (idx, value) in row.into_iter().enumerate() {
            let field = self.schema.field(idx);
            let value = value.widen_to(field.dtype);
            match value.data_type() {
                Some(dtype) if dtype != field.dtype => {
                    return Err(DataError::wrong_type(
                        &field.name,
                        type_name(field.dtype),
                        dtype,
                    ));
                }
                _ => checked.push(value),
            }
        }
        self.rows.push(checked);
        Ok(())
    }

    /// Adds a column, or replaces it in place when the name already exists.
    pub fn set_column(&mut self, name: &str, dtype: DataType, values: Vec<Value>) -> DataResult<()> {
        if values.len() != self.len() {
            return Err(DataError::InvalidArgument(format!(
                "column '{name}' has {} values, table has {} rows",
                values.len(),
                self.len()
            )));
        }
        let values: Vec<Value> = values.into_iter().map(|v| v.widen_to(dtype)).collect();
        if let Some(bad) = values.iter().find_map(|v| v.data_type().filter(|t| *t != dtype)) {
            return Err(DataError::wrong_type(name, type_name(dtype), bad));
        }
        match self.column_index(name) {
            Some(idx) => {
                self.schema.set_dtype(idx, dtype);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.schema.push(Field::new(name, dtype))?;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Rewrites column `name` cell by cell and retypes it as `dtype`.
    pub fn map_column<F>(&mut self, name: &str, dtype: DataType, f: F) -> DataResult<()>
    where
        F: Fn(&Value) -> Value,
    {
        let idx = self.require_column(name)?;
        let values = self.rows.iter().map(|r| f(&r[idx])).collect();
        self.set_column(name, dtype, values)
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Removes exact duplicate rows, keeping the first occurrence.
    /// Returns the number of rows removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<String> = row.iter().map(|v| format!("{v:?}")).collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }

    /// Drops rows holding a null in any of `columns`, or in any column when
    /// `columns` is `None`. Unknown column names are ignored.
    pub fn drop_nulls(&mut self, columns: Option<&[&str]>) -> usize {
        let idxs: Vec<usize> = match columns {
            Some(names) => names.iter().filter_map(|n| self.column_index(n)).collect(),
            None => (0..self.width()).collect(),
        };
        let before = self.rows.len();
        self.rows.retain(|row| idxs.iter().all(|&i| !row[i].is_null()));
        before - self.rows.len()
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            schema: self.schema.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    pub fn null_count(&self, name: &str) -> DataResult<usize> {
        Ok(self.column(name)?.filter(|v| v.is_null()).count())
    }

    /// Builds a table from JSON objects, inferring one type per column.
    ///
    /// Keys are collected in first-seen order. Missing keys and JSON nulls
    /// become `Null`. Columns mixing incompatible JSON types fall back to
    /// text.
    pub fn from_json_rows(rows: &[serde_json::Value]) -> DataResult<Table> {
        let mut names: Vec<String> = Vec::new();
        let mut objects: Vec<&Map<String, serde_json::Value>> = Vec::with_capacity(rows.len());
        for row in rows {
            let obj = row.as_object().ok_or_else(|| {
                DataError::InvalidArgument("JSON rows must be objects".to_string())
            })?;
            for key in obj.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
            objects.push(obj);
        }

        let dtypes: Vec<DataType> = names
            .iter()
            .map(|name| infer_json_type(objects.iter().filter_map(|o| o.get(name))))
            .collect();

        let fields = names
            .iter()
            .zip(&dtypes)
            .map(|(n, t)| Field::new(n.clone(), *t))
            .collect();
        let mut table = Table::new(Schema::new(fields)?);
        for obj in objects {
            let row = names
                .iter()
                .zip(&dtypes)
                .map(|(name, dtype)| json_to_value(obj.get(name), *dtype))
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Builds an all-text table from headers and string cells; empty cells
    /// become `Null`.
    pub fn from_text_rows(headers: &[String], rows: &[Vec<String>]) -> DataResult<Table> {
        let fields = headers
            .iter()
            .map(|h| Field::new(h.clone(), DataType::Text))
            .collect();
        let mut table = Table::new(Schema::new(fields)?);
        for row in rows {
            let cells = row
                .iter()
                .map(|c| {
                    let c = c.trim();
                    if c.is_empty() { Value::Null } else { Value::text(c) }
                })
                .collect();
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// Builds a table from typed cells, inferring one type per column.
    /// Ints widen to floats and dates to timestamps; any other mix turns the
    /// column into text.
    pub fn from_value_rows(names: Vec<String>, rows: Vec<Row>) -> DataResult<Table> {
        let dtypes: Vec<DataType> = (0..names.len())
            .map(|i| {
                let mut inferred: Option<DataType> = None;
                for t in rows.iter().filter_map(|r| r.get(i).and_then(Value::data_type)) {
                    inferred = Some(match (inferred, t) {
                        (None, t) => t,
                        (Some(a), b) if a == b => a,
                        (Some(a), b) if a.is_numeric() && b.is_numeric() => DataType::Float,
                        (Some(a), b) if a.is_temporal() && b.is_temporal() => DataType::Timestamp,
                        _ => DataType::Text,
                    });
                }
                inferred.unwrap_or(DataType::Text)
            })
            .collect();

        let fields = names
            .into_iter()
            .zip(&dtypes)
            .map(|(n, t)| Field::new(n, *t))
            .collect();
        let mut table = Table::new(Schema::new(fields)?);
        for row in rows {
            let row = row
                .into_iter()
                .zip(&dtypes)
                .map(|(v, t)| match (v.data_type(), t) {
                    (Some(vt), DataType::Text) if vt != DataType::Text => Value::text(v.to_string()),
                    _ => v,
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        let names = self.column_names();
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, serde_json::Value> = names
                    .iter()
                    .zip(row)
                    .map(|(n, v)| {
                        (
                            n.to_string(),
                            serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

fn type_name(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Bool => "bool",
        DataType::Int => "int",
        DataType::Float => "float",
        DataType::Text => "text",
        DataType::Date => "date",
        DataType::Timestamp => "timestamp",
    }
}

fn infer_json_type<'a>(values: impl Iterator<Item = &'a serde_json::Value>) -> DataType {
    use serde_json::Value as J;

    let mut inferred: Option<DataType> = None;
    for v in values {
        let t = match v {
            J::Null => continue,
            J::Bool(_) => DataType::Bool,
            J::Number(n) if n.is_i64() => DataType::Int,
            J::Number(_) => DataType::Float,
            _ => DataType::Text,
        };
        inferred = Some(match (inferred, t) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int), DataType::Float) | (Some(DataType::Float), DataType::Int) => {
                DataType::Float
            }
            _ => DataType::Text,
        });
    }
    inferred.unwrap_or(DataType::Text)
}

fn json_to_value(v: Option<&serde_json::Value>, dtype: DataType) -> Value {
    use serde_json::Value as J;

    match (v, dtype) {
        (None | Some(J::Null), _) => Value::Null,
        (Some(J::Bool(b)), DataType::Bool) => Value::Bool(*b),
        (Some(J::Number(n)), DataType::Int) => n.as_i64().map(Value::Int).unwrap_or(Value::Null),
        (Some(J::Number(n)), DataType::Float) => n.as_f64().map(Value::float).unwrap_or(Value::Null),
        (Some(J::String(s)), _) => Value::text(s.clone()),
        (Some(other), _) => Value::text(other.to_string()),
    }
}
