use serde::{Deserialize, Serialize};

use super::DataType;
use crate::error::{DataError, DataResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Ordered column definitions with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> DataResult<Self> {
        let mut schema = Schema::default();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    /// Builds a schema from `(name, type)` pairs.
    pub fn of(columns: &[(&str, DataType)]) -> DataResult<Self> {
        Self::new(
            columns
                .iter()
                .map(|(name, dtype)| Field::new(*name, *dtype))
                .collect(),
        )
    }

    pub fn push(&mut self, field: Field) -> DataResult<()> {
        if self.index_of(&field.name).is_some() {
            return Err(DataError::InvalidArgument(format!(
                "duplicate column '{}'",
                field.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, idx: usize) -> &Field {
        &self.fields[idx]
    }

    pub(crate) fn set_dtype(&mut self, idx: usize, dtype: DataType) {
        self.fields[idx].dtype = dtype;
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Schema::of(&[("date", DataType::Date), ("date", DataType::Text)]);
        assert!(matches!(result, Err(DataError::InvalidArgument(_))));
    }

    #[test]
    fn test_index_of() {
        let schema = Schema::of(&[("a", DataType::Int), ("b", DataType::Float)]).unwrap();
        assert_eq!(schema.index_of("b"), Some(1));
        assert_eq!(schema.index_of("c"), None);
        assert_eq!(schema.names(), vec!["a", "b"]);
    }
}
