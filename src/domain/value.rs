// ==========================================
// 表格数据导入系统 - 数据集领域模型
// ==========================================
// 职责: 动态标量值 / 字段映射 / 数据集
// 红线: 数据集在导入过程中只读，不被修改
// ==========================================

use crate::domain::error::{DomainError, DomainResult};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

// ==========================================
// Value - 单元格标量值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

// ==========================================
// FieldMap - 有序字段映射（列名 → 值）
// ==========================================
// 用途: 写入 RowSink 的单行数据 / 被跳过记录的原始数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

// ==========================================
// Dataset - 已加载的表格数据
// ==========================================
// 不变量: 所有行共享同一列集合（行宽 == 表头宽度）
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// 创建数据集并校验行宽
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> DomainResult<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DomainError::RaggedRow {
                row: idx + 1,
                expected: columns.len(),
                actual: row.len(),
            });
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// 单列的全部取值（按行顺序，允许重复）
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// 完整原始记录（按表头顺序）
    pub fn record(&self, row: usize) -> Option<FieldMap> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect(),
        )
    }

    /// 投影到指定列（数据集中不存在的列被忽略）
    pub fn project(&self, row: usize, columns: &[String]) -> Option<FieldMap> {
        let values = self.rows.get(row)?;
        Some(
            columns
                .iter()
                .filter_map(|column| {
                    self.column_index(column)
                        .map(|idx| (column.clone(), values[idx].clone()))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["ID".to_string(), "NAME".to_string(), "AGE".to_string()],
            vec![
                vec![Value::Integer(1), Value::from("Ana"), Value::Integer(30)],
                vec![Value::Integer(2), Value::from("Luis"), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_row_rejected() {
        let result = Dataset::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![Value::Integer(1)]],
        );

        assert!(matches!(
            result,
            Err(DomainError::RaggedRow {
                row: 1,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_project_skips_unknown_columns() {
        let dataset = sample();
        let fields = dataset
            .project(0, &["AGE".to_string(), "MISSING".to_string(), "ID".to_string()])
            .unwrap();

        assert_eq!(fields.columns().collect::<Vec<_>>(), vec!["AGE", "ID"]);
        assert_eq!(fields.get("AGE"), Some(&Value::Integer(30)));
    }

    #[test]
    fn test_record_keeps_header_order() {
        let dataset = sample();
        let record = dataset.record(1).unwrap();

        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["ID", "NAME", "AGE"]);
        assert!(record.get("AGE").unwrap().is_null());
        assert!(dataset.record(2).is_none());
    }

    #[test]
    fn test_field_map_serializes_in_order() {
        let record = sample().record(0).unwrap();
        let json = serde_json::to_string(&record).unwrap();

        assert_eq!(json, r#"{"ID":1,"NAME":"Ana","AGE":30}"#);
    }
}
