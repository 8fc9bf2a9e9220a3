// ==========================================
// 表格数据导入系统 - 导入结果领域模型
// ==========================================
// 职责: 校验报告 / 被跳过记录 / 导入汇总
// 红线: ImportSummary 在引擎返回后不可变，是唯一回传对象
// ==========================================

use crate::domain::value::FieldMap;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

// ==========================================
// ValidationStatus - 列校验状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Ok,
    HasErrors,
    NotInDataset,
    /// 列类型不支持校验（不可视为通过）
    UnsupportedType,
}

impl ValidationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "正确",
            ValidationStatus::HasErrors => "存在错误",
            ValidationStatus::NotInDataset => "数据集中不存在",
            ValidationStatus::UnsupportedType => "类型不支持",
        }
    }
}

// ==========================================
// ValidationResult - 单列校验结果（仅供参考，不阻断导入）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct ValidationResult {
    pub column_name: String,
    pub status: ValidationStatus,
    pub error_rows: Vec<usize>, // 1-based 行号
    pub message: Option<String>,
}

impl ValidationResult {
    /// 逗号拼接的错误行号（无错误时为空串）
    pub fn error_rows_display(&self) -> String {
        self.error_rows
            .iter()
            .map(|row| row.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ==========================================
// SchemaMatch - 数据集与表结构的匹配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct SchemaMatch {
    /// 每个表列一条结果（按表列顺序）
    pub results: Vec<ValidationResult>,
    /// 同时存在于表与数据集的列（唯一允许写入的列）
    pub eligible_columns: Vec<String>,
}

impl SchemaMatch {
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|r| {
            matches!(
                r.status,
                ValidationStatus::HasErrors | ValidationStatus::UnsupportedType
            )
        })
    }

    pub fn result_for(&self, column: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.column_name == column)
    }
}

// ==========================================
// OmittedRecord - 被跳过的记录
// ==========================================
// 原始完整记录 + 注入的 "error" 字段
// 数据集已有同名列时改用 "error.1"、"error.2"…（与表头去重规则一致），原列值保持不变
#[derive(Debug, Clone, PartialEq)]
pub struct OmittedRecord {
    pub row_number: usize, // 数据集中的 1-based 位置
    pub fields: FieldMap,
    pub error: String,
}

impl Serialize for OmittedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (column, value) in self.fields.iter() {
            map.serialize_entry(column, value)?;
        }
        map.serialize_entry(&self.error_key(), &self.error)?;
        map.end()
    }
}

impl OmittedRecord {
    /// 注入失败原因所用的键（不与原始列名冲突）
    pub fn error_key(&self) -> String {
        const KEY: &str = "error";
        if self.fields.get(KEY).is_none() {
            return KEY.to_string();
        }
        (1..)
            .map(|n| format!("{}.{}", KEY, n))
            .find(|candidate| self.fields.get(candidate).is_none())
            .unwrap_or_else(|| KEY.to_string())
    }
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportSummary {
    pub import_id: String,
    pub table: String,
    pub total: usize,
    pub inserted: usize,
    pub omitted: usize,
    pub details: Vec<OmittedRecord>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ImportSummary {
    /// 已处理记录数（inserted + omitted）
    pub fn processed(&self) -> usize {
        self.inserted + self.omitted
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
