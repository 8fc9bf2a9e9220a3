// ==========================================
// 表格数据导入系统 - 表结构匹配器
// ==========================================
// 职责: 数据集列 × 表列描述 → 每个表列一条校验结果 + 可导入列集合
// 规则:
// - 按列名精确匹配（区分大小写）
// - 表中有、数据集中无 → NOT_IN_DATASET，不导入（不是错误）
// - 数据集中有、表中无 → 完全忽略（不导入、不报告）
// ==========================================

use crate::domain::import::{SchemaMatch, ValidationResult, ValidationStatus};
use crate::domain::schema::ColumnDescriptor;
use crate::domain::value::Value;
use crate::engine::column_validator::validate_column;

// ==========================================
// DatasetColumn - 参与匹配的数据集列
// ==========================================
#[derive(Debug, Clone)]
pub struct DatasetColumn<'a> {
    pub name: &'a str,
    pub values: Vec<&'a Value>,
}

/// 匹配表结构并逐列校验
pub fn match_schema(descriptors: &[ColumnDescriptor], columns: &[DatasetColumn<'_>]) -> SchemaMatch {
    let mut results = Vec::with_capacity(descriptors.len());
    let mut eligible_columns = Vec::new();

    for descriptor in descriptors {
        let Some(column) = columns.iter().find(|c| c.name == descriptor.name) else {
            results.push(ValidationResult {
                column_name: descriptor.name.clone(),
                status: ValidationStatus::NotInDataset,
                error_rows: Vec::new(),
                message: None,
            });
            continue;
        };

        eligible_columns.push(descriptor.name.clone());

        let check = validate_column(descriptor, &column.values);
        let status = if check.error.is_some() {
            ValidationStatus::UnsupportedType
        } else if check.invalid_rows.is_empty() {
            ValidationStatus::Ok
        } else {
            ValidationStatus::HasErrors
        };

        results.push(ValidationResult {
            column_name: descriptor.name.clone(),
            status,
            error_rows: check.invalid_rows,
            message: check.error,
        });
    }

    SchemaMatch {
        results,
        eligible_columns,
    }
}
