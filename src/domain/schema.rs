// ==========================================
// 表格数据导入系统 - 表结构领域模型
// ==========================================
// 职责: 目标表列描述（由 SchemaProvider 提供，核心只读）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// LogicalType - 列逻辑类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "declared", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalType {
    Numeric,
    Text,
    /// 不支持校验的类型，保留声明类型名
    Other(String),
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Numeric => f.write_str("NUMERIC"),
            LogicalType::Text => f.write_str("TEXT"),
            LogicalType::Other(declared) if declared.is_empty() => f.write_str("(未声明)"),
            LogicalType::Other(declared) => f.write_str(declared),
        }
    }
}

// ==========================================
// ColumnDescriptor - 列描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub declared_type: String, // 原始声明类型（如 NUMBER(3,0)）

    // ===== 类型约束 =====
    pub precision: Option<u32>,  // 数值: 最大总位数
    pub scale: Option<u32>,      // 数值: 最大小数位数
    pub max_length: Option<u32>, // 文本: 最大长度

    // ===== 约束标记 =====
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub has_check_constraint: bool,
    pub has_foreign_key: bool,
}

impl ColumnDescriptor {
    pub fn numeric(name: impl Into<String>, precision: Option<u32>, scale: Option<u32>) -> Self {
        Self {
            name: name.into(),
            logical_type: LogicalType::Numeric,
            declared_type: match (precision, scale) {
                (Some(p), Some(s)) => format!("NUMBER({},{})", p, s),
                (Some(p), None) => format!("NUMBER({})", p),
                _ => "NUMBER".to_string(),
            },
            precision,
            scale,
            max_length: None,
            is_primary_key: false,
            is_nullable: true,
            has_check_constraint: false,
            has_foreign_key: false,
        }
    }

    pub fn text(name: impl Into<String>, max_length: Option<u32>) -> Self {
        Self {
            name: name.into(),
            logical_type: LogicalType::Text,
            declared_type: match max_length {
                Some(len) => format!("VARCHAR2({})", len),
                None => "TEXT".to_string(),
            },
            precision: None,
            scale: None,
            max_length,
            is_primary_key: false,
            is_nullable: true,
            has_check_constraint: false,
            has_foreign_key: false,
        }
    }

    pub fn other(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            logical_type: LogicalType::Other(declared_type.clone()),
            declared_type,
            precision: None,
            scale: None,
            max_length: None,
            is_primary_key: false,
            is_nullable: true,
            has_check_constraint: false,
            has_foreign_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }
}
