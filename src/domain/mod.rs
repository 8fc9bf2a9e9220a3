// ==========================================
// 表格数据导入系统 - 领域模型层
// ==========================================
// 职责: 定义取值、数据集、列描述、校验结果与导入汇总
// 红线: 不含数据访问逻辑,不含引擎逻辑,不依赖上层错误类型
// ==========================================

pub mod error;
pub mod import;
pub mod schema;
pub mod value;

// 重导出核心类型
pub use error::{DomainError, DomainResult};
pub use import::{ImportSummary, OmittedRecord, SchemaMatch, ValidationResult, ValidationStatus};
pub use schema::{ColumnDescriptor, LogicalType};
pub use value::{Dataset, FieldMap, Value};
