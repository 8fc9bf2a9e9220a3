// ==========================================
// 表格数据导入系统 - 引擎层
// ==========================================
// 职责: 列校验、表结构匹配、逐行/分批导入
// 红线: Engine 不拼 SQL；单行失败只跳过，不中断导入
// ==========================================

pub mod batch_importer;
pub mod column_validator;
pub mod import_engine;
pub mod schema_matcher;

// 重导出核心引擎
pub use batch_importer::BatchImporter;
pub use column_validator::{validate_column, validate_numeric, validate_text, ColumnCheck};
pub use import_engine::{CancelHandle, ImportEngine};
pub use schema_matcher::{match_schema, DatasetColumn};
