// ==========================================
// 表格数据导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 表结构查询（SchemaProvider）与行写入（RowSink）
// 约束: 所有写入使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod row_sink;
pub mod schema_provider;
pub mod sqlite_row_sink;
pub mod sqlite_schema_provider;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use row_sink::{BatchInsertResult, BatchRowError, RowSink};
pub use schema_provider::SchemaProvider;
pub use sqlite_row_sink::SqliteRowSink;
pub use sqlite_schema_provider::SqliteSchemaProvider;
