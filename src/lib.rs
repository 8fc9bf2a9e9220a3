// ==========================================
// 表格数据导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 表格数据 → 数据库表的校验与批量导入
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 取值与结果类型
pub mod domain;

// 数据仓储层 - 表结构与行写入
pub mod repository;

// 引擎层 - 校验与导入
pub mod engine;

// 导入层 - 文件加载
pub mod importer;

// 配置层 - 应用配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    ColumnDescriptor, Dataset, FieldMap, ImportSummary, LogicalType, OmittedRecord, SchemaMatch,
    ValidationResult, ValidationStatus, Value,
};

pub use engine::{BatchImporter, CancelHandle, ImportEngine};

pub use repository::{RowSink, SchemaProvider, SqliteRowSink, SqliteSchemaProvider};

pub use api::{ApiError, ImportApi, ImportObserver, ImportOptions};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格数据导入系统";
