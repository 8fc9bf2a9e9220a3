// ==========================================
// 表格数据导入系统 - 文件加载层
// ==========================================
// 职责: 外部文件 → Dataset
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{sheet_names, CsvParser, ExcelParser, FileParser, UniversalFileParser};
