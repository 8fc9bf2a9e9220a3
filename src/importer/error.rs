// ==========================================
// 表格数据导入系统 - 导入模块错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::error::DomainError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
///
/// 单行写入失败不在此列：它们被转换为 OmittedRecord，不中断导入。
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    // ===== 前置条件错误（零副作用，整体失败）=====
    #[error("数据集为空，没有可导入的数据")]
    EmptyDataset,

    #[error("没有可导入的列: 表 {table} 与数据集无共同列")]
    NoEligibleColumns { table: String },

    // ===== 致命错误 =====
    #[error("批次写入失败 (起始行 {first_row}): {source}")]
    BatchFailed {
        first_row: usize,
        #[source]
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
