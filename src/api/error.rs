// ==========================================
// 表格数据导入系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户友好的错误消息
// ==========================================

use crate::config::ConfigError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    /// 前置条件不满足（空数据集 / 无可导入列），未写入任何数据
    #[error("无法开始导入: {0}")]
    PreconditionFailed(String),

    /// 批次致命错误：之前的批次已提交
    #[error("导入中止: {0}")]
    ImportAborted(String),

    // ==========================================
    // 配置与报告
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("报告写入失败: {0}")]
    ReportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TableNotFound(table) => ApiError::NotFound(format!("表 {}", table)),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            // 行级错误正常情况下不会到达这里（已转换为跳过记录）
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::EmptyDataset | ImportError::NoEligibleColumns { .. } => {
                ApiError::PreconditionFailed(err.to_string())
            }
            ImportError::BatchFailed { .. } => ApiError::ImportAborted(err.to_string()),
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::SheetNotFound(sheet) => ApiError::NotFound(format!("工作表 {}", sheet)),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_not_found_maps_to_not_found() {
        let err = ApiError::from(RepositoryError::TableNotFound("person".to_string()));
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("person")));
    }

    #[test]
    fn test_preconditions_and_batch_failures() {
        assert!(matches!(
            ApiError::from(ImportError::EmptyDataset),
            ApiError::PreconditionFailed(_)
        ));

        let err = ApiError::from(ImportError::BatchFailed {
            first_row: 101,
            source: RepositoryError::LockError("busy".to_string()),
        });
        assert!(matches!(err, ApiError::ImportAborted(ref msg) if msg.contains("101")));
    }
}
