// ==========================================
// 表格数据导入系统 - 仓储层错误类型
// ==========================================
// 依据: Rust 错误处理最佳实践
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型（SchemaProvider / RowSink）
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 表结构错误 =====
    #[error("表不存在: {0}")]
    TableNotFound(String),

    // ===== 行级错误（可恢复，按行跳过）=====
    #[error("CHECK 约束违反: {0}")]
    CheckConstraintViolation(String),

    #[error("非空约束违反: {0}")]
    NotNullViolation(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("数据类型不匹配: {0}")]
    DataTypeMismatch(String),

    // ===== 连接与事务错误（致命）=====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl RepositoryError {
    /// 是否为行级错误
    ///
    /// 行级错误只影响当前行，批量写入时回退到逐行重试；
    /// 其余错误视为致命，回滚当前批次并向上抛出。
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            RepositoryError::CheckConstraintViolation(_)
                | RepositoryError::NotNullViolation(_)
                | RepositoryError::UniqueConstraintViolation(_)
                | RepositoryError::ForeignKeyViolation(_)
                | RepositoryError::DataTypeMismatch(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let msg = msg.unwrap_or_else(|| code.to_string());
                match code.code {
                    ErrorCode::ConstraintViolation => {
                        if msg.contains("CHECK") {
                            RepositoryError::CheckConstraintViolation(msg)
                        } else if msg.contains("NOT NULL") {
                            RepositoryError::NotNullViolation(msg)
                        } else if msg.contains("UNIQUE") || msg.contains("PRIMARY KEY") {
                            RepositoryError::UniqueConstraintViolation(msg)
                        } else if msg.contains("FOREIGN KEY") {
                            RepositoryError::ForeignKeyViolation(msg)
                        } else {
                            RepositoryError::DataTypeMismatch(msg)
                        }
                    }
                    ErrorCode::TypeMismatch | ErrorCode::TooBig => {
                        RepositoryError::DataTypeMismatch(msg)
                    }
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        RepositoryError::LockError(msg)
                    }
                    ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => {
                        RepositoryError::DatabaseConnectionError(msg)
                    }
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            rusqlite::Error::InvalidParameterCount(expected, actual) => {
                RepositoryError::InternalError(format!(
                    "参数数量不匹配: 期望 {}，实际 {}",
                    expected, actual
                ))
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
