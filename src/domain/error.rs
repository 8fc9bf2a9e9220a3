// ==========================================
// 表格数据导入系统 - 领域层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 不依赖仓储/引擎/导入模块
// ==========================================

use thiserror::Error;

/// 领域模型构造错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("行宽不一致 (行 {row}): 期望 {expected} 列，实际 {actual} 列")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
