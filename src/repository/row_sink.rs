// ==========================================
// 表格数据导入系统 - RowSink Trait
// ==========================================
// 职责: 定义行写入接口（不包含实现）
// 红线: Sink 不含校验规则，只负责落库与事务
// ==========================================

use crate::domain::value::FieldMap;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};

// ==========================================
// BatchRowError - 批次内单行失败
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRowError {
    pub index: usize, // 批次内 0-based 下标
    pub message: String,
}

// ==========================================
// BatchInsertResult - 批量写入的部分结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInsertResult {
    pub success_indices: Vec<usize>,
    pub errors: Vec<BatchRowError>,
    /// 整批写入失败后是否回退到逐行重试
    pub fell_back: bool,
}

// ==========================================
// RowSink Trait
// ==========================================
// 实现者: SqliteRowSink（使用 rusqlite）
pub trait RowSink: Send + Sync {
    /// 写入单行（自动提交）
    ///
    /// # 返回
    /// - Ok(()): 写入成功
    /// - Err: 约束违反/类型不匹配等，错误信息可直接展示给用户
    fn insert_row(&self, table: &str, fields: &FieldMap) -> RepositoryResult<()>;

    /// 批量写入（单事务）
    ///
    /// # 流程
    /// 1. 整批写入
    /// 2. 整批失败（行级错误）→ 逐行重试，收集失败行
    /// 3. 提交成功行
    ///
    /// # 返回
    /// - Ok(BatchInsertResult): 成功下标 + 失败明细
    /// - Err: 非行级错误（连接/事务），整批已回滚
    fn insert_batch(&self, table: &str, rows: &[FieldMap]) -> RepositoryResult<BatchInsertResult>;
}

impl<T: RowSink + ?Sized> RowSink for &T {
    fn insert_row(&self, table: &str, fields: &FieldMap) -> RepositoryResult<()> {
        (**self).insert_row(table, fields)
    }

    fn insert_batch(&self, table: &str, rows: &[FieldMap]) -> RepositoryResult<BatchInsertResult> {
        (**self).insert_batch(table, rows)
    }
}
