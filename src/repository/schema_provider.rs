// ==========================================
// 表格数据导入系统 - SchemaProvider Trait
// ==========================================
// 职责: 定义表结构查询接口（不包含实现）
// 红线: 表不存在或连接不可用时必须报错，不可静默返回空列表
// ==========================================

use crate::domain::schema::ColumnDescriptor;
use crate::repository::error::RepositoryResult;

// ==========================================
// SchemaProvider Trait
// ==========================================
// 用途: 导入引擎获取目标表列描述
// 实现者: SqliteSchemaProvider（使用 rusqlite）
pub trait SchemaProvider: Send + Sync {
    /// 获取表的列描述（按列定义顺序）
    ///
    /// # 返回
    /// - Ok(Vec<ColumnDescriptor>): 列描述
    /// - Err(TableNotFound): 表不存在
    fn get_columns(&self, table: &str) -> RepositoryResult<Vec<ColumnDescriptor>>;

    /// 获取用于校验的列描述（含精度/小数位/长度）
    ///
    /// 默认与 get_columns 相同；实现者可返回更适合校验的形态。
    fn get_columns_for_validation(&self, table: &str) -> RepositoryResult<Vec<ColumnDescriptor>> {
        self.get_columns(table)
    }
}

impl<T: SchemaProvider + ?Sized> SchemaProvider for &T {
    fn get_columns(&self, table: &str) -> RepositoryResult<Vec<ColumnDescriptor>> {
        (**self).get_columns(table)
    }

    fn get_columns_for_validation(&self, table: &str) -> RepositoryResult<Vec<ColumnDescriptor>> {
        (**self).get_columns_for_validation(table)
    }
}
