// ==========================================
// 表格数据导入系统 - SQLite RowSink 实现
// ==========================================
// 职责: 单行写入 / 批量写入（整批 → 逐行回退）
// 红线: 致命错误回滚当前批次并上抛；行级错误只记录，不中断
// ==========================================

use crate::db::{open_sqlite_connection, quote_identifier, SharedConnection};
use crate::domain::value::FieldMap;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_sink::{BatchInsertResult, BatchRowError, RowSink};
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

const BULK_SAVEPOINT: &str = "bulk_insert";
const ROW_SAVEPOINT: &str = "row_insert";

// ==========================================
// SqliteRowSink
// ==========================================
pub struct SqliteRowSink {
    conn: SharedConnection,
}

impl SqliteRowSink {
    /// 创建新的 RowSink 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 SchemaProvider 共享同一连接）
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 执行单行 INSERT（预编译语句缓存）
    fn execute_insert(conn: &Connection, table: &str, fields: &FieldMap) -> RepositoryResult<()> {
        let sql = insert_sql(table, fields);
        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(fields.values()))?;
        Ok(())
    }

    /// 阶段 1: 整批写入（保存点内）
    fn insert_all(conn: &Connection, table: &str, rows: &[FieldMap]) -> RepositoryResult<()> {
        conn.execute_batch(&format!("SAVEPOINT {}", BULK_SAVEPOINT))?;

        for fields in rows {
            if let Err(e) = Self::execute_insert(conn, table, fields) {
                conn.execute_batch(&format!(
                    "ROLLBACK TO {sp}; RELEASE {sp}",
                    sp = BULK_SAVEPOINT
                ))?;
                return Err(e);
            }
        }

        conn.execute_batch(&format!("RELEASE {}", BULK_SAVEPOINT))?;
        Ok(())
    }

    /// 阶段 2: 逐行重试（每行独立保存点）
    fn insert_each(
        conn: &Connection,
        table: &str,
        rows: &[FieldMap],
    ) -> RepositoryResult<BatchInsertResult> {
        let mut result = BatchInsertResult {
            fell_back: true,
            ..Default::default()
        };

        for (index, fields) in rows.iter().enumerate() {
            conn.execute_batch(&format!("SAVEPOINT {}", ROW_SAVEPOINT))?;

            match Self::execute_insert(conn, table, fields) {
                Ok(()) => {
                    conn.execute_batch(&format!("RELEASE {}", ROW_SAVEPOINT))?;
                    result.success_indices.push(index);
                }
                Err(e) => {
                    conn.execute_batch(&format!(
                        "ROLLBACK TO {sp}; RELEASE {sp}",
                        sp = ROW_SAVEPOINT
                    ))?;
                    if !e.is_row_level() {
                        return Err(e);
                    }
                    result.errors.push(BatchRowError {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }
}

impl RowSink for SqliteRowSink {
    fn insert_row(&self, table: &str, fields: &FieldMap) -> RepositoryResult<()> {
        let conn = self.lock()?;
        Self::execute_insert(&conn, table, fields)
    }

    fn insert_batch(&self, table: &str, rows: &[FieldMap]) -> RepositoryResult<BatchInsertResult> {
        if rows.is_empty() {
            return Ok(BatchInsertResult::default());
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let result = match Self::insert_all(&tx, table, rows) {
            Ok(()) => BatchInsertResult {
                success_indices: (0..rows.len()).collect(),
                ..Default::default()
            },
            Err(e) if e.is_row_level() => {
                debug!(table = %table, rows = rows.len(), error = %e, "整批写入失败，回退到逐行写入");
                match Self::insert_each(&tx, table, rows) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(table = %table, error = %e, "逐行写入出现致命错误，回滚批次");
                        tx.rollback()?;
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                warn!(table = %table, error = %e, "整批写入出现致命错误，回滚批次");
                tx.rollback()?;
                return Err(e);
            }
        };

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(result)
    }
}

/// 生成 INSERT 语句（列名加引号，位置参数）
pub fn insert_sql(table: &str, fields: &FieldMap) -> String {
    if fields.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table));
    }

    let columns: Vec<String> = fields.columns().map(quote_identifier).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}
