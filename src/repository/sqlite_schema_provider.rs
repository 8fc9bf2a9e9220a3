// ==========================================
// 表格数据导入系统 - SQLite SchemaProvider 实现
// ==========================================
// 职责: 从 SQLite 目录读取表结构（PRAGMA table_info / foreign_key_list）
// 红线: 只读，不修改任何表
// ==========================================

use crate::db::{open_sqlite_connection, quote_identifier};
use crate::domain::schema::{ColumnDescriptor, LogicalType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::schema_provider::SchemaProvider;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// SqliteSchemaProvider
// ==========================================
pub struct SqliteSchemaProvider {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSchemaProvider {
    /// 创建新的 SchemaProvider 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 RowSink 共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 列出用户表（按名称排序）
    pub fn list_tables(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    /// 按子串过滤表名（不区分大小写）
    pub fn filter_tables(&self, text: &str) -> RepositoryResult<Vec<String>> {
        let needle = text.to_lowercase();
        Ok(self
            .list_tables()?
            .into_iter()
            .filter(|table| table.to_lowercase().contains(&needle))
            .collect())
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl SchemaProvider for SqliteSchemaProvider {
    fn get_columns(&self, table: &str) -> RepositoryResult<Vec<ColumnDescriptor>> {
        let conn = self.lock()?;

        // 表定义（同时用于存在性检查与 CHECK 约束识别）
        let create_sql: Option<Option<String>> = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        let create_sql = match create_sql {
            Some(sql) => sql.unwrap_or_default(),
            None => return Err(RepositoryError::TableNotFound(table.to_string())),
        };
        let checks = check_expressions(&create_sql);

        // 外键列
        let mut fk_stmt = conn.prepare(&format!(
            "PRAGMA foreign_key_list({})",
            quote_identifier(table)
        ))?;
        let fk_columns: HashSet<String> = fk_stmt
            .query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<_, _>>()?;

        // 列定义
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let columns: Vec<ColumnDescriptor> = rows
            .into_iter()
            .map(|(name, declared_type, not_null, pk)| {
                let parsed = parse_declared_type(&declared_type);
                ColumnDescriptor {
                    logical_type: parsed.logical_type,
                    precision: parsed.precision,
                    scale: parsed.scale,
                    max_length: parsed.max_length,
                    is_primary_key: pk > 0,
                    is_nullable: not_null == 0 && pk == 0,
                    has_check_constraint: checks.iter().any(|expr| mentions_identifier(expr, &name)),
                    has_foreign_key: fk_columns.contains(&name),
                    declared_type,
                    name,
                }
            })
            .collect();

        debug!(table = %table, columns = columns.len(), "表结构读取完成");
        Ok(columns)
    }
}

// ==========================================
// 声明类型解析
// ==========================================
// 规则顺序对齐 SQLite 类型亲和性: INT → CHAR/CLOB/TEXT → REAL/FLOA/DOUB → NUMERIC
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedType {
    pub logical_type: LogicalType,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub max_length: Option<u32>,
}

pub fn parse_declared_type(declared: &str) -> ParsedType {
    let upper = declared.trim().to_uppercase();
    let (base, args) = match upper.find('(') {
        Some(open) => {
            let close = upper.rfind(')').unwrap_or(upper.len());
            let inner = upper.get(open + 1..close).unwrap_or("");
            let args: Vec<Option<u32>> = inner
                .split(',')
                .map(|arg| arg.trim().parse::<u32>().ok())
                .collect();
            (upper[..open].trim().to_string(), args)
        }
        None => (upper.clone(), Vec::new()),
    };
    let arg = |idx: usize| args.get(idx).copied().flatten();

    let mut parsed = ParsedType {
        logical_type: LogicalType::Other(declared.trim().to_string()),
        precision: None,
        scale: None,
        max_length: None,
    };

    if base.contains("INT") {
        parsed.logical_type = LogicalType::Numeric;
        parsed.precision = arg(0);
    } else if base.contains("CHAR") || base.contains("CLOB") || base.contains("TEXT") {
        parsed.logical_type = LogicalType::Text;
        parsed.max_length = arg(0);
    } else if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") {
        parsed.logical_type = LogicalType::Numeric;
    } else if matches!(base.as_str(), "NUMBER" | "NUMERIC" | "DECIMAL" | "DEC") {
        parsed.logical_type = LogicalType::Numeric;
        parsed.precision = arg(0);
        parsed.scale = arg(1);
    }

    parsed
}

/// 提取 CREATE TABLE 语句中所有 CHECK(...) 表达式
fn check_expressions(sql: &str) -> Vec<String> {
    let upper = sql.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut expressions = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = upper[search_from..].find("CHECK") {
        let start = search_from + offset;
        search_from = start + "CHECK".len();

        // 必须是独立关键字
        let before_ok = start == 0 || !is_identifier_byte(bytes[start - 1]);
        let after = upper[search_from..].trim_start();
        if !before_ok || !after.starts_with('(') {
            continue;
        }

        let open = upper.len() - after.len();
        let mut depth = 0usize;
        for (idx, ch) in upper[open..].char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        expressions.push(sql[open + 1..open + idx].to_string());
                        search_from = open + idx + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    expressions
}

/// 表达式中是否以独立标识符形式出现指定列名（不区分大小写）
fn mentions_identifier(expr: &str, column: &str) -> bool {
    let expr = expr.to_ascii_uppercase();
    let column = column.to_ascii_uppercase();
    let bytes = expr.as_bytes();

    expr.match_indices(&column).any(|(pos, _)| {
        let end = pos + column.len();
        let before_ok = pos == 0 || !is_identifier_byte(bytes[pos - 1]);
        let after_ok = end >= bytes.len() || !is_identifier_byte(bytes[end]);
        before_ok && after_ok
    })
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
