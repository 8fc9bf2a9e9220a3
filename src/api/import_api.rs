// ==========================================
// 表格数据导入API
// ==========================================
// 职责: 连接 → SchemaProvider + RowSink + ImportEngine 的组装
// 调用方: 命令行（后续可接入其他界面）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::db::{open_shared_connection, SharedConnection};
use crate::domain::import::{ImportSummary, OmittedRecord, SchemaMatch};
use crate::domain::schema::ColumnDescriptor;
use crate::domain::value::Dataset;
use crate::engine::{CancelHandle, ImportEngine};
use crate::importer::file_parser::{self, UniversalFileParser};
use crate::repository::schema_provider::SchemaProvider;
use crate::repository::sqlite_row_sink::SqliteRowSink;
use crate::repository::sqlite_schema_provider::SqliteSchemaProvider;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use tracing::info;

// ==========================================
// 导入选项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 批大小；1 = 逐行导入
    pub batch_size: usize,
    /// 指定写入列；None 时使用校验得到的可导入列
    pub columns: Option<Vec<String>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            columns: None,
        }
    }
}

// ==========================================
// 导入观察者
// ==========================================
/// 导入过程回调（同步调用，按行号顺序）
pub trait ImportObserver {
    fn on_omitted(&mut self, _record: &OmittedRecord) {}

    fn on_progress(&mut self, _processed: usize, _total: usize) {}
}

/// 不关心过程的调用方使用
pub struct NoopObserver;

impl ImportObserver for NoopObserver {}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    conn: SharedConnection,
}

impl ImportApi {
    /// 打开数据库
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_shared_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn schema_provider(&self) -> SqliteSchemaProvider {
        SqliteSchemaProvider::from_connection(self.conn.clone())
    }

    /// 用户表列表（按名称排序）
    pub fn list_tables(&self) -> ApiResult<Vec<String>> {
        Ok(self.schema_provider().list_tables()?)
    }

    /// 按名称片段过滤表（不区分大小写）
    pub fn filter_tables(&self, text: &str) -> ApiResult<Vec<String>> {
        Ok(self.schema_provider().filter_tables(text)?)
    }

    /// 表结构（含解析后的逻辑类型）
    pub fn describe_table(&self, table: &str) -> ApiResult<Vec<ColumnDescriptor>> {
        Ok(self.schema_provider().get_columns_for_validation(table)?)
    }

    /// 读取文件为数据集
    pub fn load_file(&self, path: &Path, sheet: Option<String>) -> ApiResult<Dataset> {
        Ok(UniversalFileParser::new(sheet).parse(path)?)
    }

    /// 列出工作表
    pub fn sheet_names(&self, path: &Path) -> ApiResult<Vec<String>> {
        Ok(file_parser::sheet_names(path)?)
    }

    /// 为数据集创建导入任务
    pub fn prepare(&self, dataset: Dataset) -> ImportJob {
        let engine = ImportEngine::new(
            self.schema_provider(),
            SqliteRowSink::from_connection(self.conn.clone()),
            dataset,
        );
        ImportJob { engine }
    }

    /// 校验（不写入）
    pub fn validate(&self, dataset: Dataset, table: &str) -> ApiResult<SchemaMatch> {
        self.prepare(dataset).validate(table)
    }

    /// 校验 + 导入
    pub fn import(
        &self,
        dataset: Dataset,
        table: &str,
        options: &ImportOptions,
        observer: &mut dyn ImportObserver,
    ) -> ApiResult<ImportSummary> {
        self.prepare(dataset).import(table, options, observer)
    }

    /// 将跳过的记录写为 JSON 数组（每条含原始列 + error）
    ///
    /// # 返回
    /// - 写入的记录数
    pub fn write_omitted_report(summary: &ImportSummary, path: &Path) -> ApiResult<usize> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::ReportError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(&summary.details)
            .map_err(|e| ApiError::ReportError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ApiError::ReportError(format!("{}: {}", path.display(), e)))?;

        info!(
            import_id = %summary.import_id,
            path = %path.display(),
            records = summary.details.len(),
            "跳过记录报告已写入"
        );
        Ok(summary.details.len())
    }
}

// ==========================================
// ImportJob - 绑定单个数据集的导入任务
// ==========================================
pub struct ImportJob {
    engine: ImportEngine<SqliteSchemaProvider, SqliteRowSink>,
}

impl ImportJob {
    pub fn dataset(&self) -> &Dataset {
        self.engine.dataset()
    }

    /// 使用外部取消标记
    pub fn with_cancel_handle(self, cancel: CancelHandle) -> Self {
        Self {
            engine: self.engine.with_cancel_handle(cancel),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.engine.cancel_handle()
    }

    /// 以数据集全部列校验
    pub fn validate(&self, table: &str) -> ApiResult<SchemaMatch> {
        Ok(self
            .engine
            .validate_columns(self.engine.dataset().columns(), table)?)
    }

    /// 执行导入
    ///
    /// 校验结果仅用于确定可导入列，存在违规取值不阻断导入。
    pub fn import(
        &self,
        table: &str,
        options: &ImportOptions,
        observer: &mut dyn ImportObserver,
    ) -> ApiResult<ImportSummary> {
        let columns = match &options.columns {
            Some(columns) => columns.clone(),
            None => self.validate(table)?.eligible_columns,
        };

        // 两个回调不会重入
        let observer = RefCell::new(observer);
        let on_omitted = |record: &OmittedRecord| observer.borrow_mut().on_omitted(record);
        let on_progress =
            |processed: usize, total: usize| observer.borrow_mut().on_progress(processed, total);

        let summary = if options.batch_size <= 1 {
            self.engine.import(table, &columns, on_omitted, on_progress)?
        } else {
            self.engine
                .import_batched(table, &columns, options.batch_size, on_omitted, on_progress)?
        };
        Ok(summary)
    }
}
