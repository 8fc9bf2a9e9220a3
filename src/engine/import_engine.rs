// ==========================================
// 表格数据导入系统 - 导入引擎
// ==========================================
// 职责: 逐行导入（插入或跳过）+ 进度回调 + 协作式取消
// 流程: 前置检查 → 逐行 [检查取消 → 投影 → 写入 → 分类 → 进度] → 汇总
// 红线:
// - 严格按数据集原始顺序处理，回调同步、不缓冲、不重排
// - 单行失败永不中断导入
// - 取消只在行与行之间检查，已写入的行不回滚
// ==========================================

use crate::domain::import::{ImportSummary, OmittedRecord, SchemaMatch};
use crate::domain::value::Dataset;
use crate::engine::batch_importer::BatchImporter;
use crate::engine::schema_matcher::{match_schema, DatasetColumn};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::row_sink::RowSink;
use crate::repository::schema_provider::SchemaProvider;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// CancelHandle - 取消标记
// ==========================================
// 唯一允许在导入循环外部修改的状态；只会从 false 变为 true
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消（幂等）
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ==========================================
// ImportSession - 单次导入的临时状态
// ==========================================
pub(crate) struct ImportSession {
    pub import_id: String,
    started_at: DateTime<Utc>,
    inserted: usize,
    omitted: Vec<OmittedRecord>,
}

impl ImportSession {
    pub fn start() -> Self {
        Self {
            import_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            inserted: 0,
            omitted: Vec::new(),
        }
    }

    pub fn record_inserted(&mut self, count: usize) {
        self.inserted += count;
    }

    /// 登记被跳过的记录，返回其引用供回调使用
    pub fn record_omitted(&mut self, record: OmittedRecord) -> &OmittedRecord {
        warn!(
            import_id = %self.import_id,
            row = record.row_number,
            error = %record.error,
            "记录被跳过"
        );
        let idx = self.omitted.len();
        self.omitted.push(record);
        &self.omitted[idx]
    }

    pub fn processed(&self) -> usize {
        self.inserted + self.omitted.len()
    }

    /// 汇总（纯聚合，不重新计算/校验）
    pub fn finish(self, table: &str, total: usize, cancelled: bool) -> ImportSummary {
        let summary = ImportSummary {
            import_id: self.import_id,
            table: table.to_string(),
            total,
            inserted: self.inserted,
            omitted: self.omitted.len(),
            details: self.omitted,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        info!(
            import_id = %summary.import_id,
            table = %summary.table,
            total = summary.total,
            inserted = summary.inserted,
            omitted = summary.omitted,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed_ms(),
            "导入结束"
        );
        summary
    }
}

// ==========================================
// ImportEngine
// ==========================================
pub struct ImportEngine<P, S>
where
    P: SchemaProvider,
    S: RowSink,
{
    schema_provider: P,
    row_sink: S,
    dataset: Dataset,
    cancel: CancelHandle,
}

impl<P, S> ImportEngine<P, S>
where
    P: SchemaProvider,
    S: RowSink,
{
    /// 创建导入引擎
    ///
    /// # 参数
    /// - schema_provider: 表结构查询
    /// - row_sink: 行写入
    /// - dataset: 已加载的数据集（只读）
    pub fn new(schema_provider: P, row_sink: S, dataset: Dataset) -> Self {
        Self {
            schema_provider,
            row_sink,
            dataset,
            cancel: CancelHandle::new(),
        }
    }

    /// 使用外部提供的取消标记（如信号处理器持有的副本）
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// 取消标记的副本，可交给其他线程
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 请求取消当前（或后续）导入
    ///
    /// 取消标记是引擎级的：一旦置位，该引擎后续的导入都会立即以 cancelled 结束。
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 校验数据集列与目标表结构（仅供参考，不阻断导入）
    ///
    /// # 参数
    /// - dataset_columns: 参与校验的数据集列名（如界面上可见的列）
    /// - table: 目标表名
    pub fn validate_columns(
        &self,
        dataset_columns: &[String],
        table: &str,
    ) -> ImportResult<SchemaMatch> {
        let descriptors = self.schema_provider.get_columns_for_validation(table)?;

        let columns: Vec<DatasetColumn<'_>> = dataset_columns
            .iter()
            .filter_map(|name| {
                self.dataset.column_values(name).map(|values| DatasetColumn {
                    name: name.as_str(),
                    values,
                })
            })
            .collect();

        Ok(match_schema(&descriptors, &columns))
    }

    /// 逐行导入
    ///
    /// # 参数
    /// - table: 目标表名
    /// - eligible_columns: 允许写入的列（通常来自 SchemaMatch）
    /// - on_omitted: 每条被跳过的记录同步回调一次
    /// - on_progress: 每行处理后回调 (已处理, 总数)
    ///
    /// # 返回
    /// - Ok(ImportSummary): 完成或被取消
    /// - Err(EmptyDataset / NoEligibleColumns): 前置条件失败，零副作用
    #[instrument(skip_all, fields(table = %table))]
    pub fn import<O, G>(
        &self,
        table: &str,
        eligible_columns: &[String],
        mut on_omitted: O,
        mut on_progress: G,
    ) -> ImportResult<ImportSummary>
    where
        O: FnMut(&OmittedRecord),
        G: FnMut(usize, usize),
    {
        let columns = self.check_preconditions(table, eligible_columns)?;
        let total = self.dataset.len();
        let mut session = ImportSession::start();

        info!(
            import_id = %session.import_id,
            total = total,
            columns = columns.len(),
            mode = "row",
            "开始导入"
        );

        for row in 0..total {
            if self.cancel.is_cancelled() {
                info!(import_id = %session.import_id, processed = session.processed(), "导入已取消");
                break;
            }

            let fields = self
                .dataset
                .project(row, &columns)
                .ok_or_else(|| ImportError::InternalError(format!("行 {} 越界", row + 1)))?;

            match self.row_sink.insert_row(table, &fields) {
                Ok(()) => session.record_inserted(1),
                Err(e) => {
                    let record = OmittedRecord {
                        row_number: row + 1,
                        fields: self.dataset.record(row).unwrap_or_default(),
                        error: e.to_string(),
                    };
                    on_omitted(session.record_omitted(record));
                }
            }

            on_progress(session.processed(), total);
        }

        Ok(session.finish(table, total, self.cancel.is_cancelled()))
    }

    /// 分批导入（整批写入，失败则逐行回退）
    ///
    /// batch_size 为 1 时退化为逐行语义；致命批次错误回滚该批次并上抛。
    #[instrument(skip_all, fields(table = %table, batch_size = batch_size))]
    pub fn import_batched<O, G>(
        &self,
        table: &str,
        eligible_columns: &[String],
        batch_size: usize,
        on_omitted: O,
        on_progress: G,
    ) -> ImportResult<ImportSummary>
    where
        O: FnMut(&OmittedRecord),
        G: FnMut(usize, usize),
    {
        let columns = self.check_preconditions(table, eligible_columns)?;

        BatchImporter::new(&self.row_sink, &self.dataset, &self.cancel, batch_size).run(
            table,
            &columns,
            on_omitted,
            on_progress,
        )
    }

    /// 前置条件: 数据集非空 + 至少一列可写入
    ///
    /// 返回实际写入列（eligible_columns ∩ 数据集列，保持传入顺序）
    fn check_preconditions(
        &self,
        table: &str,
        eligible_columns: &[String],
    ) -> ImportResult<Vec<String>> {
        if self.dataset.is_empty() {
            return Err(ImportError::EmptyDataset);
        }

        let columns: Vec<String> = eligible_columns
            .iter()
            .filter(|c| self.dataset.has_column(c))
            .cloned()
            .collect();
        if columns.is_empty() {
            return Err(ImportError::NoEligibleColumns {
                table: table.to_string(),
            });
        }

        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::ColumnDescriptor;
    use crate::domain::value::{FieldMap, Value};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::repository::row_sink::BatchInsertResult;
    use std::sync::{mpsc, Mutex};
    use std::thread;

    // ==========================================
    // 测试替身
    // ==========================================
    struct FixedSchema(Vec<ColumnDescriptor>);

    impl SchemaProvider for FixedSchema {
        fn get_columns(&self, _table: &str) -> RepositoryResult<Vec<ColumnDescriptor>> {
            Ok(self.0.clone())
        }
    }

    /// AGE >= 1000 的行写入失败；记录写入过的字段
    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<FieldMap>>,
    }

    impl RowSink for RecordingSink {
        fn insert_row(&self, _table: &str, fields: &FieldMap) -> RepositoryResult<()> {
            if let Some(Value::Integer(age)) = fields.get("AGE") {
                if *age >= 1000 {
                    return Err(RepositoryError::CheckConstraintViolation(
                        "CHECK constraint failed: AGE < 1000".to_string(),
                    ));
                }
            }
            self.written.lock().unwrap().push(fields.clone());
            Ok(())
        }

        fn insert_batch(
            &self,
            _table: &str,
            _rows: &[FieldMap],
        ) -> RepositoryResult<BatchInsertResult> {
            unreachable!("逐行模式不使用批量写入")
        }
    }

    /// 写到 ID == pause_at 的行时通知外部线程，并等待其放行
    struct HandshakeSink {
        pause_at: i64,
        reached: Mutex<mpsc::Sender<()>>,
        resume: Mutex<mpsc::Receiver<()>>,
    }

    impl RowSink for HandshakeSink {
        fn insert_row(&self, _table: &str, fields: &FieldMap) -> RepositoryResult<()> {
            if fields.get("ID") == Some(&Value::Integer(self.pause_at)) {
                self.reached.lock().unwrap().send(()).unwrap();
                self.resume.lock().unwrap().recv().unwrap();
            }
            match fields.get("AGE") {
                Some(Value::Integer(age)) if *age >= 1000 => Err(
                    RepositoryError::CheckConstraintViolation("CHECK constraint failed: AGE < 1000".to_string()),
                ),
                _ => Ok(()),
            }
        }

        fn insert_batch(
            &self,
            _table: &str,
            _rows: &[FieldMap],
        ) -> RepositoryResult<BatchInsertResult> {
            unreachable!("逐行模式不使用批量写入")
        }
    }

    fn dataset(ages: &[i64]) -> Dataset {
        Dataset::new(
            vec!["ID".to_string(), "AGE".to_string(), "NOTE".to_string()],
            ages.iter()
                .enumerate()
                .map(|(i, age)| vec![Value::Integer(i as i64 + 1), Value::Integer(*age), Value::from("x")])
                .collect(),
        )
        .unwrap()
    }

    fn schema() -> FixedSchema {
        FixedSchema(vec![
            ColumnDescriptor::numeric("ID", None, None).primary_key(),
            ColumnDescriptor::numeric("AGE", Some(3), Some(0)),
        ])
    }

    fn engine(ages: &[i64]) -> ImportEngine<FixedSchema, RecordingSink> {
        ImportEngine::new(schema(), RecordingSink::default(), dataset(ages))
    }

    fn eligible() -> Vec<String> {
        vec!["ID".to_string(), "AGE".to_string()]
    }

    #[test]
    fn test_import_classifies_rows_in_order() {
        let engine = engine(&[10, 2000, 30, 4000]);
        let mut omitted_rows = Vec::new();
        let mut progress = Vec::new();

        let summary = engine
            .import(
                "person",
                &eligible(),
                |r| omitted_rows.push(r.row_number),
                |done, total| progress.push((done, total)),
            )
            .unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.omitted, 2);
        assert_eq!(summary.inserted + summary.details.len(), 4);
        assert!(!summary.cancelled);
        assert_eq!(omitted_rows, vec![2, 4]);
        assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);

        // 被跳过的记录保留全部原始列 + 错误原因
        let first = &summary.details[0];
        assert_eq!(first.fields.get("NOTE"), Some(&Value::from("x")));
        assert!(first.error.contains("AGE < 1000"));
    }

    #[test]
    fn test_only_eligible_columns_written() {
        let engine = engine(&[10]);

        engine.import("person", &eligible(), |_| {}, |_, _| {}).unwrap();

        let written = engine.row_sink.written.lock().unwrap();
        assert_eq!(written[0].columns().collect::<Vec<_>>(), vec!["ID", "AGE"]);
    }

    #[test]
    fn test_cancel_mid_run() {
        let engine = engine(&[1, 2, 3, 4, 5]);
        let handle = engine.cancel_handle();

        let summary = engine
            .import("person", &eligible(), |_| {}, |done, _| {
                if done == 2 {
                    handle.cancel();
                }
            })
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 2);
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();
        let sink = HandshakeSink {
            pause_at: 3,
            reached: Mutex::new(reached_tx),
            resume: Mutex::new(resume_rx),
        };
        let engine = ImportEngine::new(schema(), sink, dataset(&[10, 2000, 30, 40, 50, 60]));
        let handle = engine.cancel_handle();

        // 第 3 行写入期间由另一个线程置位取消标记
        let canceller = thread::spawn(move || {
            reached_rx.recv().unwrap();
            handle.cancel();
            resume_tx.send(()).unwrap();
        });

        let mut progress_calls = 0;
        let summary = engine
            .import("person", &eligible(), |_| {}, |_, _| progress_calls += 1)
            .unwrap();
        canceller.join().unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.processed(), 3);
        assert!(summary.processed() < summary.total);
        assert_eq!(summary.inserted + summary.details.len(), summary.processed());
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.details[0].row_number, 2);
        assert_eq!(progress_calls, 3);
    }

    #[test]
    fn test_cancel_is_idempotent_and_sticky() {
        let engine = engine(&[1, 2]);
        engine.cancel();
        engine.cancel();

        let summary = engine.import("person", &eligible(), |_| {}, |_, _| {}).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 0);
    }

    #[test]
    fn test_empty_dataset_fails_fast() {
        let engine = engine(&[]);
        let mut omitted_calls = 0;
        let mut progress_calls = 0;

        let result = engine.import(
            "person",
            &eligible(),
            |_| omitted_calls += 1,
            |_, _| progress_calls += 1,
        );

        assert!(matches!(result, Err(ImportError::EmptyDataset)));
        assert_eq!(omitted_calls + progress_calls, 0);
    }

    #[test]
    fn test_no_eligible_columns_fails_fast() {
        let engine = engine(&[1]);

        let result = engine.import("person", &["OTHER".to_string()], |_| {}, |_, _| {});

        assert!(matches!(result, Err(ImportError::NoEligibleColumns { .. })));
        assert!(engine.row_sink.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_validate_columns_is_idempotent() {
        let engine = engine(&[200, 2000]);
        let visible = vec!["ID".to_string(), "AGE".to_string(), "NOTE".to_string()];

        let first = engine.validate_columns(&visible, "person").unwrap();
        let second = engine.validate_columns(&visible, "person").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.eligible_columns, eligible());
        assert_eq!(first.result_for("AGE").unwrap().error_rows, vec![2]);
        assert!(first.result_for("NOTE").is_none());
    }
}
