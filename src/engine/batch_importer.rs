// ==========================================
// 表格数据导入系统 - 分批导入器
// ==========================================
// 职责: 固定大小分批 → RowSink 批量写入（整批失败则逐行回退）
// 红线:
// - 已提交的批次不因后续失败回滚
// - 致命批次错误: 该批次已由 Sink 回滚，此处上抛，不继续
// - 取消在批次之间检查
// ==========================================

use crate::domain::import::{ImportSummary, OmittedRecord};
use crate::domain::value::Dataset;
use crate::engine::import_engine::{CancelHandle, ImportSession};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::row_sink::RowSink;
use tracing::{debug, error, info};

pub struct BatchImporter<'a, S: RowSink + ?Sized> {
    sink: &'a S,
    dataset: &'a Dataset,
    cancel: &'a CancelHandle,
    batch_size: usize,
}

impl<'a, S: RowSink + ?Sized> BatchImporter<'a, S> {
    /// batch_size 最小为 1
    pub fn new(sink: &'a S, dataset: &'a Dataset, cancel: &'a CancelHandle, batch_size: usize) -> Self {
        Self {
            sink,
            dataset,
            cancel,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 执行分批导入
    ///
    /// # 参数
    /// - table: 目标表名
    /// - columns: 实际写入列（已与数据集列求交）
    /// - on_omitted: 每条被跳过的记录回调（批内按行号顺序）
    /// - on_progress: 每批处理后回调 (已处理, 总数)
    pub fn run<O, G>(
        &self,
        table: &str,
        columns: &[String],
        mut on_omitted: O,
        mut on_progress: G,
    ) -> ImportResult<ImportSummary>
    where
        O: FnMut(&OmittedRecord),
        G: FnMut(usize, usize),
    {
        let total = self.dataset.len();
        let mut session = ImportSession::start();

        info!(
            import_id = %session.import_id,
            total = total,
            columns = columns.len(),
            batch_size = self.batch_size,
            mode = "batch",
            "开始导入"
        );

        let mut start = 0;
        while start < total {
            if self.cancel.is_cancelled() {
                info!(import_id = %session.import_id, processed = session.processed(), "导入已取消");
                break;
            }

            let end = (start + self.batch_size).min(total);
            let rows = (start..end)
                .map(|row| {
                    self.dataset
                        .project(row, columns)
                        .ok_or_else(|| ImportError::InternalError(format!("行 {} 越界", row + 1)))
                })
                .collect::<ImportResult<Vec<_>>>()?;

            let mut result = self.sink.insert_batch(table, &rows).map_err(|e| {
                error!(
                    import_id = %session.import_id,
                    first_row = start + 1,
                    error = %e,
                    "批次写入出现致命错误，已回滚该批次"
                );
                ImportError::BatchFailed {
                    first_row: start + 1,
                    source: e,
                }
            })?;

            if result.fell_back {
                debug!(
                    first_row = start + 1,
                    failed = result.errors.len(),
                    "批次已回退到逐行写入"
                );
            }

            session.record_inserted(result.success_indices.len());

            result.errors.sort_by_key(|e| e.index);
            for row_error in result.errors {
                let row = start + row_error.index;
                let record = OmittedRecord {
                    row_number: row + 1,
                    fields: self.dataset.record(row).unwrap_or_default(),
                    error: row_error.message,
                };
                on_omitted(session.record_omitted(record));
            }

            on_progress(session.processed(), total);
            start = end;
        }

        Ok(session.finish(table, total, self.cancel.is_cancelled()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::{FieldMap, Value};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::repository::row_sink::{BatchInsertResult, BatchRowError};
    use std::sync::Mutex;

    /// 负数 AGE 为行级错误；AGE == 666 模拟连接中断（致命）
    #[derive(Default)]
    struct ScriptedSink {
        batches: Mutex<Vec<usize>>,
    }

    impl RowSink for ScriptedSink {
        fn insert_row(&self, _table: &str, _fields: &FieldMap) -> RepositoryResult<()> {
            Ok(())
        }

        fn insert_batch(&self, _table: &str, rows: &[FieldMap]) -> RepositoryResult<BatchInsertResult> {
            self.batches.lock().unwrap().push(rows.len());
            let mut result = BatchInsertResult::default();
            for (index, row) in rows.iter().enumerate() {
                match row.get("AGE") {
                    Some(Value::Integer(666)) => {
                        return Err(RepositoryError::DatabaseConnectionError("连接中断".to_string()))
                    }
                    Some(Value::Integer(age)) if *age < 0 => {
                        result.fell_back = true;
                        result.errors.push(BatchRowError {
                            index,
                            message: format!("AGE 不能为负: {}", age),
                        });
                    }
                    _ => result.success_indices.push(index),
                }
            }
            Ok(result)
        }
    }

    fn dataset(ages: &[i64]) -> Dataset {
        Dataset::new(
            vec!["AGE".to_string()],
            ages.iter().map(|age| vec![Value::Integer(*age)]).collect(),
        )
        .unwrap()
    }

    fn columns() -> Vec<String> {
        vec!["AGE".to_string()]
    }

    #[test]
    fn test_batches_and_omissions() {
        let sink = ScriptedSink::default();
        let data = dataset(&[1, -2, 3, 4, -5]);
        let cancel = CancelHandle::new();
        let mut omitted = Vec::new();
        let mut progress = Vec::new();

        let summary = BatchImporter::new(&sink, &data, &cancel, 2)
            .run(
                "t",
                &columns(),
                |r| omitted.push(r.row_number),
                |done, total| progress.push((done, total)),
            )
            .unwrap();

        assert_eq!(*sink.batches.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.omitted, 2);
        assert_eq!(omitted, vec![2, 5]);
        assert_eq!(progress, vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[test]
    fn test_fatal_batch_error_is_raised() {
        let sink = ScriptedSink::default();
        let data = dataset(&[1, 2, 666, 4]);
        let cancel = CancelHandle::new();
        let mut progress = Vec::new();

        let result = BatchImporter::new(&sink, &data, &cancel, 2).run(
            "t",
            &columns(),
            |_| {},
            |done, _| progress.push(done),
        );

        assert!(matches!(
            result,
            Err(ImportError::BatchFailed { first_row: 3, .. })
        ));
        // 第一批已提交，第二批之后不再继续
        assert_eq!(progress, vec![2]);
        assert_eq!(*sink.batches.lock().unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let sink = ScriptedSink::default();
        let data = dataset(&[1, 2]);
        let cancel = CancelHandle::new();

        let importer = BatchImporter::new(&sink, &data, &cancel, 0);
        assert_eq!(importer.batch_size(), 1);

        let summary = importer.run("t", &columns(), |_| {}, |_, _| {}).unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(*sink.batches.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_cancel_between_batches() {
        let sink = ScriptedSink::default();
        let data = dataset(&[1, 2, 3, 4, 5, 6]);
        let cancel = CancelHandle::new();
        let handle = cancel.clone();

        let summary = BatchImporter::new(&sink, &data, &cancel, 2)
            .run("t", &columns(), |_| {}, |done, _| {
                if done >= 2 {
                    handle.cancel();
                }
            })
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 2);
    }
}
