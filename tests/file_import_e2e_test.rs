// ==========================================
// 文件 → 校验 → 导入 端到端测试
// ==========================================


use tabular_import::api::{ImportApi, ImportObserver, ImportOptions, NoopObserver};
use tabular_import::domain::{OmittedRecord, ValidationStatus};
use tabular_import::logging;
use test_helpers::{create_test_db, person_ids, write_csv};

#[derive(Default)]
struct Recorder {
    omitted: Vec<usize>,
    progress_calls: usize,
}

impl ImportObserver for Recorder {
    fn on_omitted(&mut self, record: &OmittedRecord) {
        self.omitted.push(record.row_number);
    }

    fn on_progress(&mut self, _processed: usize, _total: usize) {
        self.progress_calls += 1;
    }
}

#[test]
fn test_csv_file_import_end_to_end() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let csv = write_csv("ID;NAME;AGE;EXTRA\n1;Ana;31;x\n2;Luis;2000;y\n3;Marta;27;z\n");

    let api = ImportApi::open(&db_path).unwrap();
    let dataset = api.load_file(csv.path(), None).unwrap();
    let job = api.prepare(dataset);

    let matched = job.validate("person").unwrap();
    assert_eq!(matched.result_for("AGE").unwrap().error_rows, vec![2]);
    assert!(matched.result_for("EXTRA").is_none());
    assert_eq!(
        matched.result_for("BORN").unwrap().status,
        ValidationStatus::NotInDataset
    );

    let mut recorder = Recorder::default();
    let summary = job
        .import("person", &ImportOptions::default(), &mut recorder)
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(recorder.omitted, vec![2]);
    assert_eq!(recorder.progress_calls, 3);
    assert_eq!(person_ids(&db_path), vec![1, 3]);

    // 跳过记录保留原始全部列（包括未导入的 EXTRA）
    let detail = serde_json::to_value(&summary.details[0]).unwrap();
    assert_eq!(detail["EXTRA"], "y");
    assert!(detail["error"].is_string());
}

#[test]
fn test_table_listing_and_describe() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::open(&db_path).unwrap();

    assert_eq!(api.list_tables().unwrap(), vec!["person"]);
    assert_eq!(api.filter_tables("PER").unwrap(), vec!["person"]);
    assert!(api.filter_tables("zzz").unwrap().is_empty());

    let columns = api.describe_table("person").unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ID", "NAME", "AGE", "BORN"]);
    assert_eq!(columns[1].max_length, Some(20));
    assert!(!columns[1].is_nullable);
    assert_eq!(columns[2].precision, Some(3));
    assert!(columns[2].has_check_constraint);
}

#[test]
fn test_explicit_columns_option() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let csv = write_csv("ID,NAME,AGE\n1,Ana,31\n");

    let api = ImportApi::open(&db_path).unwrap();
    let dataset = api.load_file(csv.path(), None).unwrap();
    let options = ImportOptions {
        batch_size: 1,
        columns: Some(vec!["ID".to_string(), "NAME".to_string()]),
    };

    let summary = api
        .import(dataset, "person", &options, &mut NoopObserver)
        .unwrap();
    assert_eq!(summary.inserted, 1);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let age: Option<i64> = conn
        .query_row("SELECT AGE FROM person WHERE ID = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(age, None);
}
