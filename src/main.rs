// ==========================================
// 表格数据导入系统 - 命令行入口
// ==========================================
// 子命令: connections / tables / describe / sheets / validate / import
// 导入在阻塞线程中执行；Ctrl-C 请求取消（已写入的行保留）
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabular_import::api::{ImportApi, ImportObserver, ImportOptions};
use tabular_import::config::AppConfig;
use tabular_import::domain::{ImportSummary, OmittedRecord, SchemaMatch};
use tabular_import::logging;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tabular-import", version)]
#[command(about = "表格数据导入: 校验表格文件并批量写入数据库表")]
struct Cli {
    /// 使用已保存的连接
    #[arg(long, global = true)]
    connection: Option<String>,

    /// 直接指定 SQLite 数据库文件（优先于 --connection）
    #[arg(long, global = true)]
    database: Option<String>,

    /// 配置文件路径（默认: $TABULAR_IMPORT_CONFIG 或系统配置目录）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 日志输出为 JSON 行
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 管理数据库连接
    Connections {
        #[command(subcommand)]
        action: ConnectionsAction,
    },
    /// 列出数据库表
    Tables {
        /// 按名称片段过滤（不区分大小写）
        #[arg(long)]
        filter: Option<String>,
    },
    /// 查看表结构
    Describe { table: String },
    /// 列出工作簿中的工作表
    Sheets { file: PathBuf },
    /// 校验文件与表结构（不写入）
    Validate {
        file: PathBuf,
        table: String,
        #[arg(long)]
        sheet: Option<String>,
    },
    /// 导入文件到表
    Import {
        file: PathBuf,
        table: String,
        #[arg(long)]
        sheet: Option<String>,
        /// 批大小（1 = 逐行）；默认取配置
        #[arg(long)]
        batch_size: Option<usize>,
        /// 跳过记录报告输出路径
        #[arg(long)]
        report: Option<PathBuf>,
        /// 不打印校验报告
        #[arg(long)]
        skip_validation: bool,
    },
}

#[derive(Subcommand)]
enum ConnectionsAction {
    List,
    Add { name: String, path: String },
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };
    let mut config = AppConfig::load(&config_path)?;

    match cli.command {
        Command::Connections { action } => {
            manage_connections(&mut config, &config_path, action)?;
        }
        Command::Tables { filter } => {
            let api = open_api(&config, &cli.connection, &cli.database)?;
            let tables = match filter {
                Some(text) => api.filter_tables(&text)?,
                None => api.list_tables()?,
            };
            for table in tables {
                println!("{}", table);
            }
        }
        Command::Describe { table } => {
            let api = open_api(&config, &cli.connection, &cli.database)?;
            println!("{:<24} {:<16} {:<10} {:<6} {:<6}", "列名", "声明类型", "逻辑类型", "主键", "可空");
            for column in api.describe_table(&table)? {
                println!(
                    "{:<24} {:<16} {:<10} {:<6} {:<6}",
                    column.name,
                    column.declared_type,
                    column.logical_type.to_string(),
                    yes_no(column.is_primary_key),
                    yes_no(column.is_nullable),
                );
            }
        }
        Command::Sheets { file } => {
            let api = open_api(&config, &cli.connection, &cli.database)?;
            for sheet in api.sheet_names(&file)? {
                println!("{}", sheet);
            }
        }
        Command::Validate { file, table, sheet } => {
            let api = open_api(&config, &cli.connection, &cli.database)?;
            let dataset = api.load_file(&file, sheet)?;
            let matched = api.validate(dataset, &table)?;
            print_validation(&matched);
        }
        Command::Import {
            file,
            table,
            sheet,
            batch_size,
            report,
            skip_validation,
        } => {
            let api = open_api(&config, &cli.connection, &cli.database)?;
            let dataset = api.load_file(&file, sheet)?;
            let job = api.prepare(dataset);

            if !skip_validation {
                print_validation(&job.validate(&table)?);
            }

            // Ctrl-C → 取消标记
            let cancel = job.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到中断信号，当前行/批次完成后停止导入");
                    cancel.cancel();
                }
            });

            let options = ImportOptions {
                batch_size: batch_size.unwrap_or(config.batch_size),
                columns: None,
            };
            let summary = tokio::task::spawn_blocking(move || {
                job.import(&table, &options, &mut ProgressPrinter)
            })
            .await
            .context("导入任务异常退出")??;

            print_summary(&summary);

            let report_path = report.or_else(|| {
                config
                    .report_dir
                    .as_ref()
                    .filter(|_| summary.omitted > 0)
                    .map(|dir| dir.join(format!("omitted-{}.json", summary.import_id)))
            });
            if let Some(path) = report_path {
                let written = ImportApi::write_omitted_report(&summary, &path)?;
                println!("跳过记录报告: {} ({} 条)", path.display(), written);
            }
        }
    }

    Ok(())
}

fn open_api(
    config: &AppConfig,
    connection: &Option<String>,
    database: &Option<String>,
) -> Result<ImportApi> {
    let db_path = match database {
        Some(path) => path.clone(),
        None => config.resolve_connection(connection.as_deref())?.to_string(),
    };
    info!(database = %db_path, "打开数据库");
    Ok(ImportApi::open(&db_path)?)
}

fn manage_connections(
    config: &mut AppConfig,
    config_path: &Path,
    action: ConnectionsAction,
) -> Result<()> {
    match action {
        ConnectionsAction::List => {
            if config.connections.is_empty() {
                println!("（无连接）");
            }
            for (name, path) in &config.connections {
                let marker = if config.default_connection.as_deref() == Some(name) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<16} {}", marker, name, path);
            }
        }
        ConnectionsAction::Add { name, path } => {
            config.add_connection(name.clone(), path);
            config.save(config_path)?;
            println!("已添加连接: {}", name);
        }
        ConnectionsAction::Remove { name } => {
            config.remove_connection(&name)?;
            config.save(config_path)?;
            println!("已删除连接: {}", name);
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "是"
    } else {
        "否"
    }
}

fn print_validation(matched: &SchemaMatch) {
    println!("=== 校验报告 ===");
    println!("{:<24} {:<12} 违规行", "列名", "状态");
    for result in &matched.results {
        let detail = match &result.message {
            Some(message) => message.clone(),
            None => result.error_rows_display(),
        };
        println!(
            "{:<24} {:<12} {}",
            result.column_name,
            result.status.label(),
            detail
        );
    }
    println!("可导入列: {}", matched.eligible_columns.join(", "));
    println!();
}

fn print_summary(summary: &ImportSummary) {
    println!();
    println!("=== 导入结果 ===");
    println!("导入编号: {}", summary.import_id);
    println!("目标表:   {}", summary.table);
    println!("总行数:   {}", summary.total);
    println!("已写入:   {}", summary.inserted);
    println!("已跳过:   {}", summary.omitted);
    if summary.cancelled {
        println!("状态:     已取消（已处理 {} 行）", summary.processed());
    }
    println!("耗时:     {} ms", summary.elapsed_ms());
}

// ==========================================
// 进度输出（stderr，单行刷新）
// ==========================================
struct ProgressPrinter;

impl ImportObserver for ProgressPrinter {
    fn on_omitted(&mut self, record: &OmittedRecord) {
        eprintln!("\r行 {} 已跳过: {}", record.row_number, record.error);
    }

    fn on_progress(&mut self, processed: usize, total: usize) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r进度: {}/{}", processed, total);
        let _ = stderr.flush();
    }
}
