// ==========================================
// 表格数据导入系统 - 文件解析器实现
// ==========================================
// 职责: 文件 → Dataset（导入引擎本身不解析文件）
// 支持: Excel (.xlsx/.xlsm/.xls/.ods) / CSV (.csv)
// 规则:
// - 首行为表头；重复表头追加 .1/.2 后缀
// - 单元格去空白；完全空白的行跳过
// - 行宽不足补 NULL，多出的单元格丢弃
// ==========================================

use crate::domain::value::{Dataset, Value};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// 分隔符嗅探读取的字节数
const SNIFF_BYTES: usize = 2048;

/// 候选分隔符（平局时按此顺序优先）
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 解析文件为数据集
    fn parse(&self, path: &Path) -> ImportResult<Dataset>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, path: &Path) -> ImportResult<Dataset> {
        ensure_exists(path)?;

        let bytes = std::fs::read(path)?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        if content.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ImportError::FileReadError(format!(
                "文件为空: {}",
                path.display()
            )));
        }

        let delimiter = sniff_delimiter(content);
        debug!(file = %path.display(), delimiter = %(delimiter as char).escape_default(), "CSV 分隔符");

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true) // 允许行长度不一致
            .from_reader(content);

        let headers = dedup_headers(reader.headers()?.iter().map(str::to_string).collect());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<Value> = (0..headers.len())
                .map(|idx| record.get(idx).map(parse_cell).unwrap_or(Value::Null))
                .collect();

            if row.iter().all(Value::is_null) {
                continue;
            }
            rows.push(row);
        }

        info!(file = %path.display(), columns = headers.len(), rows = rows.len(), "CSV 解析完成");
        Ok(Dataset::new(headers, rows)?)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExcelParser {
    /// 指定工作表；None 时取第一个
    pub sheet: Option<String>,
}

impl ExcelParser {
    pub fn with_sheet(sheet: Option<String>) -> Self {
        Self { sheet }
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, path: &Path) -> ImportResult<Dataset> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let sheet_name = match &self.sheet {
            Some(name) => {
                if !sheet_names.iter().any(|s| s == name) {
                    return Err(ImportError::SheetNotFound(name.clone()));
                }
                name.clone()
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut range_rows = range.rows();
        let header_row = range_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError(format!("工作表 {} 为空", sheet_name)))?;
        let headers = dedup_headers(header_row.iter().map(|cell| cell.to_string()).collect());

        let mut rows = Vec::new();
        for data_row in range_rows {
            let row: Vec<Value> = (0..headers.len())
                .map(|idx| data_row.get(idx).map(excel_cell).unwrap_or(Value::Null))
                .collect();

            if row.iter().all(Value::is_null) {
                continue;
            }
            rows.push(row);
        }

        info!(
            file = %path.display(),
            sheet = %sheet_name,
            columns = headers.len(),
            rows = rows.len(),
            "Excel 解析完成"
        );
        Ok(Dataset::new(headers, rows)?)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    pub sheet: Option<String>,
}

impl UniversalFileParser {
    pub fn new(sheet: Option<String>) -> Self {
        Self { sheet }
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Dataset> {
        let path = file_path.as_ref();
        match extension(path).as_str() {
            "csv" => CsvParser.parse(path),
            "xlsx" | "xlsm" | "xls" | "ods" => ExcelParser::with_sheet(self.sheet.clone()).parse(path),
            ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// 列出工作簿中的工作表（CSV 视为单表，返回空列表）
pub fn sheet_names<P: AsRef<Path>>(file_path: P) -> ImportResult<Vec<String>> {
    let path = file_path.as_ref();
    ensure_exists(path)?;

    match extension(path).as_str() {
        "csv" => Ok(Vec::new()),
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(open_workbook_auto(path)?.sheet_names()),
        ext => Err(ImportError::UnsupportedFormat(ext.to_string())),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// 辅助函数
// ==========================================

/// 在样本首行中统计候选分隔符，取出现最多者；都未出现时为逗号
pub fn sniff_delimiter(content: &[u8]) -> u8 {
    let sample = &content[..content.len().min(SNIFF_BYTES)];
    let first_line = sample
        .split(|b| *b == b'\n')
        .next()
        .unwrap_or(sample);

    CANDIDATE_DELIMITERS
        .iter()
        .map(|d| (*d, first_line.iter().filter(|b| *b == d).count()))
        .fold((b',', 0), |best, (d, count)| if count > best.1 { (d, count) } else { best })
        .0
}

/// 文本单元格定型
///
/// - 空 → NULL
/// - 以 0 开头且后接数字（如 "007"）→ 保留文本
/// - 可解析为 i64 → Integer；可解析为有限 f64 → Float；否则 Text
pub fn parse_cell(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::Null;
    }

    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let mut chars = unsigned.chars();
    if chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return Value::Text(text.to_string());
    }

    if let Ok(v) = text.parse::<i64>() {
        return Value::Integer(v);
    }

    // f64 也接受 "inf"/"NaN"，这些按文本处理
    if text.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(v) = text.parse::<f64>() {
            if v.is_finite() {
                return Value::Float(v);
            }
        }
    }

    Value::Text(text.to_string())
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(v) => Value::Integer(*v),
        Data::Float(v) => float_cell(*v),
        Data::Bool(v) => Value::Integer(i64::from(*v)),
        Data::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                Value::Null
            } else {
                Value::Text(text.to_string())
            }
        }
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Text(cell.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
    }
}

/// 整值浮点转为整数（Excel 数字均以浮点存储）
fn float_cell(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::Integer(v as i64)
    } else {
        Value::Float(v)
    }
}

/// 表头去空白、补空名、重复名追加序号
pub fn dedup_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (idx, header) in raw.into_iter().enumerate() {
        let base = match header.trim() {
            "" => format!("column_{}", idx + 1),
            name => name.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}
