// ==========================================
// 表格数据导入系统 - 列校验器
// ==========================================
// 职责: 按列的逻辑类型/精度/小数位/长度检查取值，返回违规行号（1-based）
// 红线: 纯函数，不抛错；任何无法解析的值都降级为“该行无效”
// ==========================================

use crate::domain::schema::{ColumnDescriptor, LogicalType};
use crate::domain::value::Value;

// ==========================================
// ColumnCheck - 单列校验输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnCheck {
    /// 列级错误（如类型不支持），此时 invalid_rows 为空
    pub error: Option<String>,
    /// 违规取值的 1-based 位置
    pub invalid_rows: Vec<usize>,
}

/// 按列描述分派校验
pub fn validate_column(descriptor: &ColumnDescriptor, values: &[&Value]) -> ColumnCheck {
    match &descriptor.logical_type {
        LogicalType::Numeric => ColumnCheck {
            error: None,
            invalid_rows: validate_numeric(
                values,
                descriptor.precision,
                descriptor.scale,
                descriptor.is_nullable,
            ),
        },
        LogicalType::Text => ColumnCheck {
            error: None,
            invalid_rows: validate_text(values, descriptor.max_length, descriptor.is_nullable),
        },
        LogicalType::Other(declared) => ColumnCheck {
            error: Some(format!("数据类型 {} 不支持校验", display_type(declared))),
            invalid_rows: Vec::new(),
        },
    }
}

fn display_type(declared: &str) -> &str {
    if declared.is_empty() {
        "(未声明)"
    } else {
        declared
    }
}

// ==========================================
// 数值校验
// ==========================================
// 规则:
// - 无法转换为数值 → 无效
// - scale > 0 且小数位数 > scale → 无效（scale 缺省为 0，此时不检查小数位）
// - precision 存在且整数部分位数 > precision → 无效
// - NULL: 可空列通过，非空列无效
pub fn validate_numeric(
    values: &[&Value],
    precision: Option<u32>,
    scale: Option<u32>,
    nullable: bool,
) -> Vec<usize> {
    let scale = scale.unwrap_or(0) as usize;

    values
        .iter()
        .enumerate()
        .filter(|(_, value)| {
            if value.is_null() {
                return !nullable;
            }
            match decimal_digits(value) {
                None => true,
                Some(digits) => {
                    let scale_exceeded = scale > 0 && digits.fraction > scale;
                    let precision_exceeded =
                        precision.is_some_and(|p| digits.integer > p as usize);
                    scale_exceeded || precision_exceeded
                }
            }
        })
        .map(|(idx, _)| idx + 1)
        .collect()
}

// ==========================================
// 文本校验
// ==========================================
// 规则: 字符长度 > max_length → 无效；max_length 缺省时不检查长度
pub fn validate_text(values: &[&Value], max_length: Option<u32>, nullable: bool) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, value)| {
            if value.is_null() {
                return !nullable;
            }
            max_length.is_some_and(|max| value.to_string().chars().count() > max as usize)
        })
        .map(|(idx, _)| idx + 1)
        .collect()
}

// ==========================================
// 十进制位数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalDigits {
    pub integer: usize,  // |v| 整数部分位数（0.5 → 1）
    pub fraction: usize, // 有效小数位数（不含末尾 0）
}

/// 计算取值的十进制位数
///
/// 规范化规则:
/// - 整数: 十进制文本
/// - 浮点: Rust 最短往返表示（无指数形式），整值浮点小数位为 0
/// - 文本: 纯十进制写法按字面计算（去符号、去前导 0、去小数末尾 0）；
///   指数写法先转为浮点再按浮点规则计算
/// - 非有限浮点 / 非数值文本 → None
pub fn decimal_digits(value: &Value) -> Option<DecimalDigits> {
    match value {
        Value::Null => None,
        Value::Integer(v) => Some(DecimalDigits {
            integer: v.unsigned_abs().to_string().len(),
            fraction: 0,
        }),
        Value::Float(v) => float_digits(*v),
        Value::Text(text) => {
            let text = text.trim();
            // 纯十进制写法不经过 f64，超出 f64 范围的长数字仍是数值
            if is_plain_decimal(text) {
                return Some(literal_digits(text));
            }
            text.parse::<f64>().ok().and_then(float_digits)
        }
    }
}

fn float_digits(v: f64) -> Option<DecimalDigits> {
    if !v.is_finite() {
        return None;
    }
    Some(literal_digits(&v.abs().to_string()))
}

/// 形如 [+-]digits[.digits] 的纯十进制文本
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut parts = unsigned.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    (!int_part.is_empty() || !frac_part.is_empty())
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.chars().all(|c| c.is_ascii_digit())
}

fn literal_digits(text: &str) -> DecimalDigits {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let int_trimmed = int_part.trim_start_matches('0');
    let frac_trimmed = frac_part.trim_end_matches('0');

    DecimalDigits {
        integer: int_trimmed.len().max(1),
        fraction: frac_trimmed.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(values: &[Value]) -> Vec<&Value> {
        values.iter().collect()
    }

    #[test]
    fn test_scale_exceeded() {
        let values = [Value::Float(123.456)];
        assert_eq!(validate_numeric(&refs(&values), None, Some(2), true), vec![1]);
    }

    #[test]
    fn test_precision_exceeded() {
        let values = [Value::Integer(12345)];
        assert_eq!(validate_numeric(&refs(&values), Some(4), None, true), vec![1]);
    }

    #[test]
    fn test_precision_and_scale_ok() {
        let values = [Value::Float(12.3), Value::from("12.3")];
        assert!(validate_numeric(&refs(&values), Some(3), Some(1), true).is_empty());
    }

    #[test]
    fn test_non_numeric_text_flagged() {
        let values = [Value::Integer(1), Value::from("abc"), Value::from("7")];
        assert_eq!(validate_numeric(&refs(&values), Some(3), None, true), vec![2]);
    }

    #[test]
    fn test_numeric_text_precision() {
        let values = [Value::from("200"), Value::from("2000"), Value::from("-999")];
        assert_eq!(validate_numeric(&refs(&values), Some(3), Some(0), true), vec![2]);
    }

    #[test]
    fn test_scale_zero_skips_fraction_check() {
        let values = [Value::Float(1.25)];
        assert!(validate_numeric(&refs(&values), Some(3), Some(0), true).is_empty());
    }

    #[test]
    fn test_null_depends_on_nullability() {
        let values = [Value::Null];
        assert!(validate_numeric(&refs(&values), Some(3), None, true).is_empty());
        assert_eq!(validate_numeric(&refs(&values), Some(3), None, false), vec![1]);
        assert_eq!(validate_text(&refs(&values), Some(3), false), vec![1]);
    }

    #[test]
    fn test_decimal_digits_canonicalization() {
        assert_eq!(
            decimal_digits(&Value::from("12.50")),
            Some(DecimalDigits { integer: 2, fraction: 1 })
        );
        assert_eq!(
            decimal_digits(&Value::from("0.5")),
            Some(DecimalDigits { integer: 1, fraction: 1 })
        );
        assert_eq!(
            decimal_digits(&Value::from("1.5e2")),
            Some(DecimalDigits { integer: 3, fraction: 0 })
        );
        assert_eq!(
            decimal_digits(&Value::Float(2.0)),
            Some(DecimalDigits { integer: 1, fraction: 0 })
        );
        assert_eq!(decimal_digits(&Value::Float(f64::NAN)), None);
        assert_eq!(decimal_digits(&Value::from("1,5")), None);
    }

    #[test]
    fn test_long_plain_decimal_text_is_numeric() {
        let long = "1".repeat(400);
        assert_eq!(
            decimal_digits(&Value::from(long.as_str())),
            Some(DecimalDigits {
                integer: 400,
                fraction: 0
            })
        );

        let values = [Value::from(long.as_str())];
        assert!(validate_numeric(&refs(&values), None, None, true).is_empty());
        assert_eq!(validate_numeric(&refs(&values), Some(38), None, true), vec![1]);

        // 指数写法溢出仍视为非数值
        assert_eq!(decimal_digits(&Value::from("1e400")), None);
    }

    #[test]
    fn test_text_length_boundary() {
        let ok = "a".repeat(20);
        let too_long = "a".repeat(21);
        let values = [Value::from(ok.as_str()), Value::from(too_long.as_str())];

        assert_eq!(validate_text(&refs(&values), Some(20), true), vec![2]);
    }

    #[test]
    fn test_text_without_limit_never_flagged() {
        let long = "x".repeat(5000);
        let values = [Value::from(long.as_str()), Value::Integer(123456)];
        assert!(validate_text(&refs(&values), None, true).is_empty());
    }

    #[test]
    fn test_text_counts_characters_not_bytes() {
        let values = [Value::from("ñandú")];
        assert!(validate_text(&refs(&values), Some(5), true).is_empty());
    }

    #[test]
    fn test_unsupported_type_reports_column_error() {
        let descriptor = ColumnDescriptor::other("BORN", "DATE");
        let values = [Value::from("2024-01-01")];

        let check = validate_column(&descriptor, &refs(&values));
        assert!(check.error.unwrap().contains("DATE"));
        assert!(check.invalid_rows.is_empty());
    }
}
