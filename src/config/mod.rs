// ==========================================
// 表格数据导入系统 - 配置层
// ==========================================
// 职责: 应用配置的加载与保存（JSON 文件）
// ==========================================

pub mod app_config;

// 重导出核心配置
pub use app_config::{AppConfig, ConfigError, ConfigResult, CONFIG_ENV_VAR};
