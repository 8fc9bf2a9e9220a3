// ==========================================
// 表格数据导入系统 - 应用配置
// ==========================================
// 职责: 连接配置（名称 → SQLite 路径）、默认批大小、报告目录
// 存储: JSON 文件
// 位置: $TABULAR_IMPORT_CONFIG，否则 <系统配置目录>/tabular-import/config.json
// 说明: 连接信息明文保存
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// 覆盖配置文件位置的环境变量
pub const CONFIG_ENV_VAR: &str = "TABULAR_IMPORT_CONFIG";

const CONFIG_DIR_NAME: &str = "tabular-import";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("连接不存在: {0}")]
    ConnectionNotFound(String),

    #[error("未配置连接: 请使用 --database 指定数据库，或先添加连接")]
    NoConnection,

    #[error("无法确定配置目录")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 连接名 → 数据库文件路径
    pub connections: BTreeMap<String, String>,
    pub default_connection: Option<String>,
    /// 默认批大小（1 = 逐行导入）
    pub batch_size: usize,
    /// 跳过记录报告的输出目录
    pub report_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connections: BTreeMap::new(),
            default_connection: None,
            batch_size: 1,
            report_dir: None,
        }
    }
}

impl AppConfig {
    /// 默认配置文件路径
    pub fn default_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// 从文件加载；文件不存在时返回默认配置
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, content).map_err(io_err)?;

        info!(path = %path.display(), "配置已保存");
        Ok(())
    }

    /// 添加或覆盖连接；第一个连接自动成为默认连接
    pub fn add_connection(&mut self, name: impl Into<String>, db_path: impl Into<String>) {
        let name = name.into();
        if self.default_connection.is_none() {
            self.default_connection = Some(name.clone());
        }
        self.connections.insert(name, db_path.into());
    }

    /// 删除连接；删除默认连接时清空默认值
    pub fn remove_connection(&mut self, name: &str) -> ConfigResult<String> {
        let removed = self
            .connections
            .remove(name)
            .ok_or_else(|| ConfigError::ConnectionNotFound(name.to_string()))?;

        if self.default_connection.as_deref() == Some(name) {
            self.default_connection = None;
        }
        Ok(removed)
    }

    /// 解析要使用的数据库路径
    ///
    /// 优先级: 显式名称 → 默认连接 → 唯一连接
    pub fn resolve_connection(&self, name: Option<&str>) -> ConfigResult<&str> {
        if let Some(name) = name {
            return self
                .connections
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| ConfigError::ConnectionNotFound(name.to_string()));
        }

        if let Some(default) = &self.default_connection {
            return self.resolve_connection(Some(default));
        }

        match self.connections.values().collect::<Vec<_>>().as_slice() {
            [only] => Ok(only.as_str()),
            _ => Err(ConfigError::NoConnection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_save_creates_directories_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.add_connection("local", "/tmp/local.db");
        config.batch_size = 500;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.default_connection.as_deref(), Some("local"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"connections": {"a": "a.db"}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.resolve_connection(None).unwrap(), "a.db");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_resolve_and_remove_connection() {
        let mut config = AppConfig::default();
        config.add_connection("a", "a.db");
        config.add_connection("b", "b.db");

        assert_eq!(config.resolve_connection(None).unwrap(), "a.db");
        assert_eq!(config.resolve_connection(Some("b")).unwrap(), "b.db");
        assert!(matches!(
            config.resolve_connection(Some("c")),
            Err(ConfigError::ConnectionNotFound(_))
        ));

        config.remove_connection("a").unwrap();
        assert!(config.default_connection.is_none());
        assert_eq!(config.resolve_connection(None).unwrap(), "b.db");

        config.remove_connection("b").unwrap();
        assert!(matches!(config.resolve_connection(None), Err(ConfigError::NoConnection)));
    }
}
