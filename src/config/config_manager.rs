// ==========================================
// 库存分配系统 - 配置管理器
// ==========================================
// 职责: 月度日历与分配参数的加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::allocation_config_trait::AllocationConfigReader;
use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::calendar::MonthCalendar;
use crate::engine::reconciliation::{
    ReconciliationPolicy, DEFAULT_MIN_TOLERANCE_UNITS, DEFAULT_TOLERANCE_PCT,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 缺省并行工作线程数
pub const DEFAULT_MAX_WORKERS: usize = 4;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置,格式错误时回退到默认值并告警
    fn get_f64_or_default(&self, key: &str, default: f64) -> ConfigResult<f64> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "数值配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== 月度日历 =====

    /// 保存月度日历（保存前校验）
    pub fn save_month_calendar(&self, calendar: &MonthCalendar) -> ConfigResult<()> {
        calendar.validate()?;
        let json = serde_json::to_string(calendar)?;
        self.set_global_config_value(&config_keys::month_calendar(&calendar.month_key), &json)?;
        tracing::info!(month_key = %calendar.month_key, weeks = calendar.weeks.len(), "月度日历已保存");
        Ok(())
    }

    /// 读取月度日历（同步版本）
    pub fn load_month_calendar(&self, month_key: &str) -> ConfigResult<MonthCalendar> {
        let key = config_keys::month_calendar(month_key.trim());
        let raw = self
            .get_config_value(&key)?
            .ok_or_else(|| ConfigError::CalendarNotFound(month_key.to_string()))?;

        let calendar: MonthCalendar =
            serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
                key: key.clone(),
                message: e.to_string(),
            })?;
        calendar.validate()?;
        Ok(calendar)
    }

    /// 已配置的月份列表（升序）
    pub fn list_month_keys(&self) -> ConfigResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT key FROM config_kv WHERE scope_id = 'global' AND key LIKE ?1 ORDER BY key",
        )?;
        let pattern = format!("{}%", config_keys::MONTH_CALENDAR_PREFIX);
        let keys = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(keys
            .into_iter()
            .filter_map(|k| {
                k.strip_prefix(config_keys::MONTH_CALENDAR_PREFIX)
                    .map(|s| s.to_string())
            })
            .collect())
    }

    // ===== 对账与并行参数 =====

    pub fn load_reconciliation_policy(&self) -> ConfigResult<ReconciliationPolicy> {
        Ok(ReconciliationPolicy {
            tolerance_pct: self
                .get_f64_or_default(config_keys::RECONCILIATION_TOLERANCE_PCT, DEFAULT_TOLERANCE_PCT)?,
            min_tolerance_units: self.get_f64_or_default(
                config_keys::RECONCILIATION_MIN_UNITS,
                DEFAULT_MIN_TOLERANCE_UNITS,
            )?,
        })
    }

    pub fn load_max_workers(&self) -> ConfigResult<usize> {
        let raw = self.get_config_or_default(
            config_keys::ALLOCATION_MAX_WORKERS,
            &DEFAULT_MAX_WORKERS.to_string(),
        )?;
        Ok(raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_WORKERS))
    }
}

// ==========================================
// AllocationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AllocationConfigReader for ConfigManager {
    async fn get_month_calendar(&self, month_key: &str) -> ConfigResult<MonthCalendar> {
        self.load_month_calendar(month_key)
    }

    async fn get_reconciliation_policy(&self) -> ConfigResult<ReconciliationPolicy> {
        self.load_reconciliation_policy()
    }

    async fn get_max_workers(&self) -> ConfigResult<usize> {
        self.load_max_workers()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 月度日历 (JSON), 完整键为 month_calendar/{month_key}
    pub const MONTH_CALENDAR_PREFIX: &str = "month_calendar/";

    // 对账
    pub const RECONCILIATION_TOLERANCE_PCT: &str = "reconciliation_tolerance_pct";
    pub const RECONCILIATION_MIN_UNITS: &str = "reconciliation_min_units";

    // 并行
    pub const ALLOCATION_MAX_WORKERS: &str = "allocation_max_workers";

    pub fn month_calendar(month_key: &str) -> String {
        format!("{}{}", MONTH_CALENDAR_PREFIX, month_key)
    }
}
