// ==========================================
// 库存分配系统 - 分配输入仓储
// ==========================================
// 红线: Repository 不含业务逻辑,只负责读取与组装
// 职责: 按月度日历读取配额/盘点/到货/销量,组装为 SkuAllocationInput
// ==========================================

use crate::domain::calendar::{MonthCalendar, Week};
use crate::domain::inventory::{ActualSales, ChannelQuota, PhysicalSnapshot, SkuAllocationInput};
use crate::domain::types::non_negative;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// 参与销量统计的流水状态
pub const SALES_STATUS_ORDER: &str = "ORDER";

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ==========================================
// AllocationInputRepository
// ==========================================
pub struct AllocationInputRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationInputRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 组装
    // ==========================================

    /// 加载一个月份的全部 SKU 分配输入
    ///
    /// 只包含至少一个渠道配额 > 0 的 SKU,按 SKU 升序返回。
    /// 盘点/到货/销量缺失时保持缺失,由引擎按缺省规则处理。
    pub fn load_month_inputs(&self, calendar: &MonthCalendar) -> RepositoryResult<Vec<SkuAllocationInput>> {
        let quotas = self.find_channel_quotas(&calendar.month_key)?;
        let mut inputs: BTreeMap<String, SkuAllocationInput> = BTreeMap::new();
        for (sku, channels) in quotas {
            let total: f64 = channels.iter().map(|c| c.quota_units).sum();
            if total <= 0.0 {
                continue;
            }
            let mut input = SkuAllocationInput::new(sku.clone());
            input.channels = channels
                .into_iter()
                .map(|mut c| {
                    c.weight = if total > 0.0 { c.quota_units / total } else { 0.0 };
                    c
                })
                .collect();
            inputs.insert(sku, input);
        }

        if inputs.is_empty() {
            info!(month_key = %calendar.month_key, "该月无有效渠道配额");
            return Ok(Vec::new());
        }

        for (sku, description) in self.find_descriptions()? {
            if let Some(input) = inputs.get_mut(&sku) {
                input.description = description;
            }
        }

        for week in calendar.ordered_weeks() {
            let measured = self.find_inventory_on(week.snapshot_date())?;
            let supply = self.find_supply_for_week(week.start_date)?;

            for (sku, input) in inputs.iter_mut() {
                // 盘点值为 0 视为未盘点,沿用上周结转
                let initial = measured.get(sku).copied().filter(|units| *units > 0.0);
                let (arrivals, reserved) = supply.get(sku).copied().unwrap_or((0.0, 0.0));
                if initial.is_some() || supply.contains_key(sku) {
                    input.snapshots.insert(
                        week.index,
                        PhysicalSnapshot {
                            initial_stock_units: initial,
                            arrivals_units: arrivals,
                            reserved_units: reserved,
                        },
                    );
                }
            }

            for sale in self.find_sales_for_week(&week)? {
                if let Some(input) = inputs.get_mut(&sale.sku) {
                    input.record_sales(sale);
                }
            }
        }

        debug!(
            month_key = %calendar.month_key,
            skus = inputs.len(),
            weeks = calendar.weeks.len(),
            "分配输入加载完成"
        );

        Ok(inputs.into_values().collect())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 渠道月度配额
    ///
    /// 同一 SKU+渠道 存在多条有效记录时取 modified_at 最新的一条
    pub fn find_channel_quotas(&self, month_key: &str) -> RepositoryResult<BTreeMap<String, Vec<ChannelQuota>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, channel, quota_units
            FROM monthly_channel_quota
            WHERE month_key = ?1
              AND active = 1
              AND TRIM(channel) <> ''
            ORDER BY sku, channel, modified_at, rowid
            "#,
        )?;

        let rows = stmt
            .query_map(params![month_key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // 按顺序覆盖,最后一条即最新
        let mut latest: BTreeMap<(String, String), f64> = BTreeMap::new();
        for (sku, channel, quota) in rows {
            latest.insert((sku, channel), non_negative(quota.unwrap_or(0.0)));
        }

        let mut by_sku: BTreeMap<String, Vec<ChannelQuota>> = BTreeMap::new();
        for ((sku, channel), quota) in latest {
            if quota <= 0.0 {
                continue;
            }
            by_sku
                .entry(sku)
                .or_default()
                .push(ChannelQuota::new(channel, quota));
        }
        Ok(by_sku)
    }

    /// 某盘点日的库存 (可用 + 在途),按 SKU 汇总
    pub fn find_inventory_on(&self, snapshot_date: NaiveDate) -> RepositoryResult<BTreeMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, SUM(COALESCE(free_units, 0) + COALESCE(transit_units, 0))
            FROM inventory_snapshot
            WHERE snapshot_date = ?1
            GROUP BY sku
            "#,
        )?;

        let rows = stmt
            .query_map(params![date_str(snapshot_date)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(sku, units)| (sku, non_negative(units.unwrap_or(0.0))))
            .collect())
    }

    /// 某周的到货与预留
    pub fn find_supply_for_week(&self, week_start: NaiveDate) -> RepositoryResult<BTreeMap<String, (f64, f64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, COALESCE(expected_arrivals, 0), COALESCE(reserved_forecast, 0)
            FROM weekly_supply
            WHERE week_start = ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![date_str(week_start)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(sku, arrivals, reserved)| (sku, (non_negative(arrivals), non_negative(reserved))))
            .collect())
    }

    /// 某周销量窗口内的实际销量,按 SKU+渠道 汇总
    pub fn find_sales_for_week(&self, week: &Week) -> RepositoryResult<Vec<ActualSales>> {
        let (start, end) = week.sales_window();
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, channel, SUM(units)
            FROM sales_ledger
            WHERE status = ?1
              AND units > 0
              AND TRIM(sku) <> ''
              AND TRIM(channel) <> ''
              AND date(sale_date) BETWEEN ?2 AND ?3
            GROUP BY sku, channel
            "#,
        )?;

        let rows = stmt
            .query_map(params![SALES_STATUS_ORDER, date_str(start), date_str(end)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(sku, channel, units)| ActualSales {
                sku,
                channel,
                week_index: week.index,
                units: non_negative(units.unwrap_or(0.0)),
            })
            .collect())
    }

    /// SKU 描述
    pub fn find_descriptions(&self) -> RepositoryResult<BTreeMap<String, Option<String>>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT sku, description FROM sku_catalog")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }
}
