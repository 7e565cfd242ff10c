// ==========================================
// 库存分配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发读写时的偶发 busy 错误
// - 提供分配输入表与配置表的建表语句
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 表说明：
/// - config_scope / config_kv: 配置存储
/// - monthly_channel_quota: 渠道月度配额 (同 SKU+渠道 取最近一条有效记录)
/// - inventory_snapshot: 库存盘点 (可用 + 在途)
/// - weekly_supply: 周到货与 B2B 预留
/// - sales_ledger: 销售流水 (已折算为主 SKU 件数)
/// - sku_catalog: SKU 描述
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS monthly_channel_quota (
            month_key TEXT NOT NULL,
            sku TEXT NOT NULL,
            channel TEXT NOT NULL,
            quota_units REAL NOT NULL,
            modified_at TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_quota_month_sku
            ON monthly_channel_quota(month_key, sku, channel);

        CREATE TABLE IF NOT EXISTS inventory_snapshot (
            sku TEXT NOT NULL,
            snapshot_date TEXT NOT NULL,
            free_units REAL NOT NULL DEFAULT 0,
            transit_units REAL NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_inventory_snapshot_date
            ON inventory_snapshot(snapshot_date, sku);

        CREATE TABLE IF NOT EXISTS weekly_supply (
            sku TEXT NOT NULL,
            week_start TEXT NOT NULL,
            expected_arrivals REAL NOT NULL DEFAULT 0,
            reserved_forecast REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (sku, week_start)
        );

        CREATE TABLE IF NOT EXISTS sales_ledger (
            sale_date TEXT NOT NULL,
            sku TEXT NOT NULL,
            channel TEXT NOT NULL,
            units REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'ORDER'
        );
        CREATE INDEX IF NOT EXISTS idx_sales_ledger_date
            ON sales_ledger(sale_date, sku, channel);

        CREATE TABLE IF NOT EXISTS sku_catalog (
            sku TEXT PRIMARY KEY,
            description TEXT
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
