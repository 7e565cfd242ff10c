// 库存分配系统 - 命令行入口
//
// Usage:
//   inventory-distribution <month_key> [--db PATH] [--today YYYY-MM-DD] [--out PATH] [--summary PATH]
//
// 计算指定月份的周度渠道分配,明细写 CSV（缺省写到标准输出）,告警打到日志。

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use inventory_distribution::api::AllocationApi;
use inventory_distribution::config::ConfigManager;
use inventory_distribution::db::{ensure_schema, open_sqlite_connection};
use inventory_distribution::logging;
use inventory_distribution::repository::AllocationInputRepository;
use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::{Arc, Mutex};
use tracing::info;

/// DB 路径环境变量
const DB_PATH_ENV: &str = "INVENTORY_DISTRIBUTION_DB_PATH";

struct CliArgs {
    month_key: String,
    db_path: String,
    today: NaiveDate,
    out: Option<String>,
    summary: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(
        app = inventory_distribution::APP_NAME,
        version = inventory_distribution::VERSION,
        month_key = %args.month_key,
        db_path = %args.db_path,
        today = %args.today,
        "启动分配计算"
    );

    let conn = open_sqlite_connection(&args.db_path)
        .with_context(|| format!("打开数据库失败: {}", args.db_path))?;
    ensure_schema(&conn).context("初始化数据库结构失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = Arc::new(ConfigManager::from_connection(conn.clone())?);
    let input_repo = Arc::new(AllocationInputRepository::from_connection(conn));
    let api = AllocationApi::new(config, input_repo);

    let report = api.compute_month(&args.month_key, args.today).await?;

    let written = match &args.out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("创建输出文件失败: {}", path))?;
            api.export_allocations(&report, BufWriter::new(file))?
        }
        None => api.export_allocations(&report, io::stdout().lock())?,
    };

    if let Some(path) = &args.summary {
        let file = File::create(path).with_context(|| format!("创建汇总文件失败: {}", path))?;
        api.export_weekly_summary(&report, BufWriter::new(file))?;
    }

    info!(
        rows = written,
        skus = report.plans.len(),
        warnings = report.warnings.len(),
        "分配结果已导出"
    );
    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut month_key = None;
    let mut db_path = None;
    let mut today = None;
    let mut out = None;
    let mut summary = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => db_path = Some(next_value(&mut iter, "--db")?),
            "--today" => {
                let raw = next_value(&mut iter, "--today")?;
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .with_context(|| format!("--today 日期格式错误: {}", raw))?;
                today = Some(date);
            }
            "--out" => out = Some(next_value(&mut iter, "--out")?),
            "--summary" => summary = Some(next_value(&mut iter, "--summary")?),
            flag if flag.starts_with("--") => bail!("未知参数: {}", flag),
            _ if month_key.is_none() => month_key = Some(arg),
            _ => bail!("多余的参数: {}", arg),
        }
    }

    let month_key = month_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("缺少月份标识 (用法: inventory-distribution <month_key> [--db PATH] [--today YYYY-MM-DD] [--out PATH] [--summary PATH])"))?;

    Ok(CliArgs {
        month_key,
        db_path: db_path.unwrap_or_else(get_default_db_path),
        today: today.unwrap_or_else(|| Local::now().date_naive()),
        out,
        summary,
    })
}

fn next_value<I: Iterator<Item = String>>(iter: &mut I, flag: &str) -> Result<String> {
    iter.next().ok_or_else(|| anyhow!("参数 {} 缺少取值", flag))
}

/// 默认数据库路径
///
/// 优先读取环境变量,否则放在用户数据目录下
fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./inventory_distribution.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("inventory-distribution");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("inventory_distribution.db");
        }
    }
    path.to_string_lossy().to_string()
}
