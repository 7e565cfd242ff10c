// ==========================================
// 库存分配系统 - CSV 导出
// ==========================================
// 职责: 将分配明细与周汇总写为 CSV,供下游展示/导出
// ==========================================

use crate::domain::allocation::WeeklyAllocation;
use crate::domain::summary::WeeklySummary;
use csv::Writer;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 写出分配明细
///
/// # 返回
/// 写出的行数（不含表头）
pub fn write_allocations_csv<'a, W, I>(writer: W, rows: I) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a WeeklyAllocation>,
{
    write_records(writer, rows)
}

/// 写出周汇总
pub fn write_weekly_summary_csv<'a, W, I>(writer: W, rows: I) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a WeeklySummary>,
{
    write_records(writer, rows)
}

fn write_records<'a, W, T, I>(writer: W, rows: I) -> Result<usize, ExportError>
where
    W: Write,
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut wtr = Writer::from_writer(writer);
    let mut count = 0;
    for row in rows {
        wtr.serialize(row)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}
