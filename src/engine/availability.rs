// ==========================================
// 库存分配系统 - 实物可用量解析器
// ==========================================
// 职责: (期初库存, 到货, 预留) -> 本周可用实物库存
// 规则:
// 1) 已盘点周: 期初 + 到货 - 预留
// 2) 未盘点周/无快照: 以上周结转库存替代期初
// 3) 结果恒 >= 0 且为有限值
// ==========================================

use crate::domain::inventory::PhysicalSnapshot;
use crate::domain::types::non_negative;

/// 单周解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAvailability {
    pub initial_stock_units: f64, // 实际采用的期初库存
    pub arrivals_units: f64,
    pub reserved_units: f64,
    pub physical_units: f64,      // 可用实物库存
    pub measured: bool,           // 是否采用盘点值
}

// ==========================================
// PhysicalAvailabilityResolver
// ==========================================
pub struct PhysicalAvailabilityResolver {
    // 无状态
}

impl PhysicalAvailabilityResolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 解析本周实物可用量
    ///
    /// # 参数
    /// - `snapshot`: 本周快照 (可能缺失)
    /// - `carried_forward`: 上周结转库存
    pub fn resolve(
        &self,
        snapshot: Option<&PhysicalSnapshot>,
        carried_forward: f64,
    ) -> ResolvedAvailability {
        let carried_forward = non_negative(carried_forward);

        let (initial, arrivals, reserved, measured) = match snapshot {
            Some(s) => match s.initial_stock_units {
                Some(initial) => (
                    non_negative(initial),
                    non_negative(s.arrivals_units),
                    non_negative(s.reserved_units),
                    true,
                ),
                None => (
                    carried_forward,
                    non_negative(s.arrivals_units),
                    non_negative(s.reserved_units),
                    false,
                ),
            },
            None => (carried_forward, 0.0, 0.0, false),
        };

        ResolvedAvailability {
            initial_stock_units: initial,
            arrivals_units: arrivals,
            reserved_units: reserved,
            physical_units: non_negative(initial + arrivals - reserved),
            measured,
        }
    }
}

impl Default for PhysicalAvailabilityResolver {
    fn default() -> Self {
        Self::new()
    }
}
