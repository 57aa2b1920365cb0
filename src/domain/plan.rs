// ==========================================
// 机加工车间排产系统 - 排产结果快照
// ==========================================
// 依据: 排产快照只增不改的追溯要求
// 红线: 快照的分配清单/时间窗/设备选择落库后不可变更，
// 条目上的 PLANNED→RESCHEDULED 标记是唯一允许的后续写入。
// ==========================================

use crate::domain::types::{PlanEntryStatus, ShiftKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单日班制下的理论工作日折算基数（分钟/日）
pub const WORKDAY_MINUTES: i64 = 480;

// ==========================================
// TimeWindow - 时间窗
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime, // 计划开始
    pub end: NaiveDateTime,   // 计划结束 (区间为 [start, end))
    pub shift: ShiftKind,     // 班次通道 (按开始时刻归属)
}

// ==========================================
// PlanEntry - 排产结果条目
// ==========================================
// 一次排产运行中的单条 (工序, 设备, 时间窗) 分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub entry_id: String,                  // 条目ID (UUID)
    pub result_id: String,                 // 所属快照ID
    pub position: i64,                     // 队列位置 (1 起)
    pub order_id: String,                  // 订单ID
    pub operation_id: String,              // 工序ID
    pub machine_code: String,              // 设备代码
    pub window: TimeWindow,                // 计划时间窗
    pub status: PlanEntryStatus,           // 条目状态
    pub reschedule_reason: Option<String>, // 重排原因 (标记 RESCHEDULED 时写入)
}

impl PlanEntry {
    /// 创建新的计划条目（初始为 PLANNED）
    pub fn new(
        result_id: String,
        position: i64,
        order_id: String,
        operation_id: String,
        machine_code: String,
        window: TimeWindow,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            result_id,
            position,
            order_id,
            operation_id,
            machine_code,
            window,
            status: PlanEntryStatus::Planned,
            reschedule_reason: None,
        }
    }
}

// ==========================================
// PlanningResult - 排产结果快照
// ==========================================

/// 一次排产运行的不可变快照
///
/// total_minutes 是入选工序有效工时的直接求和（吞吐量口径），
/// 不扣除日历间隙，不等于日历意义上的完工时刻。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningResult {
    pub result_id: String,              // 快照ID (UUID)
    pub calculated_at: NaiveDateTime,   // 计算时间
    pub selected_order_ids: Vec<String>, // 入选订单ID列表
    pub entries: Vec<PlanEntry>,        // 分配条目 (按队列位置排序)
    pub total_minutes: i64,             // 工时合计 (分钟)
    pub required_workdays: i64,         // 折算所需工作日 (向上取整)
}

impl PlanningResult {
    /// 创建空快照（分配条目随排产过程追加）
    pub fn new(calculated_at: NaiveDateTime) -> Self {
        Self {
            result_id: Uuid::new_v4().to_string(),
            calculated_at,
            selected_order_ids: Vec::new(),
            entries: Vec::new(),
            total_minutes: 0,
            required_workdays: 0,
        }
    }

    /// 追加一条分配并累计工时
    pub fn push_entry(&mut self, entry: PlanEntry, effective_minutes: i64) {
        if !self.selected_order_ids.contains(&entry.order_id) {
            self.selected_order_ids.push(entry.order_id.clone());
        }
        self.entries.push(entry);
        self.total_minutes += effective_minutes;
        self.required_workdays = (self.total_minutes + WORKDAY_MINUTES - 1) / WORKDAY_MINUTES;
    }
}
