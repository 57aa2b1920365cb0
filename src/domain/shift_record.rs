// ==========================================
// 机加工车间排产系统 - 班次实绩实体
// ==========================================
// 说明: 每行实绩只归属一个班次；同一工序的进度由
// 全部未归档实绩（白班+夜班）求和得出。
// 实绩超出订单目标数量时只做标记告警，不拒绝录入。
// ==========================================

use crate::domain::types::ShiftKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 班次生产实绩
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftProductionRecord {
    pub record_id: String,             // 实绩ID (UUID)
    pub operation_id: String,          // 工序ID
    pub machine_code: String,          // 实际使用的设备代码
    pub record_date: NaiveDate,        // 生产日期
    pub shift: ShiftKind,              // 班次
    pub operator: Option<String>,      // 操作工姓名
    pub quantity: i64,                 // 完成数量 (件)
    pub minutes_per_unit: Option<f64>, // 实际单件工时 (分钟/件)
    pub setup_minutes: i64,            // 换装准备工时 (分钟)
    pub archived: bool,                // 归档标志 (归档后不计入进度)
    pub created_at: NaiveDateTime,     // 创建时间
}

impl ShiftProductionRecord {
    /// 创建分配落位时的零数量白班占位实绩
    ///
    /// 占位行为后续实绩录入提供更新目标，数量为 0 不影响进度。
    pub fn placeholder(
        operation_id: String,
        machine_code: String,
        record_date: NaiveDate,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            operation_id,
            machine_code,
            record_date,
            shift: ShiftKind::Day,
            operator: None,
            quantity: 0,
            minutes_per_unit: None,
            setup_minutes: 0,
            archived: false,
            created_at,
        }
    }
}
