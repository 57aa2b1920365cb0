// ==========================================
// 机加工车间排产系统 - 订单与工序实体
// ==========================================
// 说明: 订单与工序由上游录入系统创建（不在本库职责内）；
// 本库只负责读取、排产和状态推进。
// 红线: 工序状态只允许排产引擎与同步引擎修改。
// ==========================================

use crate::domain::types::{OperationKind, OperationStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// 订单 (Order)
// ==========================================

/// 生产订单
///
/// 图号（drawing_number）在全部订单中唯一，是与图纸档案对接的业务主键。
/// 优先级数值越小越紧急（1 = 最紧急）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 订单ID (UUID)
    pub order_id: String,
    /// 图号（业务唯一键）
    pub drawing_number: String,
    /// 订单数量（件）
    pub quantity: i64,
    /// 交货期限
    pub deadline: NaiveDate,
    /// 优先级（越小越紧急）
    pub priority: i64,
    /// 业务类别标签（如 批产/试制）
    pub work_type: Option<String>,
    /// 创建时间
    pub created_at: NaiveDateTime,
    /// 更新时间
    pub updated_at: NaiveDateTime,
}

// ==========================================
// 工序 (Operation)
// ==========================================

/// 订单下的单道工序
///
/// seq_no 为 1 起的工艺顺序号，同一订单内唯一；
/// 第 N 道工序（N>1）只有在第 N-1 道完成后才可排产。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// 工序ID (UUID)
    pub operation_id: String,
    /// 所属订单ID
    pub order_id: String,
    /// 工艺顺序号（1 起）
    pub seq_no: i64,
    /// 工序类型
    pub kind: OperationKind,
    /// 需求轴数（铣削工序使用；None 表示不限）
    pub required_axes: Option<i64>,
    /// 预计总工时（分钟；0 表示未录入，需按单件工时推算）
    pub estimated_minutes: i64,
    /// 单件工时（分钟/件）
    pub minutes_per_unit: Option<f64>,
    /// 工序状态
    pub status: OperationStatus,
    /// 已分配设备代码
    pub assigned_machine_code: Option<String>,
    /// 分配时间
    pub assigned_at: Option<NaiveDateTime>,
    /// 已完成数量（由班次实绩汇总写回）
    pub completed_quantity: i64,
    /// 创建时间
    pub created_at: NaiveDateTime,
    /// 更新时间
    pub updated_at: NaiveDateTime,
}

impl Operation {
    /// 计算排产用的有效工时（分钟）
    ///
    /// # 规则
    /// - 已录入预计总工时（>0）时直接采用，不附加任何系数
    /// - 未录入时按 数量×单件工时+换装准备 推算，并上浮缓冲比例
    ///
    /// # 参数
    /// - order_quantity: 订单数量
    /// - setup_minutes: 换装准备工时（分钟）
    /// - buffer_percent: 推算值上浮比例（如 10.0 表示 +10%）
    pub fn effective_minutes(
        &self,
        order_quantity: i64,
        setup_minutes: i64,
        buffer_percent: f64,
    ) -> i64 {
        if self.estimated_minutes > 0 {
            return self.estimated_minutes;
        }

        let per_unit = self.minutes_per_unit.unwrap_or(0.0);
        if per_unit <= 0.0 || order_quantity <= 0 {
            return 0;
        }

        let base = order_quantity as f64 * per_unit + setup_minutes as f64;
        let buffered = base * (1.0 + buffer_percent / 100.0);
        // 先消掉浮点乘法的尾差再进位，避免 99.000000000000014 被抬成 100
        let adjusted = (buffered * 1e6).round() / 1e6;
        adjusted.ceil() as i64
    }
}
