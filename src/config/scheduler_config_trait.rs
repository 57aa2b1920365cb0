// ==========================================
// 机加工车间排产系统 - 排产配置读取接口
// ==========================================
// 职责: 定义排产与对账引擎所需的配置读取接口
// 实现: ConfigManager (生产), 测试中可用内存桩实现
// ==========================================

use crate::domain::types::{PlanningStrictness, SequenceGapPolicy};
use async_trait::async_trait;
use std::error::Error;

/// 排产配置读取接口
///
/// 引擎通过该接口取配置，不直接依赖存储；
/// 所有方法在配置缺失时返回默认值而不是报错。
#[async_trait]
pub trait SchedulerConfigReader: Send + Sync {
    /// 获取参与排产的优先级截止秩
    ///
    /// # 返回
    /// - i64: 优先级数值不超过该值的订单才进入排产
    ///
    /// # 默认值
    /// - 3
    async fn get_max_priority_rank(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取订单数量缺失时的目标件数
    ///
    /// # 返回
    /// - i64: 进度对账时订单数量非正的兜底目标
    ///
    /// # 默认值
    /// - 30
    async fn get_default_target_quantity(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取换装准备工时（分钟）
    ///
    /// # 返回
    /// - i64: 工时推算公式中的固定准备时间
    ///
    /// # 默认值
    /// - 60
    async fn get_setup_minutes(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取推算工时的上浮缓冲比例
    ///
    /// # 返回
    /// - f64: 百分比数值，10.0 表示上浮 10%
    ///
    /// # 默认值
    /// - 10.0
    async fn get_buffer_percent(&self) -> Result<f64, Box<dyn Error>>;

    /// 获取排产严格度档位
    ///
    /// # 返回
    /// - PlanningStrictness: SHALLOW 只出分配，AUDIT 另附审计报告
    ///
    /// # 默认值
    /// - AUDIT
    async fn get_planning_strictness(&self) -> Result<PlanningStrictness, Box<dyn Error>>;

    /// 获取工序断号策略
    ///
    /// # 返回
    /// - SequenceGapPolicy: 断号时视为已满足或要求连续
    ///
    /// # 默认值
    /// - REQUIRE_CONTIGUOUS
    async fn get_sequence_gap_policy(&self) -> Result<SequenceGapPolicy, Box<dyn Error>>;
}
