// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use machine_shop_aps::config::SchedulerConfigReader;
use machine_shop_aps::domain::types::{PlanningStrictness, SequenceGapPolicy};
use std::error::Error;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub max_priority_rank: i64,
    pub default_target_quantity: i64,
    pub setup_minutes: i64,
    pub buffer_percent: f64,
    pub strictness: PlanningStrictness,
    pub gap_policy: SequenceGapPolicy,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            max_priority_rank: 3,
            default_target_quantity: 30,
            setup_minutes: 60,
            buffer_percent: 10.0,
            strictness: PlanningStrictness::Audit,
            gap_policy: SequenceGapPolicy::RequireContiguous,
        }
    }
}

impl MockConfig {
    /// 浅层档位（不出审计报告）
    pub fn shallow() -> Self {
        Self {
            strictness: PlanningStrictness::Shallow,
            ..Default::default()
        }
    }

    /// 宽松断号策略（断号视为前道已满足）
    pub fn lenient_gap() -> Self {
        Self {
            gap_policy: SequenceGapPolicy::TreatSatisfied,
            ..Default::default()
        }
    }

    /// 自定义优先级截止秩
    pub fn with_max_rank(rank: i64) -> Self {
        Self {
            max_priority_rank: rank,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SchedulerConfigReader for MockConfig {
    async fn get_max_priority_rank(&self) -> Result<i64, Box<dyn Error>> {
        Ok(self.max_priority_rank)
    }

    async fn get_default_target_quantity(&self) -> Result<i64, Box<dyn Error>> {
        Ok(self.default_target_quantity)
    }

    async fn get_setup_minutes(&self) -> Result<i64, Box<dyn Error>> {
        Ok(self.setup_minutes)
    }

    async fn get_buffer_percent(&self) -> Result<f64, Box<dyn Error>> {
        Ok(self.buffer_percent)
    }

    async fn get_planning_strictness(&self) -> Result<PlanningStrictness, Box<dyn Error>> {
        Ok(self.strictness)
    }

    async fn get_sequence_gap_policy(&self) -> Result<SequenceGapPolicy, Box<dyn Error>> {
        Ok(self.gap_policy)
    }
}
