// ==========================================
// 机加工车间排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod machine;
pub mod order;
pub mod plan;
pub mod shift_record;
pub mod types;

// 重导出核心类型
pub use machine::Machine;
pub use order::{Operation, Order};
pub use plan::{PlanEntry, PlanningResult, TimeWindow, WORKDAY_MINUTES};
pub use shift_record::ShiftProductionRecord;
pub use types::{
    MachineKind, OperationKind, OperationStatus, PlanEntryStatus, PlanningStrictness,
    SequenceGapPolicy, ShiftKind,
};
