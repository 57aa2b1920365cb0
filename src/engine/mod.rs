// ==========================================
// 机加工车间排产系统 - 引擎层
// ==========================================
// 职责: 实现排产与对账的业务规则
// 红线: 引擎不拼 SQL, 数据读写全部走仓储层;
//       跳过某个订单/工序时必须给出告警码与原因
// ==========================================

pub mod calendar;
pub mod candidate;
pub mod compatibility;
pub mod error;
pub mod events;
pub mod repositories;
pub mod scheduler;
pub mod slot_allocator;
pub mod synchronizer;

// 重导出核心引擎
pub use calendar::WorkCalendar;
pub use candidate::{CandidateOutcome, CandidateSelector, SelectionResult, SelectionWarning};
pub use compatibility::CompatibilityResolver;
pub use error::{ScheduleError, ScheduleResult};
pub use events::{
    warning_codes, MemoryEventSink, NoOpEventSink, OptionalEventSink, ScheduleEvent,
    ScheduleEventKind, ScheduleEventSink,
};
pub use repositories::ScheduleRepositories;
pub use scheduler::{
    AvailabilityCheck, PlanningOrchestrator, PlanningRun, PlanningWarning,
};
pub use slot_allocator::{
    BookedSlot, MachineTimetable, SlotAllocator, SlotPlacement, MAX_DAILY_STARTS_PER_MACHINE,
    MAX_PLACEMENT_ITERATIONS,
};
pub use synchronizer::{BulkResyncReport, SyncEngine, SyncProgress, SyncStatus};
