// ==========================================
// 机加工车间排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 排产与实绩同步引擎 (作为库被上层调用)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    MachineKind, OperationKind, OperationStatus, PlanEntryStatus, PlanningStrictness,
    SequenceGapPolicy, ShiftKind,
};

// 领域实体
pub use domain::{
    Machine, Operation, Order, PlanEntry, PlanningResult, ShiftProductionRecord, TimeWindow,
};

// 引擎
pub use engine::{
    CandidateSelector, CompatibilityResolver, PlanningOrchestrator, ScheduleError,
    ScheduleRepositories, SlotAllocator, SyncEngine, WorkCalendar,
};

// 配置
pub use config::{ConfigManager, SchedulerConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "机加工车间排产系统";

// ==========================================
// 预编译检查
// ==========================================
