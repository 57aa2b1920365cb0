// ==========================================
// 机加工车间排产系统 - 领域类型定义
// ==========================================
// 依据: 车间工艺约定 (车/铣/钻/磨 四类工序, 车床/铣床 两类设备)
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工序类型 (Operation Kind)
// ==========================================
// 说明: 数据来自上游录入，可能出现未知类型。
// 未知类型必须保留原始值并参与告警，不允许静默丢弃整行。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    Turning,         // 车削
    Milling,         // 铣削
    Drilling,        // 钻孔
    Grinding,        // 磨削
    Unknown(String), // 未识别类型（保留原始值）
}

impl OperationKind {
    /// 从数据库字符串解析（未识别的值归入 Unknown，不报错）
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "TURNING" => OperationKind::Turning,
            "MILLING" => OperationKind::Milling,
            "DRILLING" => OperationKind::Drilling,
            "GRINDING" => OperationKind::Grinding,
            other => OperationKind::Unknown(other.to_string()),
        }
    }

    /// 转换为数据库存储的字符串
    pub fn as_db_str(&self) -> &str {
        match self {
            OperationKind::Turning => "TURNING",
            OperationKind::Milling => "MILLING",
            OperationKind::Drilling => "DRILLING",
            OperationKind::Grinding => "GRINDING",
            OperationKind::Unknown(raw) => raw,
        }
    }

    /// 是否为已识别的工序类型
    pub fn is_known(&self) -> bool {
        !matches!(self, OperationKind::Unknown(_))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl From<String> for OperationKind {
    fn from(s: String) -> Self {
        OperationKind::from_db_str(&s)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_db_str().to_string()
    }
}

// ==========================================
// 工序状态 (Operation Status)
// ==========================================
// 状态机: PENDING → ASSIGNED → IN_PROGRESS → COMPLETED
//         ASSIGNED/IN_PROGRESS →(撤销分配)→ PENDING
//         任意状态 →(人工)→ ON_HOLD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,    // 待排产
    Assigned,   // 已分配设备
    InProgress, // 加工中
    Completed,  // 已完成（终态）
    OnHold,     // 人工挂起
}

impl OperationStatus {
    /// 从字符串解析状态（未识别返回 None，由仓储层转为字段错误）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(OperationStatus::Pending),
            "ASSIGNED" => Some(OperationStatus::Assigned),
            "IN_PROGRESS" => Some(OperationStatus::InProgress),
            "COMPLETED" => Some(OperationStatus::Completed),
            "ON_HOLD" => Some(OperationStatus::OnHold),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::Assigned => "ASSIGNED",
            OperationStatus::InProgress => "IN_PROGRESS",
            OperationStatus::Completed => "COMPLETED",
            OperationStatus::OnHold => "ON_HOLD",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 设备类型 (Machine Kind)
// ==========================================
// 车间只有两类物理设备；设备主数据由人工维护，
// 未识别的设备类型视为数据错误（与工序类型不同）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineKind {
    Milling, // 铣床
    Turning, // 车床
}

impl MachineKind {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MILLING" => Some(MachineKind::Milling),
            "TURNING" => Some(MachineKind::Turning),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MachineKind::Milling => "MILLING",
            MachineKind::Turning => "TURNING",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 班次 (Shift Kind)
// ==========================================
// 白班 08:00-16:00, 夜班 16:00-次日08:00
// 同一设备上白班与夜班是两条互不干扰的预约通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftKind {
    Day,   // 白班
    Night, // 夜班
}

impl ShiftKind {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAY" => Some(ShiftKind::Day),
            "NIGHT" => Some(ShiftKind::Night),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShiftKind::Day => "DAY",
            ShiftKind::Night => "NIGHT",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 排产结果条目状态 (Plan Entry Status)
// ==========================================
// 快照本身不可变；条目状态是唯一允许的标记:
// PLANNED →(实绩偏离)→ RESCHEDULED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanEntryStatus {
    Planned,     // 按计划
    Rescheduled, // 已标记重排（附原因）
}

impl PlanEntryStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Some(PlanEntryStatus::Planned),
            "RESCHEDULED" => Some(PlanEntryStatus::Rescheduled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanEntryStatus::Planned => "PLANNED",
            PlanEntryStatus::Rescheduled => "RESCHEDULED",
        }
    }
}

impl fmt::Display for PlanEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 排产严格度 (Planning Strictness)
// ==========================================
// 两档共用同一条分配算法，分配结果必须一致；
// AUDIT 档额外输出逐工序可用性审计报告。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningStrictness {
    Shallow, // 浅层首次匹配（不产出审计报告）
    Audit,   // 完整可用性审计
}

impl PlanningStrictness {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SHALLOW" => Some(PlanningStrictness::Shallow),
            "AUDIT" => Some(PlanningStrictness::Audit),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanningStrictness::Shallow => "SHALLOW",
            PlanningStrictness::Audit => "AUDIT",
        }
    }
}

impl fmt::Display for PlanningStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 工序断号策略 (Sequence Gap Policy)
// ==========================================
// 前道工序记录缺失（断号）时的处理方式。
// 两种策略都会发出 SEQUENCE_GAP 数据完整性告警。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceGapPolicy {
    TreatSatisfied,    // 宽松: 视为前道已满足（历史行为）
    RequireContiguous, // 严格: 断号即不可排，需人工修数
}

impl SequenceGapPolicy {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TREAT_SATISFIED" => Some(SequenceGapPolicy::TreatSatisfied),
            "REQUIRE_CONTIGUOUS" => Some(SequenceGapPolicy::RequireContiguous),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SequenceGapPolicy::TreatSatisfied => "TREAT_SATISFIED",
            SequenceGapPolicy::RequireContiguous => "REQUIRE_CONTIGUOUS",
        }
    }
}

impl fmt::Display for SequenceGapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
