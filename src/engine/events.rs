// ==========================================
// 机加工车间排产系统 - 排产事件发布
// ==========================================
// 职责: 排产/对账过程中的告警与重排请求对外广播
// 红线: 事件发布失败只记日志，不得中断排产主流程
// ==========================================

use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 告警码常量
// ==========================================
// 告警事件的机读 code 字段取值，排产与对账共用一套
pub mod warning_codes {
    /// 工序号断号（前道记录缺失）
    pub const SEQUENCE_GAP: &str = "SEQUENCE_GAP";
    /// 工序状态与机台占用台账不一致
    pub const STATUS_DESYNC: &str = "STATUS_DESYNC";
    /// 候选工序在等前道完成
    pub const CANDIDATE_WAITING: &str = "CANDIDATE_WAITING";
    /// 未识别的工序类型（不参与兼容匹配）
    pub const UNKNOWN_OPERATION_KIND: &str = "UNKNOWN_OPERATION_KIND";
    /// 没有任何机台能加工该工序
    pub const NO_COMPATIBLE_MACHINE: &str = "NO_COMPATIBLE_MACHINE";
    /// 兼容机台全部被占用
    pub const ALL_MACHINES_OCCUPIED: &str = "ALL_MACHINES_OCCUPIED";
    /// 时间表推进达到上限仍找不到空档
    pub const NO_AVAILABLE_SLOT: &str = "NO_AVAILABLE_SLOT";
    /// 累计报工超出目标件数
    pub const OVER_TARGET: &str = "OVER_TARGET";
    /// 实际机台与计划机台不一致（重排原因前缀同名）
    pub const MACHINE_CHANGED: &str = "MACHINE_CHANGED";
}

// ==========================================
// 事件类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEventKind {
    /// 排产告警（数据完整性、无可用资源等）
    Warning,
    /// 计划与实际偏离，请求重排
    RescheduleRequested,
}

impl ScheduleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleEventKind::Warning => "WARNING",
            ScheduleEventKind::RescheduleRequested => "RESCHEDULE_REQUESTED",
        }
    }
}

// ==========================================
// 事件载荷
// ==========================================
#[derive(Debug, Clone)]
pub struct ScheduleEvent {
    pub kind: ScheduleEventKind,
    /// 机读告警码（如 SEQUENCE_GAP / NO_AVAILABLE_SLOT）
    pub code: String,
    pub order_id: Option<String>,
    pub operation_id: Option<String>,
    pub machine_code: Option<String>,
    /// 人读描述
    pub message: String,
}

impl ScheduleEvent {
    pub fn warning(
        code: &str,
        order_id: Option<&str>,
        operation_id: Option<&str>,
        machine_code: Option<&str>,
        message: String,
    ) -> Self {
        Self {
            kind: ScheduleEventKind::Warning,
            code: code.to_string(),
            order_id: order_id.map(|s| s.to_string()),
            operation_id: operation_id.map(|s| s.to_string()),
            machine_code: machine_code.map(|s| s.to_string()),
            message,
        }
    }

    pub fn reschedule(operation_id: &str, machine_code: Option<&str>, message: String) -> Self {
        Self {
            kind: ScheduleEventKind::RescheduleRequested,
            code: "RESCHEDULE_REQUESTED".to_string(),
            order_id: None,
            operation_id: Some(operation_id.to_string()),
            machine_code: machine_code.map(|s| s.to_string()),
            message,
        }
    }
}

// ==========================================
// 事件出口接口
// ==========================================
pub trait ScheduleEventSink: Send + Sync {
    fn emit(&self, event: ScheduleEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

// ==========================================
// NoOpEventSink - 静默出口
// ==========================================
/// 丢弃所有事件（未接入外部系统时使用）
pub struct NoOpEventSink;

impl ScheduleEventSink for NoOpEventSink {
    fn emit(&self, _event: ScheduleEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

// ==========================================
// MemoryEventSink - 内存出口
// ==========================================
/// 把事件收进内存队列，由调用方取走（测试与演示场景使用）
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<ScheduleEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取走当前积压的全部事件
    pub fn take(&self) -> Vec<ScheduleEvent> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => Vec::new(),
        }
    }

    /// 当前积压的事件数量
    pub fn len(&self) -> usize {
        self.events.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScheduleEventSink for MemoryEventSink {
    fn emit(&self, event: ScheduleEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| format!("事件队列锁获取失败: {}", e))?;
        guard.push(event);
        Ok(())
    }
}

// ==========================================
// OptionalEventSink - 可选出口包装
// ==========================================
/// 包一层可选的事件出口，未配置时静默丢弃；
/// 出口报错只记日志，排产流程继续。
#[derive(Clone)]
pub struct OptionalEventSink {
    inner: Option<Arc<dyn ScheduleEventSink>>,
}

impl OptionalEventSink {
    pub fn with_sink(sink: Arc<dyn ScheduleEventSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    pub fn emit(&self, event: ScheduleEvent) {
        if let Some(sink) = &self.inner {
            let kind = event.kind.as_str();
            let code = event.code.clone();
            if let Err(e) = sink.emit(event) {
                tracing::warn!(kind = kind, code = %code, error = %e, "事件发布失败，流程继续");
            }
        }
    }

    pub fn emit_warning(
        &self,
        code: &str,
        order_id: Option<&str>,
        operation_id: Option<&str>,
        machine_code: Option<&str>,
        message: String,
    ) {
        self.emit(ScheduleEvent::warning(
            code,
            order_id,
            operation_id,
            machine_code,
            message,
        ));
    }

    pub fn emit_reschedule(&self, operation_id: &str, machine_code: Option<&str>, message: String) {
        self.emit(ScheduleEvent::reschedule(operation_id, machine_code, message));
    }
}

impl Default for OptionalEventSink {
    fn default() -> Self {
        Self::none()
    }
}
