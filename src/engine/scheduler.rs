// ==========================================
// 机加工车间排产系统 - 排产编排器
// ==========================================
// 职责: 执行一次完整排产 (读配置 -> 截取订单 -> 候选选择
//       -> 机台匹配 -> 时间窗试排 -> 快照落库)
// 红线: 排产只产出计划快照，不改机台占用、不改工序状态;
//       同样的台账输入必须给出同样的队列
// ==========================================

use crate::config::SchedulerConfigReader;
use crate::domain::machine::Machine;
use crate::domain::plan::{PlanEntry, PlanningResult, TimeWindow};
use crate::domain::types::PlanningStrictness;
use crate::engine::calendar::WorkCalendar;
use crate::engine::candidate::{CandidateOutcome, CandidateSelector};
use crate::engine::compatibility::CompatibilityResolver;
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::events::{warning_codes, OptionalEventSink, ScheduleEventSink};
use crate::engine::repositories::ScheduleRepositories;
use crate::engine::slot_allocator::{MachineTimetable, SlotAllocator};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// 排产运行输出
// ==========================================

/// 排产过程中记录的业务告警
///
/// 告警不中断排产：被跳过的订单留在待排池，下轮重试。
#[derive(Debug, Clone)]
pub struct PlanningWarning {
    pub code: &'static str,
    pub order_id: Option<String>,
    pub operation_id: Option<String>,
    pub machine_code: Option<String>,
    pub message: String,
}

/// 审计报告行: 单个订单本轮的可排性结论
#[derive(Debug, Clone)]
pub struct AvailabilityCheck {
    pub order_id: String,
    /// 本轮考察的工序（整单无候选时为空）
    pub operation_id: Option<String>,
    pub seq_no: Option<i64>,
    /// 是否入队
    pub schedulable: bool,
    /// 工种兼容的机台数
    pub compatible_count: usize,
    /// 兼容机台中当前空闲的台数
    pub available_count: usize,
    pub reason: String,
}

/// 一次排产运行的完整输出（快照已落库）
#[derive(Debug)]
pub struct PlanningRun {
    pub result: PlanningResult,
    pub strictness: PlanningStrictness,
    pub warnings: Vec<PlanningWarning>,
    /// AUDIT 档位下逐订单的可排性报告 (SHALLOW 档为空)
    pub availability_report: Vec<AvailabilityCheck>,
}

// ==========================================
// PlanningOrchestrator - 排产编排器
// ==========================================

pub struct PlanningOrchestrator<C>
where
    C: SchedulerConfigReader,
{
    repos: ScheduleRepositories,
    config: Arc<C>,
    resolver: CompatibilityResolver,
    allocator: SlotAllocator,
    events: OptionalEventSink,
}

impl<C> PlanningOrchestrator<C>
where
    C: SchedulerConfigReader,
{
    /// 创建编排器（默认日历: 周五+周六停工）
    ///
    /// # 参数
    /// - repos: 仓储集合
    /// - config: 配置读取器
    pub fn new(repos: ScheduleRepositories, config: Arc<C>) -> Self {
        Self {
            repos,
            config,
            resolver: CompatibilityResolver::new(),
            allocator: SlotAllocator::new(WorkCalendar::default()),
            events: OptionalEventSink::none(),
        }
    }

    /// 替换工作日历（停工日安排与默认不同的车间用）
    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.allocator = SlotAllocator::new(calendar);
        self
    }

    /// 挂接事件发布器，排产告警会同步对外发布
    pub fn with_event_sink(mut self, sink: Arc<dyn ScheduleEventSink>) -> Self {
        self.events = OptionalEventSink::with_sink(sink);
        self
    }

    /// 执行一次完整排产
    ///
    /// # 参数
    /// - reference_time: 排产基准时刻，所有时间窗都安排在该时刻之后
    ///
    /// # 返回
    /// 排产运行输出；返回前快照已写入 planning_results
    #[instrument(skip(self), fields(reference_time = %reference_time))]
    pub async fn run(&self, reference_time: NaiveDateTime) -> ScheduleResult<PlanningRun> {
        // ==========================================
        // 步骤1: 读取排产配置
        // ==========================================
        let max_rank = self
            .config
            .get_max_priority_rank()
            .await
            .map_err(config_err)?;
        let setup_minutes = self.config.get_setup_minutes().await.map_err(config_err)?;
        let buffer_percent = self.config.get_buffer_percent().await.map_err(config_err)?;
        let strictness = self
            .config
            .get_planning_strictness()
            .await
            .map_err(config_err)?;
        let gap_policy = self
            .config
            .get_sequence_gap_policy()
            .await
            .map_err(config_err)?;

        debug!(
            max_rank,
            setup_minutes,
            buffer_percent,
            strictness = %strictness,
            gap_policy = %gap_policy,
            "排产配置加载完成"
        );

        // ==========================================
        // 步骤2: 加载待排订单与机台台账
        // ==========================================
        // 订单按 优先级 -> 交期 -> 图号 排序，机台按代码排序，
        // 排队顺序由此完全确定
        let orders = self.repos.orders().list_by_priority_cutoff(max_rank)?;
        let machines = self.repos.machines().list(true, false)?;

        info!(
            order_count = orders.len(),
            machine_count = machines.len(),
            "待排数据加载完成"
        );

        // ==========================================
        // 步骤3: 逐订单选候选、配机台、试排时间窗
        // ==========================================
        let selector = CandidateSelector::new(gap_policy);
        let audit = strictness == PlanningStrictness::Audit;

        let mut result = PlanningResult::new(reference_time);
        let mut warnings: Vec<PlanningWarning> = Vec::new();
        let mut report: Vec<AvailabilityCheck> = Vec::new();
        let mut timetables: HashMap<String, MachineTimetable> = HashMap::new();
        let mut position: i64 = 0;

        for order in &orders {
            let operations = self.repos.operations().list_by_order(&order.order_id)?;
            if operations.is_empty() {
                if audit {
                    report.push(AvailabilityCheck {
                        order_id: order.order_id.clone(),
                        operation_id: None,
                        seq_no: None,
                        schedulable: false,
                        compatible_count: 0,
                        available_count: 0,
                        reason: "订单没有工序记录".to_string(),
                    });
                }
                continue;
            }

            let selection = selector.select(&operations, &machines);
            for w in &selection.integrity_warnings {
                self.push_warning(
                    &mut warnings,
                    w.code,
                    Some(&order.order_id),
                    Some(&w.operation_id),
                    None,
                    w.message.clone(),
                );
            }

            let candidate = match selection.outcome {
                CandidateOutcome::Selected(op) => op,
                CandidateOutcome::Waiting {
                    operation_id,
                    blocked_on_seq,
                } => {
                    let seq_no = operations
                        .iter()
                        .find(|op| op.operation_id == operation_id)
                        .map(|op| op.seq_no);
                    let message =
                        format!("前道工序 (序号 {}) 未完工，本轮等待", blocked_on_seq);
                    self.push_warning(
                        &mut warnings,
                        warning_codes::CANDIDATE_WAITING,
                        Some(&order.order_id),
                        Some(&operation_id),
                        None,
                        message.clone(),
                    );
                    if audit {
                        report.push(AvailabilityCheck {
                            order_id: order.order_id.clone(),
                            operation_id: Some(operation_id),
                            seq_no,
                            schedulable: false,
                            compatible_count: 0,
                            available_count: 0,
                            reason: message,
                        });
                    }
                    continue;
                }
                CandidateOutcome::NoneEligible => {
                    if audit {
                        report.push(AvailabilityCheck {
                            order_id: order.order_id.clone(),
                            operation_id: None,
                            seq_no: None,
                            schedulable: false,
                            compatible_count: 0,
                            available_count: 0,
                            reason: "整单没有可排工序".to_string(),
                        });
                    }
                    continue;
                }
            };

            // 工种无法识别的工序不参与自动排产，留待人工修数
            if !candidate.kind.is_known() {
                let message = format!("工序工种无法识别: {}", candidate.kind.as_db_str());
                self.push_warning(
                    &mut warnings,
                    warning_codes::UNKNOWN_OPERATION_KIND,
                    Some(&order.order_id),
                    Some(&candidate.operation_id),
                    None,
                    message.clone(),
                );
                if audit {
                    report.push(AvailabilityCheck {
                        order_id: order.order_id.clone(),
                        operation_id: Some(candidate.operation_id.clone()),
                        seq_no: Some(candidate.seq_no),
                        schedulable: false,
                        compatible_count: 0,
                        available_count: 0,
                        reason: message,
                    });
                }
                continue;
            }

            // 机台匹配: 先筛兼容，再筛空闲
            let compatible = self.resolver.compatible_machines(&candidate, &machines);
            if compatible.is_empty() {
                let message = "没有工种兼容的在役机台".to_string();
                self.push_warning(
                    &mut warnings,
                    warning_codes::NO_COMPATIBLE_MACHINE,
                    Some(&order.order_id),
                    Some(&candidate.operation_id),
                    None,
                    message.clone(),
                );
                if audit {
                    report.push(AvailabilityCheck {
                        order_id: order.order_id.clone(),
                        operation_id: Some(candidate.operation_id.clone()),
                        seq_no: Some(candidate.seq_no),
                        schedulable: false,
                        compatible_count: 0,
                        available_count: 0,
                        reason: message,
                    });
                }
                continue;
            }

            let available: Vec<&Machine> = compatible
                .iter()
                .copied()
                .filter(|m| m.is_available())
                .collect();
            if available.is_empty() {
                let message = format!("兼容机台 {} 台当前全部占用", compatible.len());
                self.push_warning(
                    &mut warnings,
                    warning_codes::ALL_MACHINES_OCCUPIED,
                    Some(&order.order_id),
                    Some(&candidate.operation_id),
                    None,
                    message.clone(),
                );
                if audit {
                    report.push(AvailabilityCheck {
                        order_id: order.order_id.clone(),
                        operation_id: Some(candidate.operation_id.clone()),
                        seq_no: Some(candidate.seq_no),
                        schedulable: false,
                        compatible_count: compatible.len(),
                        available_count: 0,
                        reason: message,
                    });
                }
                continue;
            }

            // 机台列表按代码升序，首次匹配即取第一台空闲兼容机台
            let machine = available[0];
            let minutes =
                candidate.effective_minutes(order.quantity, setup_minutes, buffer_percent);
            let timetable = timetables
                .entry(machine.code.clone())
                .or_insert_with(MachineTimetable::new);

            let placement = match self.allocator.find_slot(timetable, reference_time, minutes) {
                Some(p) => p,
                None => {
                    let message = format!("机台 {} 在推进上限内找不到可用时间窗", machine.code);
                    self.push_warning(
                        &mut warnings,
                        warning_codes::NO_AVAILABLE_SLOT,
                        Some(&order.order_id),
                        Some(&candidate.operation_id),
                        Some(&machine.code),
                        message.clone(),
                    );
                    if audit {
                        report.push(AvailabilityCheck {
                            order_id: order.order_id.clone(),
                            operation_id: Some(candidate.operation_id.clone()),
                            seq_no: Some(candidate.seq_no),
                            schedulable: false,
                            compatible_count: compatible.len(),
                            available_count: available.len(),
                            reason: message,
                        });
                    }
                    continue;
                }
            };

            timetable.book(&candidate.operation_id, &placement);
            position += 1;

            debug!(
                order_id = %order.order_id,
                operation_id = %candidate.operation_id,
                machine_code = %machine.code,
                position,
                start = %placement.start,
                end = %placement.end,
                shift = %placement.shift,
                "工序入队"
            );

            let entry = PlanEntry::new(
                result.result_id.clone(),
                position,
                order.order_id.clone(),
                candidate.operation_id.clone(),
                machine.code.clone(),
                TimeWindow {
                    start: placement.start,
                    end: placement.end,
                    shift: placement.shift,
                },
            );
            result.push_entry(entry, minutes);

            if audit {
                report.push(AvailabilityCheck {
                    order_id: order.order_id.clone(),
                    operation_id: Some(candidate.operation_id.clone()),
                    seq_no: Some(candidate.seq_no),
                    schedulable: true,
                    compatible_count: compatible.len(),
                    available_count: available.len(),
                    reason: "已入队".to_string(),
                });
            }
        }

        // ==========================================
        // 步骤4: 快照落库
        // ==========================================
        // 空队列同样落库，留下"这一轮没有可排订单"的运行记录
        self.repos.planning_results().append(&result)?;

        info!(
            result_id = %result.result_id,
            selected_orders = result.selected_order_ids.len(),
            entry_count = result.entries.len(),
            total_minutes = result.total_minutes,
            required_workdays = result.required_workdays,
            warning_count = warnings.len(),
            "排产运行完成"
        );

        Ok(PlanningRun {
            result,
            strictness,
            warnings,
            availability_report: report,
        })
    }

    /// 记录一条业务告警并同步对外发布
    fn push_warning(
        &self,
        warnings: &mut Vec<PlanningWarning>,
        code: &'static str,
        order_id: Option<&str>,
        operation_id: Option<&str>,
        machine_code: Option<&str>,
        message: String,
    ) {
        self.events
            .emit_warning(code, order_id, operation_id, machine_code, message.clone());
        warnings.push(PlanningWarning {
            code,
            order_id: order_id.map(str::to_string),
            operation_id: operation_id.map(str::to_string),
            machine_code: machine_code.map(str::to_string),
            message,
        });
    }
}

fn config_err(e: Box<dyn std::error::Error>) -> ScheduleError {
    ScheduleError::ConfigError(e.to_string())
}
