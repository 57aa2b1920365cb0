// ==========================================
// 机加工车间排产系统 - 实绩对账引擎
// ==========================================
// 职责: 手工派工 / 撤销派工、按班次实绩重算工序进度、
//       计划与实际机台的偏离检测、在制工序全量对账
// 红线: 进度只向前推不降级; 达标即完工并释放机台;
//       单工序对账失败只记失败项，不中断全量对账
// ==========================================

use crate::config::SchedulerConfigReader;
use crate::domain::machine::Machine;
use crate::domain::order::Operation;
use crate::domain::shift_record::ShiftProductionRecord;
use crate::domain::types::OperationStatus;
use crate::engine::compatibility::CompatibilityResolver;
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::events::{warning_codes, OptionalEventSink, ScheduleEventSink};
use crate::engine::repositories::ScheduleRepositories;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 对账输出
// ==========================================

/// 单道工序一次进度重算的结论
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub operation_id: String,
    /// 非归档实绩合计（件）
    pub total_produced: i64,
    /// 目标件数（订单数量，缺失时取配置兜底值）
    pub target_quantity: i64,
    pub percent: f64,
    pub status_after: OperationStatus,
    /// 本次重算是否触发了完工释放
    pub machine_released: bool,
}

/// 全量对账汇总
#[derive(Debug, Default)]
pub struct BulkResyncReport {
    /// 扫描的在制工序数
    pub processed: usize,
    /// 本轮判定完工的工序数
    pub completed: usize,
    /// 本轮判定在制的工序数
    pub in_progress: usize,
    /// 本轮新标记重排的计划条目数
    pub reschedules: usize,
    /// 失败项 (工序ID, 错误描述)，不中断整体流程
    pub failures: Vec<(String, String)>,
}

/// 单道工序的对账视图（进度 + 台账 + 计划对照）
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub operation: Operation,
    /// 台账中声称正在加工该工序的机台
    pub machine: Option<Machine>,
    /// 非归档实绩明细（按日期、班次排序）
    pub records: Vec<ShiftProductionRecord>,
    pub total_produced: i64,
    pub target_quantity: i64,
    pub percent: f64,
    /// 最新排产快照中该工序的计划机台
    pub planned_machine_code: Option<String>,
}

// ==========================================
// SyncEngine - 实绩对账引擎
// ==========================================

pub struct SyncEngine<C>
where
    C: SchedulerConfigReader,
{
    repos: ScheduleRepositories,
    config: Arc<C>,
    resolver: CompatibilityResolver,
    events: OptionalEventSink,
}

impl<C> SyncEngine<C>
where
    C: SchedulerConfigReader,
{
    /// 创建对账引擎
    ///
    /// # 参数
    /// - repos: 仓储集合
    /// - config: 配置读取器
    pub fn new(repos: ScheduleRepositories, config: Arc<C>) -> Self {
        Self {
            repos,
            config,
            resolver: CompatibilityResolver::new(),
            events: OptionalEventSink::none(),
        }
    }

    /// 挂接事件发布器，超产告警与重排建议会同步发布
    pub fn with_event_sink(mut self, sink: Arc<dyn ScheduleEventSink>) -> Self {
        self.events = OptionalEventSink::with_sink(sink);
        self
    }

    // ==========================================
    // 手工派工 / 撤销
    // ==========================================

    /// 把工序派到指定机台
    ///
    /// 校验顺序: 工序存在且未完工 -> 机台存在且在役 -> 工种兼容，
    /// 全部通过后走仓储层事务占台。重复派工会先释放旧机台。
    ///
    /// # 参数
    /// - operation_id: 工序ID
    /// - machine_code: 目标机台代码
    /// - today: 业务日期（用于开班占位记录）
    #[instrument(skip(self), fields(operation_id = %operation_id, machine_code = %machine_code))]
    pub async fn assign(
        &self,
        operation_id: &str,
        machine_code: &str,
        today: NaiveDate,
    ) -> ScheduleResult<()> {
        let operation = self
            .repos
            .operations()
            .find_by_id(operation_id)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            })?;

        if operation.status == OperationStatus::Completed {
            return Err(ScheduleError::InvalidStateTransition {
                from: OperationStatus::Completed.to_db_str().to_string(),
                to: OperationStatus::Assigned.to_db_str().to_string(),
            });
        }

        let machine = self
            .repos
            .machines()
            .find_by_code(machine_code)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Machine".to_string(),
                id: machine_code.to_string(),
            })?;

        if !machine.is_active {
            return Err(ScheduleError::IncompatibleAssignment {
                operation_id: operation_id.to_string(),
                machine_code: machine_code.to_string(),
                reason: "机台已停用".to_string(),
            });
        }

        if !self.resolver.is_compatible(&operation, &machine) {
            return Err(ScheduleError::IncompatibleAssignment {
                operation_id: operation_id.to_string(),
                machine_code: machine_code.to_string(),
                reason: "工种或轴数不匹配".to_string(),
            });
        }

        // 占台冲突由仓储层事务判定 (MachineOccupied -> AlreadyOccupied)
        self.repos
            .operations()
            .commit_assignment(operation_id, machine_code, today)?;

        info!(
            operation_id = %operation_id,
            machine_code = %machine_code,
            "派工完成"
        );
        Ok(())
    }

    /// 撤销派工，工序退回待排、机台释放
    ///
    /// 只有已派或在制的工序可撤销；完工工序不可回退。
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn unassign(&self, operation_id: &str) -> ScheduleResult<()> {
        let operation = self
            .repos
            .operations()
            .find_by_id(operation_id)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            })?;

        match operation.status {
            OperationStatus::Assigned | OperationStatus::InProgress => {
                self.repos.operations().release_assignment(operation_id)?;
                info!(operation_id = %operation_id, "撤销派工完成");
                Ok(())
            }
            other => Err(ScheduleError::InvalidStateTransition {
                from: other.to_db_str().to_string(),
                to: OperationStatus::Pending.to_db_str().to_string(),
            }),
        }
    }

    // ==========================================
    // 进度重算
    // ==========================================

    /// 按非归档实绩合计重算单道工序进度
    ///
    /// 推进规则:
    /// - 合计 >= 目标件数: 置完工并释放机台（超出部分记超产告警）
    /// - 0 < 合计 < 目标: 置在制（已完工的不降级）
    /// - 合计 = 0: 只同步数量，状态不动
    #[instrument(skip(self), fields(operation_id = %operation_id))]
    pub async fn recompute_progress(&self, operation_id: &str) -> ScheduleResult<SyncProgress> {
        let operation = self
            .repos
            .operations()
            .find_by_id(operation_id)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            })?;

        let total_produced = self.repos.shift_records().sum_quantity(operation_id)?;
        let target_quantity = self.target_quantity_for(&operation).await?;
        let percent = if target_quantity > 0 {
            (total_produced as f64 / target_quantity as f64) * 100.0
        } else {
            0.0
        };

        let reached_target = target_quantity > 0 && total_produced >= target_quantity;
        let (status_after, machine_released) = if reached_target {
            if total_produced > target_quantity {
                self.events.emit_warning(
                    warning_codes::OVER_TARGET,
                    Some(&operation.order_id),
                    Some(operation_id),
                    operation.assigned_machine_code.as_deref(),
                    format!(
                        "实绩合计 {} 件超出目标 {} 件",
                        total_produced, target_quantity
                    ),
                );
            }
            if operation.status == OperationStatus::Completed {
                // 已完工只同步数量
                self.repos
                    .operations()
                    .update_progress(operation_id, total_produced, None)?;
                (OperationStatus::Completed, false)
            } else {
                self.repos
                    .operations()
                    .complete_and_release(operation_id, total_produced)?;
                (
                    OperationStatus::Completed,
                    operation.assigned_machine_code.is_some(),
                )
            }
        } else if total_produced > 0 {
            if operation.status == OperationStatus::Completed {
                // 实绩归档后合计回落也不摘掉完工标志
                self.repos
                    .operations()
                    .update_progress(operation_id, total_produced, None)?;
                (OperationStatus::Completed, false)
            } else {
                self.repos.operations().update_progress(
                    operation_id,
                    total_produced,
                    Some(OperationStatus::InProgress),
                )?;
                (OperationStatus::InProgress, false)
            }
        } else {
            self.repos
                .operations()
                .update_progress(operation_id, 0, None)?;
            (operation.status, false)
        };

        debug!(
            operation_id = %operation_id,
            total_produced,
            target_quantity,
            status_after = %status_after,
            "进度重算完成"
        );

        Ok(SyncProgress {
            operation_id: operation_id.to_string(),
            total_produced,
            target_quantity,
            percent,
            status_after,
            machine_released,
        })
    }

    // ==========================================
    // 机台偏离检测
    // ==========================================

    /// 对照最新排产快照，检测实际机台是否偏离计划
    ///
    /// 偏离时把快照条目标记为 RESCHEDULED 并附原因；
    /// 标记幂等，只有首次标记会发布重排建议事件。
    ///
    /// # 返回
    /// - Some(原因): 检测到偏离（无论是否首次）
    /// - None: 无计划条目或机台一致
    pub async fn detect_machine_change(
        &self,
        operation_id: &str,
        actual_machine_code: &str,
    ) -> ScheduleResult<Option<String>> {
        let planned = match self
            .repos
            .planning_results()
            .latest_item_for_operation(operation_id)?
        {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if planned.machine_code == actual_machine_code {
            return Ok(None);
        }

        let reason = format!(
            "MACHINE_CHANGED: planned={} actual={}",
            planned.machine_code, actual_machine_code
        );
        let newly_marked = self
            .repos
            .planning_results()
            .mark_item_rescheduled(&planned.entry_id, &reason)?;

        if newly_marked {
            warn!(
                operation_id = %operation_id,
                planned_machine = %planned.machine_code,
                actual_machine = %actual_machine_code,
                "实际机台偏离计划，条目已标记重排"
            );
            self.events
                .emit_reschedule(operation_id, Some(actual_machine_code), reason.clone());
        }

        Ok(Some(reason))
    }

    // ==========================================
    // 全量对账
    // ==========================================

    /// 对全部在制工序执行 进度重算 + 机台偏离检测
    ///
    /// 逐工序隔离错误: 失败项收进报告，其余继续。
    #[instrument(skip(self))]
    pub async fn bulk_resync(&self) -> ScheduleResult<BulkResyncReport> {
        let active = self.repos.operations().list_active_assignments()?;
        let mut report = BulkResyncReport::default();

        for operation in &active {
            report.processed += 1;

            match self.recompute_progress(&operation.operation_id).await {
                Ok(progress) => match progress.status_after {
                    OperationStatus::Completed => report.completed += 1,
                    OperationStatus::InProgress => report.in_progress += 1,
                    _ => {}
                },
                Err(e) => {
                    warn!(
                        operation_id = %operation.operation_id,
                        error = %e,
                        "进度重算失败，跳过该工序"
                    );
                    report
                        .failures
                        .push((operation.operation_id.clone(), e.to_string()));
                    continue;
                }
            }

            // 在制清单里 assigned_machine_code 必非空，这里仍按可空处理
            if let Some(actual) = operation.assigned_machine_code.as_deref() {
                match self
                    .detect_machine_change(&operation.operation_id, actual)
                    .await
                {
                    Ok(Some(_)) => report.reschedules += 1,
                    Ok(None) => {}
                    Err(e) => {
                        report
                            .failures
                            .push((operation.operation_id.clone(), e.to_string()));
                    }
                }
            }
        }

        info!(
            processed = report.processed,
            completed = report.completed,
            in_progress = report.in_progress,
            reschedules = report.reschedules,
            failure_count = report.failures.len(),
            "全量对账完成"
        );
        Ok(report)
    }

    // ==========================================
    // 对账视图
    // ==========================================

    /// 查询单道工序的对账视图（不落库）
    pub async fn sync_status(&self, operation_id: &str) -> ScheduleResult<SyncStatus> {
        let operation = self
            .repos
            .operations()
            .find_by_id(operation_id)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            })?;

        let records = self
            .repos
            .shift_records()
            .list_for_operation(operation_id, false)?;
        let total_produced: i64 = records.iter().map(|r| r.quantity).sum();
        let target_quantity = self.target_quantity_for(&operation).await?;
        let percent = if target_quantity > 0 {
            (total_produced as f64 / target_quantity as f64) * 100.0
        } else {
            0.0
        };

        let machine = self
            .repos
            .machines()
            .find_by_current_operation(operation_id)?;
        let planned_machine_code = self
            .repos
            .planning_results()
            .latest_item_for_operation(operation_id)?
            .map(|entry| entry.machine_code);

        Ok(SyncStatus {
            operation,
            machine,
            records,
            total_produced,
            target_quantity,
            percent,
            planned_machine_code,
        })
    }

    /// 工序的目标件数: 订单数量，数量非正时取配置兜底值
    async fn target_quantity_for(&self, operation: &Operation) -> ScheduleResult<i64> {
        let order = self
            .repos
            .orders()
            .find_by_id(&operation.order_id)?
            .ok_or_else(|| ScheduleError::NotFound {
                entity: "Order".to_string(),
                id: operation.order_id.clone(),
            })?;

        if order.quantity > 0 {
            Ok(order.quantity)
        } else {
            let fallback = self
                .config
                .get_default_target_quantity()
                .await
                .map_err(|e| ScheduleError::ConfigError(e.to_string()))?;
            Ok(fallback.max(0))
        }
    }
}
