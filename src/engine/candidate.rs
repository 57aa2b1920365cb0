// ==========================================
// 机加工车间排产系统 - 候选工序选择
// ==========================================
// 职责: 在订单的工序序列里找出当前可排的那一道
// 规则: 工序必须按序号推进; 首道随时可排，后道要求前道已完工;
//       在制/已派/被机台占用的工序挡住后续所有工序;
//       挂起工序出现即停止整单扫描
// ==========================================

use crate::domain::types::{OperationStatus, SequenceGapPolicy};
use crate::domain::{Machine, Operation};
use crate::engine::events::warning_codes;

// ==========================================
// 选择结果
// ==========================================
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    /// 选中一道可排工序
    Selected(Operation),
    /// 有待排工序但前道未完，暂不可排
    Waiting {
        operation_id: String,
        blocked_on_seq: i64,
    },
    /// 整单没有可排工序（全部完工、挂起或为空）
    NoneEligible,
}

/// 扫描中发现的数据完整性告警
#[derive(Debug, Clone)]
pub struct SelectionWarning {
    pub code: &'static str,
    pub operation_id: String,
    pub message: String,
}

#[derive(Debug)]
pub struct SelectionResult {
    pub outcome: CandidateOutcome,
    pub integrity_warnings: Vec<SelectionWarning>,
}

// ==========================================
// CandidateSelector - 候选选择器
// ==========================================
pub struct CandidateSelector {
    policy: SequenceGapPolicy,
}

impl CandidateSelector {
    pub fn new(policy: SequenceGapPolicy) -> Self {
        Self { policy }
    }

    /// 从订单的工序列表中选出当前可排的候选
    ///
    /// machines 用于交叉核对: 工序状态是待排、但有机台声称
    /// 正在加工它时，以机台台账为准跳过该工序并记告警。
    pub fn select(&self, operations: &[Operation], machines: &[Machine]) -> SelectionResult {
        let mut warnings = Vec::new();

        // 防御性排序: 调用方通常已按序号给出
        let mut sorted: Vec<&Operation> = operations.iter().collect();
        sorted.sort_by_key(|op| op.seq_no);

        let mut prev: Option<&Operation> = None;
        for op in sorted {
            // 机台台账交叉核对
            let claimed_by_machine = machines
                .iter()
                .any(|m| m.current_operation_id.as_deref() == Some(op.operation_id.as_str()));
            if claimed_by_machine && op.status == OperationStatus::Pending {
                warnings.push(SelectionWarning {
                    code: warning_codes::STATUS_DESYNC,
                    operation_id: op.operation_id.clone(),
                    message: format!(
                        "工序 {} 状态为待排，但机台台账显示其在加工中，视同在制跳过",
                        op.operation_id
                    ),
                });
                prev = Some(op);
                continue;
            }

            match op.status {
                // 已完工或在制（含已派）的工序不是候选，但决定后道能否排
                OperationStatus::Completed
                | OperationStatus::InProgress
                | OperationStatus::Assigned => {
                    prev = Some(op);
                    continue;
                }
                // 挂起即停止整单扫描，等人工处理
                OperationStatus::OnHold => {
                    return SelectionResult {
                        outcome: CandidateOutcome::NoneEligible,
                        integrity_warnings: warnings,
                    };
                }
                OperationStatus::Pending => {
                    // 首道工序随时可排
                    if op.seq_no <= 1 {
                        return SelectionResult {
                            outcome: CandidateOutcome::Selected(op.clone()),
                            integrity_warnings: warnings,
                        };
                    }
                    match prev {
                        Some(p) => {
                            if p.status != OperationStatus::Completed {
                                return SelectionResult {
                                    outcome: CandidateOutcome::Waiting {
                                        operation_id: op.operation_id.clone(),
                                        blocked_on_seq: p.seq_no,
                                    },
                                    integrity_warnings: warnings,
                                };
                            }
                            if p.seq_no == op.seq_no - 1 {
                                // 前道紧邻且已完工
                                return SelectionResult {
                                    outcome: CandidateOutcome::Selected(op.clone()),
                                    integrity_warnings: warnings,
                                };
                            }
                            // 断号: 前道记录缺失
                            warnings.push(gap_warning(op, op.seq_no - 1));
                            return self.resolve_gap(op, warnings);
                        }
                        None => {
                            // 序列从中间开始，头部断号
                            warnings.push(gap_warning(op, op.seq_no - 1));
                            return self.resolve_gap(op, warnings);
                        }
                    }
                }
            }
        }

        SelectionResult {
            outcome: CandidateOutcome::NoneEligible,
            integrity_warnings: warnings,
        }
    }

    fn resolve_gap(&self, op: &Operation, warnings: Vec<SelectionWarning>) -> SelectionResult {
        match self.policy {
            SequenceGapPolicy::TreatSatisfied => SelectionResult {
                outcome: CandidateOutcome::Selected(op.clone()),
                integrity_warnings: warnings,
            },
            SequenceGapPolicy::RequireContiguous => SelectionResult {
                outcome: CandidateOutcome::Waiting {
                    operation_id: op.operation_id.clone(),
                    blocked_on_seq: op.seq_no - 1,
                },
                integrity_warnings: warnings,
            },
        }
    }
}

fn gap_warning(op: &Operation, missing_seq: i64) -> SelectionWarning {
    SelectionWarning {
        code: warning_codes::SEQUENCE_GAP,
        operation_id: op.operation_id.clone(),
        message: format!(
            "订单 {} 工序号断号: 工序 {} (第{}道) 的前道第{}道无记录",
            op.order_id, op.operation_id, op.seq_no, missing_seq
        ),
    }
}
