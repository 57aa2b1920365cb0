// ==========================================
// 机加工车间排产系统 - 工艺兼容判定
// ==========================================
// 依据: 车间工艺矩阵
//   车削   → 车床
//   铣削   → 铣床 (要求四轴及以上时按轴数过滤)
//   钻孔   → 任意铣床
//   磨削   → 任意在用设备 (外协磨床回厂工序，只占台位)
// 红线: 未识别的工序类型不与任何设备兼容，由上游告警
// ==========================================

use crate::domain::types::{MachineKind, OperationKind};
use crate::domain::{Machine, Operation};

/// 高轴数铣削的判定门槛（required_axes 达到该值才按轴数过滤）
const HIGH_AXES_THRESHOLD: i64 = 4;

// ==========================================
// CompatibilityResolver - 兼容判定器
// ==========================================
#[derive(Debug, Default)]
pub struct CompatibilityResolver;

impl CompatibilityResolver {
    pub fn new() -> Self {
        Self
    }

    /// 工序能否在指定机台加工
    ///
    /// 停用机台对所有工序都不兼容；占用状态不在此判定
    /// （兼容性是静态工艺能力，可用性由调用方另查）。
    pub fn is_compatible(&self, operation: &Operation, machine: &Machine) -> bool {
        if !machine.is_active {
            return false;
        }
        match &operation.kind {
            OperationKind::Turning => machine.kind == MachineKind::Turning,
            OperationKind::Milling => {
                if machine.kind != MachineKind::Milling {
                    return false;
                }
                match operation.required_axes {
                    Some(axes) if axes >= HIGH_AXES_THRESHOLD => machine.axes >= axes,
                    _ => true,
                }
            }
            OperationKind::Drilling => machine.kind == MachineKind::Milling,
            OperationKind::Grinding => true,
            OperationKind::Unknown(_) => false,
        }
    }

    /// 兼容机台清单（保持传入顺序）
    pub fn compatible_machines<'a>(
        &self,
        operation: &Operation,
        machines: &'a [Machine],
    ) -> Vec<&'a Machine> {
        machines
            .iter()
            .filter(|m| self.is_compatible(operation, m))
            .collect()
    }

    /// 兼容且当前可用（在用且未占用）的机台清单
    pub fn available_compatible_machines<'a>(
        &self,
        operation: &Operation,
        machines: &'a [Machine],
    ) -> Vec<&'a Machine> {
        machines
            .iter()
            .filter(|m| self.is_compatible(operation, m) && m.is_available())
            .collect()
    }
}
