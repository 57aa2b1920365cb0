// ==========================================
// 机加工车间排产系统 - 设备实体
// ==========================================
// 红线: is_occupied / current_operation_id 只能由仓储层的
// 事务方法（分配/释放/完工释放）修改，引擎不得直接改写。
// ==========================================

use crate::domain::types::MachineKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 物理加工设备
///
/// 占用标志与当前工序引用互为一体：is_occupied 为 true
/// 当且仅当 current_operation_id 指向恰好一道在产工序。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// 设备ID (UUID)
    pub machine_id: String,
    /// 设备代码（业务唯一键，如 MILL-01）
    pub code: String,
    /// 设备类型
    pub kind: MachineKind,
    /// 联动轴数（3 或 4）
    pub axes: i64,
    /// 是否在役
    pub is_active: bool,
    /// 是否被占用
    pub is_occupied: bool,
    /// 当前工序ID
    pub current_operation_id: Option<String>,
    /// 创建时间
    pub created_at: NaiveDateTime,
    /// 更新时间
    pub updated_at: NaiveDateTime,
}

impl Machine {
    /// 是否可接受新分配（在役且未被占用）
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_occupied
    }
}
