// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use machine_shop_aps::domain::machine::Machine;
use machine_shop_aps::domain::order::{Operation, Order};
use machine_shop_aps::domain::types::{MachineKind, OperationKind, OperationStatus};

/// 测试基准日: 2024-03-04 周一（默认日历下周五/周六停工）
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// 基准日白班开班时刻 08:00
pub fn base_time() -> NaiveDateTime {
    base_date().and_hms_opt(8, 0, 0).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

// ==========================================
// Order 构建器
// ==========================================

pub struct OrderBuilder {
    order_id: String,
    drawing_number: Option<String>,
    quantity: i64,
    deadline: NaiveDate,
    priority: i64,
    work_type: Option<String>,
}

impl OrderBuilder {
    pub fn new(order_id: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            drawing_number: None,
            quantity: 10,
            deadline: base_date() + Duration::days(14),
            priority: 1,
            work_type: None,
        }
    }

    pub fn drawing_number(mut self, value: &str) -> Self {
        self.drawing_number = Some(value.to_string());
        self
    }

    pub fn quantity(mut self, value: i64) -> Self {
        self.quantity = value;
        self
    }

    pub fn deadline(mut self, value: NaiveDate) -> Self {
        self.deadline = value;
        self
    }

    pub fn priority(mut self, value: i64) -> Self {
        self.priority = value;
        self
    }

    pub fn work_type(mut self, value: &str) -> Self {
        self.work_type = Some(value.to_string());
        self
    }

    pub fn build(self) -> Order {
        Order {
            drawing_number: self
                .drawing_number
                .unwrap_or_else(|| format!("DWG-{}", self.order_id)),
            order_id: self.order_id,
            quantity: self.quantity,
            deadline: self.deadline,
            priority: self.priority,
            work_type: self.work_type,
            created_at: base_time(),
            updated_at: base_time(),
        }
    }
}

// ==========================================
// Operation 构建器
// ==========================================

pub struct OperationBuilder {
    operation_id: String,
    order_id: String,
    seq_no: i64,
    kind: OperationKind,
    required_axes: Option<i64>,
    estimated_minutes: i64,
    minutes_per_unit: Option<f64>,
    status: OperationStatus,
    assigned_machine_code: Option<String>,
    completed_quantity: i64,
}

impl OperationBuilder {
    pub fn new(operation_id: &str, order_id: &str, seq_no: i64) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            order_id: order_id.to_string(),
            seq_no,
            kind: OperationKind::Milling,
            required_axes: None,
            estimated_minutes: 0,
            minutes_per_unit: Some(6.0),
            status: OperationStatus::Pending,
            assigned_machine_code: None,
            completed_quantity: 0,
        }
    }

    pub fn kind(mut self, value: OperationKind) -> Self {
        self.kind = value;
        self
    }

    pub fn required_axes(mut self, value: i64) -> Self {
        self.required_axes = Some(value);
        self
    }

    pub fn estimated_minutes(mut self, value: i64) -> Self {
        self.estimated_minutes = value;
        self
    }

    pub fn minutes_per_unit(mut self, value: f64) -> Self {
        self.minutes_per_unit = Some(value);
        self
    }

    pub fn status(mut self, value: OperationStatus) -> Self {
        self.status = value;
        self
    }

    /// 直接以已派状态落库（绕过派工事务，机台台账需自行对齐）
    pub fn assigned_to(mut self, machine_code: &str) -> Self {
        self.status = OperationStatus::Assigned;
        self.assigned_machine_code = Some(machine_code.to_string());
        self
    }

    pub fn completed_quantity(mut self, value: i64) -> Self {
        self.completed_quantity = value;
        self
    }

    pub fn build(self) -> Operation {
        let assigned_at = self
            .assigned_machine_code
            .as_ref()
            .map(|_| base_time());
        Operation {
            operation_id: self.operation_id,
            order_id: self.order_id,
            seq_no: self.seq_no,
            kind: self.kind,
            required_axes: self.required_axes,
            estimated_minutes: self.estimated_minutes,
            minutes_per_unit: self.minutes_per_unit,
            status: self.status,
            assigned_machine_code: self.assigned_machine_code,
            assigned_at,
            completed_quantity: self.completed_quantity,
            created_at: base_time(),
            updated_at: base_time(),
        }
    }
}

// ==========================================
// Machine 构建器
// ==========================================

pub struct MachineBuilder {
    code: String,
    kind: MachineKind,
    axes: i64,
    is_active: bool,
    is_occupied: bool,
    current_operation_id: Option<String>,
}

impl MachineBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            kind: MachineKind::Milling,
            axes: 3,
            is_active: true,
            is_occupied: false,
            current_operation_id: None,
        }
    }

    pub fn kind(mut self, value: MachineKind) -> Self {
        self.kind = value;
        self
    }

    pub fn axes(mut self, value: i64) -> Self {
        self.axes = value;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn occupied_by(mut self, operation_id: &str) -> Self {
        self.is_occupied = true;
        self.current_operation_id = Some(operation_id.to_string());
        self
    }

    pub fn build(self) -> Machine {
        Machine {
            machine_id: format!("M-{}", self.code),
            code: self.code,
            kind: self.kind,
            axes: self.axes,
            is_active: self.is_active,
            is_occupied: self.is_occupied,
            current_operation_id: self.current_operation_id,
            created_at: base_time(),
            updated_at: base_time(),
        }
    }
}
