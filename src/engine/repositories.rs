// ==========================================
// 机加工车间排产系统 - 引擎仓储集合
// ==========================================
// 职责: 把引擎需要的全部仓储捆成一个可克隆的句柄，
//       保证它们共享同一个数据库连接
// ==========================================

use crate::repository::{
    MachineRepository, OperationRepository, OrderRepository, PlanningResultRepository,
    RepositoryResult, ShiftRecordRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 引擎层使用的仓储集合
#[derive(Clone)]
pub struct ScheduleRepositories {
    orders: Arc<OrderRepository>,
    operations: Arc<OperationRepository>,
    machines: Arc<MachineRepository>,
    shift_records: Arc<ShiftRecordRepository>,
    planning_results: Arc<PlanningResultRepository>,
}

impl ScheduleRepositories {
    /// 打开数据库并建好全部仓储
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path).map_err(|e| {
            crate::repository::RepositoryError::DatabaseConnectionError(format!(
                "无法打开数据库: {}",
                e
            ))
        })?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 在已有连接上建好全部仓储（各仓储各自确保建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        Ok(Self {
            orders: Arc::new(OrderRepository::from_connection(conn.clone())?),
            operations: Arc::new(OperationRepository::from_connection(conn.clone())?),
            machines: Arc::new(MachineRepository::from_connection(conn.clone())?),
            shift_records: Arc::new(ShiftRecordRepository::from_connection(conn.clone())?),
            planning_results: Arc::new(PlanningResultRepository::from_connection(conn)?),
        })
    }

    pub fn orders(&self) -> &OrderRepository {
        &self.orders
    }

    pub fn operations(&self) -> &OperationRepository {
        &self.operations
    }

    pub fn machines(&self) -> &MachineRepository {
        &self.machines
    }

    pub fn shift_records(&self) -> &ShiftRecordRepository {
        &self.shift_records
    }

    pub fn planning_results(&self) -> &PlanningResultRepository {
        &self.planning_results
    }
}

// 注: 仓储集合按值克隆很便宜（内部全是 Arc），
// 排产引擎与对账引擎可各持一份。
