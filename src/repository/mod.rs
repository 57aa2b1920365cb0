// ==========================================
// 机加工车间排产系统 - 仓储层
// ==========================================
// 所有仓储共享同一个 SQLite 连接（Arc<Mutex<Connection>>），
// 各自负责建表；跨表写入只出现在工序仓储的事务方法里。
// ==========================================

pub mod error;
pub mod machine_repo;
pub mod operation_repo;
pub mod order_repo;
pub mod planning_result_repo;
pub mod shift_record_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use machine_repo::MachineRepository;
pub use operation_repo::OperationRepository;
pub use order_repo::OrderRepository;
pub use planning_result_repo::PlanningResultRepository;
pub use shift_record_repo::ShiftRecordRepository;
