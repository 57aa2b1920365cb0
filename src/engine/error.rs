// ==========================================
// 机加工车间排产系统 - 引擎层错误类型
// ==========================================
// 职责: 排产与对账引擎对外的错误出口
// 映射: 仓储层错误按业务含义归类，占用冲突与找不到
//       记录不落在笼统的 Repository 变体里
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("工序与机台不兼容: operation={operation_id} machine={machine_code} ({reason})")]
    IncompatibleAssignment {
        operation_id: String,
        machine_code: String,
        reason: String,
    },

    #[error("机台已被占用: {machine_code}")]
    AlreadyOccupied { machine_code: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("事务执行失败: {0}")]
    TransactionFailure(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("仓储层错误: {0}")]
    Repository(RepositoryError),
}

// 仓储错误按含义归类，剩余的透传
impl From<RepositoryError> for ScheduleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::MachineOccupied { machine_code } => {
                ScheduleError::AlreadyOccupied { machine_code }
            }
            RepositoryError::NotFound { entity, id } => ScheduleError::NotFound { entity, id },
            RepositoryError::InvalidStateTransition { from, to } => {
                ScheduleError::InvalidStateTransition { from, to }
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ScheduleError::TransactionFailure(msg)
            }
            other => ScheduleError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type ScheduleResult<T> = Result<T, ScheduleError>;
