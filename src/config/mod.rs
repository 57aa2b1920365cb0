// ==========================================
// 机加工车间排产系统 - 配置模块
// ==========================================

pub mod config_manager;
pub mod scheduler_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use scheduler_config_trait::SchedulerConfigReader;
