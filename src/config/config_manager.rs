// ==========================================
// 机加工车间排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::scheduler_config_trait::SchedulerConfigReader;
use crate::domain::types::{PlanningStrictness, SequenceGapPolicy};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_table()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn ensure_table(&self) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key      TEXT NOT NULL,
                value    TEXT NOT NULL,
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 覆写 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    ///
    /// # 参数
    /// - key: 配置键
    /// - default: 默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 返回
    /// - Ok(String): 配置快照的JSON字符串
    /// - Err: 获取失败
    ///
    /// # 用途
    /// - 排产运行日志中记录当时生效的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// SchedulerConfigReader Trait 实现
// ==========================================
#[async_trait]
impl SchedulerConfigReader for ConfigManager {
    async fn get_max_priority_rank(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MAX_PRIORITY_RANK, "3")?;
        Ok(value.parse::<i64>().unwrap_or(3))
    }

    async fn get_default_target_quantity(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_TARGET_QUANTITY, "30")?;
        Ok(value.parse::<i64>().unwrap_or(30))
    }

    async fn get_setup_minutes(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SETUP_MINUTES, "60")?;
        Ok(value.parse::<i64>().unwrap_or(60))
    }

    async fn get_buffer_percent(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::BUFFER_PERCENT, "10.0")?;
        Ok(value.parse::<f64>().unwrap_or(10.0))
    }

    async fn get_planning_strictness(&self) -> Result<PlanningStrictness, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::PLANNING_STRICTNESS, "AUDIT")?;
        Ok(PlanningStrictness::from_db_str(&value).unwrap_or(PlanningStrictness::Audit))
    }

    async fn get_sequence_gap_policy(&self) -> Result<SequenceGapPolicy, Box<dyn Error>> {
        let value =
            self.get_config_or_default(config_keys::SEQUENCE_GAP_POLICY, "REQUIRE_CONTIGUOUS")?;
        Ok(SequenceGapPolicy::from_db_str(&value).unwrap_or(SequenceGapPolicy::RequireContiguous))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排产取数
    pub const MAX_PRIORITY_RANK: &str = "planning_max_priority_rank";
    pub const PLANNING_STRICTNESS: &str = "planning_strictness";
    pub const SEQUENCE_GAP_POLICY: &str = "sequence_gap_policy";

    // 工时推算
    pub const SETUP_MINUTES: &str = "scheduling_setup_minutes";
    pub const BUFFER_PERCENT: &str = "scheduling_buffer_percent";

    // 进度对账
    pub const DEFAULT_TARGET_QUANTITY: &str = "default_target_quantity";
}
