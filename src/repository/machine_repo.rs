// ==========================================
// 机加工车间排产系统 - 机台仓储
// ==========================================
// 职责: machines 表的建表与读写
// 红线: is_occupied / current_operation_id 的写入只允许走
//       工序仓储的事务方法，本仓储只提供查询与台账维护
// ==========================================

use crate::domain::types::MachineKind;
use crate::domain::Machine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 机台仓储
pub struct MachineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = Connection::open(db_path).map_err(|e| {
            RepositoryError::DatabaseConnectionError(format!("无法打开数据库: {}", e))
        })?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(format!("获取数据库锁失败: {}", e)))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS machines (
                machine_id           TEXT PRIMARY KEY,
                code                 TEXT NOT NULL UNIQUE,
                kind                 TEXT NOT NULL,
                axes                 INTEGER NOT NULL DEFAULT 0,
                is_active            INTEGER NOT NULL DEFAULT 1,
                is_occupied          INTEGER NOT NULL DEFAULT 0,
                current_operation_id TEXT,
                created_at           TEXT NOT NULL,
                updated_at           TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_machines_kind ON machines(kind, is_active);
            CREATE INDEX IF NOT EXISTS idx_machines_current_op ON machines(current_operation_id);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<Machine> {
        let kind_raw: String = row.get("kind")?;
        let kind = MachineKind::from_db_str(&kind_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("无法识别的机台类型: {}", kind_raw).into(),
            )
        })?;
        Ok(Machine {
            machine_id: row.get("machine_id")?,
            code: row.get("code")?,
            kind,
            axes: row.get("axes")?,
            is_active: row.get("is_active")?,
            is_occupied: row.get("is_occupied")?,
            current_operation_id: row.get("current_operation_id")?,
            created_at: row.get::<_, NaiveDateTime>("created_at")?,
            updated_at: row.get::<_, NaiveDateTime>("updated_at")?,
        })
    }

    /// 写入或覆盖一台机台（台账导入与测试数据准备使用）
    ///
    /// 覆盖写入不触碰占用字段，避免台账刷新冲掉在制状态。
    pub fn upsert(&self, machine: &Machine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO machines
                (machine_id, code, kind, axes, is_active, is_occupied,
                 current_operation_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(code) DO UPDATE SET
                kind       = excluded.kind,
                axes       = excluded.axes,
                is_active  = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
            params![
                machine.machine_id,
                machine.code,
                machine.kind.to_db_str(),
                machine.axes,
                machine.is_active,
                machine.is_occupied,
                machine.current_operation_id,
                machine.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                machine.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM machines WHERE code = ?1",
            params![code],
            Self::map_row,
        );
        match result {
            Ok(machine) => Ok(Some(machine)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查找当前占用指定工序的机台
    pub fn find_by_current_operation(
        &self,
        operation_id: &str,
    ) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM machines WHERE current_operation_id = ?1 LIMIT 1",
            params![operation_id],
            Self::map_row,
        );
        match result {
            Ok(machine) => Ok(Some(machine)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 机台清单，按编号升序（排产遍历顺序以此为准）
    pub fn list(&self, active_only: bool, available_only: bool) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut clauses: Vec<&str> = Vec::new();
        if active_only {
            clauses.push("is_active = 1");
        }
        if available_only {
            clauses.push("is_active = 1");
            clauses.push("is_occupied = 0");
        }
        let sql = if clauses.is_empty() {
            "SELECT * FROM machines ORDER BY code ASC".to_string()
        } else {
            clauses.dedup();
            format!(
                "SELECT * FROM machines WHERE {} ORDER BY code ASC",
                clauses.join(" AND ")
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut machines = Vec::new();
        for row in rows {
            machines.push(row?);
        }
        Ok(machines)
    }
}
