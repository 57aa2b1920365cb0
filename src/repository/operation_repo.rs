// ==========================================
// 机加工车间排产系统 - 工序仓储
// ==========================================
// 职责: operations 表的建表与读写，以及派工 / 释放 / 完工
//       三个跨表事务（工序状态与机台占用必须同事务落库）
// 红线: 机台占用字段只在本文件的事务方法里写，
//       任何一步失败整个事务回滚，不允许出现
//       工序已派而机台未占（或反之）的中间态
// ==========================================

use crate::domain::types::{OperationKind, OperationStatus};
use crate::domain::Operation;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 工序仓储
pub struct OperationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperationRepository {
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
            CREATE TABLE IF NOT EXISTS operations (
                operation_id          TEXT PRIMARY KEY,
                order_id              TEXT NOT NULL,
                seq_no                INTEGER NOT NULL,
                kind                  TEXT NOT NULL,
                required_axes         INTEGER,
                estimated_minutes     INTEGER NOT NULL DEFAULT 0,
                minutes_per_unit      REAL,
                status                TEXT NOT NULL DEFAULT 'PENDING',
                assigned_machine_code TEXT,
                assigned_at           TEXT,
                completed_quantity    INTEGER NOT NULL DEFAULT 0,
                created_at            TEXT NOT NULL,
                updated_at            TEXT NOT NULL,
                UNIQUE(order_id, seq_no)
            );
            CREATE INDEX IF NOT EXISTS idx_operations_order ON operations(order_id, seq_no);
            CREATE INDEX IF NOT EXISTS idx_operations_status ON operations(status);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<Operation> {
        let kind_raw: String = row.get("kind")?;
        let status_raw: String = row.get("status")?;
        let status = OperationStatus::from_db_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("无法识别的工序状态: {}", status_raw).into(),
            )
        })?;
        Ok(Operation {
            operation_id: row.get("operation_id")?,
            order_id: row.get("order_id")?,
            seq_no: row.get("seq_no")?,
            kind: OperationKind::from_db_str(&kind_raw),
            required_axes: row.get("required_axes")?,
            estimated_minutes: row.get("estimated_minutes")?,
            minutes_per_unit: row.get("minutes_per_unit")?,
            status,
            assigned_machine_code: row.get("assigned_machine_code")?,
            assigned_at: row.get::<_, Option<NaiveDateTime>>("assigned_at")?,
            completed_quantity: row.get("completed_quantity")?,
            created_at: row.get::<_, NaiveDateTime>("created_at")?,
            updated_at: row.get::<_, NaiveDateTime>("updated_at")?,
        })
    }

    /// 写入或覆盖一道工序（导入与测试数据准备使用）
    pub fn upsert(&self, operation: &Operation) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO operations
                (operation_id, order_id, seq_no, kind, required_axes, estimated_minutes,
                 minutes_per_unit, status, assigned_machine_code, assigned_at,
                 completed_quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(operation_id) DO UPDATE SET
                order_id              = excluded.order_id,
                seq_no                = excluded.seq_no,
                kind                  = excluded.kind,
                required_axes         = excluded.required_axes,
                estimated_minutes     = excluded.estimated_minutes,
                minutes_per_unit      = excluded.minutes_per_unit,
                status                = excluded.status,
                assigned_machine_code = excluded.assigned_machine_code,
                assigned_at           = excluded.assigned_at,
                completed_quantity    = excluded.completed_quantity,
                updated_at            = excluded.updated_at
            "#,
            params![
                operation.operation_id,
                operation.order_id,
                operation.seq_no,
                operation.kind.as_db_str(),
                operation.required_axes,
                operation.estimated_minutes,
                operation.minutes_per_unit,
                operation.status.to_db_str(),
                operation.assigned_machine_code,
                operation
                    .assigned_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                operation.completed_quantity,
                operation.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                operation.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, operation_id: &str) -> RepositoryResult<Option<Operation>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM operations WHERE operation_id = ?1",
            params![operation_id],
            Self::map_row,
        );
        match result {
            Ok(op) => Ok(Some(op)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 订单下全部工序，按工序号升序
    pub fn list_by_order(&self, order_id: &str) -> RepositoryResult<Vec<Operation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM operations WHERE order_id = ?1 ORDER BY seq_no ASC")?;
        let rows = stmt.query_map(params![order_id], Self::map_row)?;
        let mut operations = Vec::new();
        for row in rows {
            operations.push(row?);
        }
        Ok(operations)
    }

    /// 在制派工清单: 已派或在制、且记录了机台的工序（批量对账的输入）
    pub fn list_active_assignments(&self) -> RepositoryResult<Vec<Operation>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM operations
            WHERE status IN ('ASSIGNED', 'IN_PROGRESS')
              AND assigned_machine_code IS NOT NULL
            ORDER BY order_id ASC, seq_no ASC
            "#,
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut operations = Vec::new();
        for row in rows {
            operations.push(row?);
        }
        Ok(operations)
    }

    /// 派工事务: 工序落机台
    ///
    /// 同一事务内完成四步:
    /// 1. 归还此前占用该工序的机台（换机重派时旧机台先释放）
    /// 2. 乐观占用目标机台，零行命中说明读到写之间状态变了，按原因报错
    /// 3. 工序置 ASSIGNED 并记录机台与派工时间
    /// 4. 当日该机台无报工记录则补一条零数量白班占位
    pub fn commit_assignment(
        &self,
        operation_id: &str,
        machine_code: &str,
        today: NaiveDate,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let now_text = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let tx = conn.transaction().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("开启事务失败: {}", e))
        })?;

        // === 步骤 1: 释放旧机台 ===
        tx.execute(
            r#"
            UPDATE machines
            SET is_occupied = 0, current_operation_id = NULL, updated_at = ?1
            WHERE current_operation_id = ?2
            "#,
            params![now_text, operation_id],
        )?;

        // === 步骤 2: 乐观占用目标机台 ===
        let occupied = tx.execute(
            r#"
            UPDATE machines
            SET is_occupied = 1, current_operation_id = ?1, updated_at = ?2
            WHERE code = ?3 AND is_active = 1 AND is_occupied = 0
            "#,
            params![operation_id, now_text, machine_code],
        )?;
        if occupied == 0 {
            // 零行命中要区分三种情况，事务随 drop 回滚
            let probe = match tx.query_row(
                "SELECT is_active, is_occupied FROM machines WHERE code = ?1",
                params![machine_code],
                |row| Ok((row.get::<_, bool>(0)?, row.get::<_, bool>(1)?)),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };
            return match probe {
                None => Err(RepositoryError::NotFound {
                    entity: "Machine".to_string(),
                    id: machine_code.to_string(),
                }),
                Some((false, _)) => Err(RepositoryError::BusinessRuleViolation(format!(
                    "机台未激活，不可派工: {}",
                    machine_code
                ))),
                Some((true, _)) => Err(RepositoryError::MachineOccupied {
                    machine_code: machine_code.to_string(),
                }),
            };
        }

        // === 步骤 3: 工序落派工状态 ===
        let updated = tx.execute(
            r#"
            UPDATE operations
            SET status = 'ASSIGNED', assigned_machine_code = ?1,
                assigned_at = ?2, updated_at = ?2
            WHERE operation_id = ?3
            "#,
            params![machine_code, now_text, operation_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            });
        }

        // === 步骤 4: 补零数量白班占位记录 ===
        tx.execute(
            r#"
            INSERT INTO shift_records
                (record_id, operation_id, machine_code, record_date, shift,
                 operator, quantity, minutes_per_unit, setup_minutes, archived, created_at)
            SELECT ?1, ?2, ?3, ?4, 'DAY', NULL, 0, NULL, 0, 0, ?5
            WHERE NOT EXISTS (
                SELECT 1 FROM shift_records
                WHERE operation_id = ?2 AND machine_code = ?3
                  AND record_date = ?4 AND archived = 0
            )
            "#,
            params![
                Uuid::new_v4().to_string(),
                operation_id,
                machine_code,
                today.format("%Y-%m-%d").to_string(),
                now_text,
            ],
        )?;

        tx.commit().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e))
        })?;
        Ok(())
    }

    /// 撤派事务: 工序退回 PENDING，占用的机台归还
    pub fn release_assignment(&self, operation_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let now_text = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let tx = conn.transaction().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("开启事务失败: {}", e))
        })?;

        tx.execute(
            r#"
            UPDATE machines
            SET is_occupied = 0, current_operation_id = NULL, updated_at = ?1
            WHERE current_operation_id = ?2
            "#,
            params![now_text, operation_id],
        )?;
        let updated = tx.execute(
            r#"
            UPDATE operations
            SET status = 'PENDING', assigned_machine_code = NULL,
                assigned_at = NULL, updated_at = ?1
            WHERE operation_id = ?2
            "#,
            params![now_text, operation_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            });
        }

        tx.commit().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e))
        })?;
        Ok(())
    }

    /// 完工事务: 工序置 COMPLETED 并归还机台
    pub fn complete_and_release(
        &self,
        operation_id: &str,
        total_produced: i64,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let now_text = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let tx = conn.transaction().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("开启事务失败: {}", e))
        })?;

        let updated = tx.execute(
            r#"
            UPDATE operations
            SET status = 'COMPLETED', completed_quantity = ?1, updated_at = ?2
            WHERE operation_id = ?3
            "#,
            params![total_produced, now_text, operation_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            });
        }
        tx.execute(
            r#"
            UPDATE machines
            SET is_occupied = 0, current_operation_id = NULL, updated_at = ?1
            WHERE current_operation_id = ?2
            "#,
            params![now_text, operation_id],
        )?;

        tx.commit().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e))
        })?;
        Ok(())
    }

    /// 刷新累计完成数量，必要时同步状态（进度对账使用）
    pub fn update_progress(
        &self,
        operation_id: &str,
        total_produced: i64,
        new_status: Option<OperationStatus>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now_text = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let updated = match new_status {
            Some(status) => conn.execute(
                r#"
                UPDATE operations
                SET completed_quantity = ?1, status = ?2, updated_at = ?3
                WHERE operation_id = ?4
                "#,
                params![total_produced, status.to_db_str(), now_text, operation_id],
            )?,
            None => conn.execute(
                r#"
                UPDATE operations
                SET completed_quantity = ?1, updated_at = ?2
                WHERE operation_id = ?3
                "#,
                params![total_produced, now_text, operation_id],
            )?,
        };
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Operation".to_string(),
                id: operation_id.to_string(),
            });
        }
        Ok(())
    }
}
