// ==========================================
// 机加工车间排产系统 - 报工记录仓储
// ==========================================
// 职责: shift_records 表的建表与读写
// 约定: 业务键为 (工序, 机台, 日期, 班次)，同键再报按覆盖处理；
//       归档记录只读，不参与累计与覆盖
// ==========================================

use crate::domain::types::ShiftKind;
use crate::domain::ShiftProductionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 报工记录仓储
pub struct ShiftRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShiftRecordRepository {
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
            CREATE TABLE IF NOT EXISTS shift_records (
                record_id        TEXT PRIMARY KEY,
                operation_id     TEXT NOT NULL,
                machine_code     TEXT NOT NULL,
                record_date      TEXT NOT NULL,
                shift            TEXT NOT NULL,
                operator         TEXT,
                quantity         INTEGER NOT NULL DEFAULT 0,
                minutes_per_unit REAL,
                setup_minutes    INTEGER NOT NULL DEFAULT 0,
                archived         INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_shift_records_operation
                ON shift_records(operation_id, archived);
            CREATE INDEX IF NOT EXISTS idx_shift_records_key
                ON shift_records(operation_id, machine_code, record_date, shift);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<ShiftProductionRecord> {
        let shift_raw: String = row.get("shift")?;
        let shift = ShiftKind::from_db_str(&shift_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("无法识别的班次: {}", shift_raw).into(),
            )
        })?;
        Ok(ShiftProductionRecord {
            record_id: row.get("record_id")?,
            operation_id: row.get("operation_id")?,
            machine_code: row.get("machine_code")?,
            record_date: row.get::<_, NaiveDate>("record_date")?,
            shift,
            operator: row.get("operator")?,
            quantity: row.get("quantity")?,
            minutes_per_unit: row.get("minutes_per_unit")?,
            setup_minutes: row.get("setup_minutes")?,
            archived: row.get("archived")?,
            created_at: row.get::<_, NaiveDateTime>("created_at")?,
        })
    }

    /// 直接写入一条记录（测试数据准备使用）
    pub fn insert(&self, record: &ShiftProductionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO shift_records
                (record_id, operation_id, machine_code, record_date, shift,
                 operator, quantity, minutes_per_unit, setup_minutes, archived, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.record_id,
                record.operation_id,
                record.machine_code,
                record.record_date.format("%Y-%m-%d").to_string(),
                record.shift.to_db_str(),
                record.operator,
                record.quantity,
                record.minutes_per_unit,
                record.setup_minutes,
                record.archived,
                record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 按业务键报工: 同键的非归档记录存在则覆盖数量等字段，否则新建
    #[allow(clippy::too_many_arguments)]
    pub fn record_quantity(
        &self,
        operation_id: &str,
        machine_code: &str,
        record_date: NaiveDate,
        shift: ShiftKind,
        quantity: i64,
        operator: Option<&str>,
        minutes_per_unit: Option<f64>,
        setup_minutes: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let date_text = record_date.format("%Y-%m-%d").to_string();
        let updated = conn.execute(
            r#"
            UPDATE shift_records
            SET quantity = ?1, operator = ?2, minutes_per_unit = ?3, setup_minutes = ?4
            WHERE operation_id = ?5 AND machine_code = ?6
              AND record_date = ?7 AND shift = ?8 AND archived = 0
            "#,
            params![
                quantity,
                operator,
                minutes_per_unit,
                setup_minutes,
                operation_id,
                machine_code,
                date_text,
                shift.to_db_str(),
            ],
        )?;
        if updated == 0 {
            conn.execute(
                r#"
                INSERT INTO shift_records
                    (record_id, operation_id, machine_code, record_date, shift,
                     operator, quantity, minutes_per_unit, setup_minutes, archived, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    operation_id,
                    machine_code,
                    date_text,
                    shift.to_db_str(),
                    operator,
                    quantity,
                    minutes_per_unit,
                    setup_minutes,
                    chrono::Local::now()
                        .naive_local()
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ],
            )?;
        }
        Ok(())
    }

    /// 工序的报工记录，按日期与班次排序
    pub fn list_for_operation(
        &self,
        operation_id: &str,
        include_archived: bool,
    ) -> RepositoryResult<Vec<ShiftProductionRecord>> {
        let conn = self.get_conn()?;
        let sql = if include_archived {
            "SELECT * FROM shift_records WHERE operation_id = ?1 \
             ORDER BY record_date ASC, shift ASC, created_at ASC"
        } else {
            "SELECT * FROM shift_records WHERE operation_id = ?1 AND archived = 0 \
             ORDER BY record_date ASC, shift ASC, created_at ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![operation_id], Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// 工序非归档报工数量合计（进度对账的输入）
    pub fn sum_quantity(&self, operation_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM shift_records \
             WHERE operation_id = ?1 AND archived = 0",
            params![operation_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// 归档一条记录，归档后不再计入累计
    pub fn archive(&self, record_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE shift_records SET archived = 1 WHERE record_id = ?1",
            params![record_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ShiftProductionRecord".to_string(),
                id: record_id.to_string(),
            });
        }
        Ok(())
    }
}
