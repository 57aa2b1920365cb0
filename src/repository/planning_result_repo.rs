// ==========================================
// 机加工车间排产系统 - 排产结果仓储
// ==========================================
// 职责: planning_results / planning_result_items 两张表的建表与读写
// 红线: 结果快照只追加，历史快照不改写；
//       唯一允许的事后变更是把条目标记为 RESCHEDULED 并记录原因
// ==========================================

use crate::domain::plan::{PlanEntry, PlanningResult, TimeWindow};
use crate::domain::types::{PlanEntryStatus, ShiftKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 排产结果仓储
pub struct PlanningResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanningResultRepository {
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
            CREATE TABLE IF NOT EXISTS planning_results (
                result_id          TEXT PRIMARY KEY,
                calculated_at      TEXT NOT NULL,
                selected_order_ids TEXT NOT NULL,
                total_minutes      INTEGER NOT NULL,
                required_workdays  INTEGER NOT NULL,
                created_at         TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS planning_result_items (
                entry_id          TEXT PRIMARY KEY,
                result_id         TEXT NOT NULL,
                position          INTEGER NOT NULL,
                order_id          TEXT NOT NULL,
                operation_id      TEXT NOT NULL,
                machine_code      TEXT NOT NULL,
                start_time        TEXT NOT NULL,
                end_time          TEXT NOT NULL,
                shift             TEXT NOT NULL,
                status            TEXT NOT NULL,
                reschedule_reason TEXT,
                FOREIGN KEY (result_id) REFERENCES planning_results(result_id)
            );
            CREATE INDEX IF NOT EXISTS idx_plan_items_result
                ON planning_result_items(result_id, position);
            CREATE INDEX IF NOT EXISTS idx_plan_items_operation
                ON planning_result_items(operation_id);
            "#,
        )?;
        Ok(())
    }

    fn map_item_row(row: &Row) -> rusqlite::Result<PlanEntry> {
        let shift_raw: String = row.get("shift")?;
        let shift = ShiftKind::from_db_str(&shift_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("无法识别的班次: {}", shift_raw).into(),
            )
        })?;
        let status_raw: String = row.get("status")?;
        let status = PlanEntryStatus::from_db_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("无法识别的计划条目状态: {}", status_raw).into(),
            )
        })?;
        Ok(PlanEntry {
            entry_id: row.get("entry_id")?,
            result_id: row.get("result_id")?,
            position: row.get("position")?,
            order_id: row.get("order_id")?,
            operation_id: row.get("operation_id")?,
            machine_code: row.get("machine_code")?,
            window: TimeWindow {
                start: row.get::<_, NaiveDateTime>("start_time")?,
                end: row.get::<_, NaiveDateTime>("end_time")?,
                shift,
            },
            status,
            reschedule_reason: row.get("reschedule_reason")?,
        })
    }

    /// 追加一次排产结果快照（头 + 明细同事务落库）
    pub fn append(&self, result: &PlanningResult) -> RepositoryResult<String> {
        let selected_json = serde_json::to_string(&result.selected_order_ids)
            .map_err(|e| RepositoryError::InternalError(format!("序列化入选订单失败: {}", e)))?;
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
            INSERT INTO planning_results
                (result_id, calculated_at, selected_order_ids,
                 total_minutes, required_workdays, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                result.result_id,
                result
                    .calculated_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                selected_json,
                result.total_minutes,
                result.required_workdays,
                now_text,
            ],
        )?;
        for entry in &result.entries {
            tx.execute(
                r#"
                INSERT INTO planning_result_items
                    (entry_id, result_id, position, order_id, operation_id,
                     machine_code, start_time, end_time, shift, status, reschedule_reason)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    entry.entry_id,
                    entry.result_id,
                    entry.position,
                    entry.order_id,
                    entry.operation_id,
                    entry.machine_code,
                    entry.window.start.format("%Y-%m-%d %H:%M:%S").to_string(),
                    entry.window.end.format("%Y-%m-%d %H:%M:%S").to_string(),
                    entry.window.shift.to_db_str(),
                    entry.status.to_db_str(),
                    entry.reschedule_reason,
                ],
            )?;
        }

        tx.commit().map_err(|e| {
            RepositoryError::DatabaseTransactionError(format!("提交事务失败: {}", e))
        })?;
        Ok(result.result_id.clone())
    }

    pub fn find_by_id(&self, result_id: &str) -> RepositoryResult<Option<PlanningResult>> {
        let conn = self.get_conn()?;
        let header = conn.query_row(
            "SELECT * FROM planning_results WHERE result_id = ?1",
            params![result_id],
            |row| {
                Ok((
                    row.get::<_, String>("result_id")?,
                    row.get::<_, NaiveDateTime>("calculated_at")?,
                    row.get::<_, String>("selected_order_ids")?,
                    row.get::<_, i64>("total_minutes")?,
                    row.get::<_, i64>("required_workdays")?,
                ))
            },
        );
        let (rid, calculated_at, selected_json, total_minutes, required_workdays) = match header {
            Ok(h) => h,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let selected_order_ids: Vec<String> =
            serde_json::from_str(&selected_json).map_err(|e| RepositoryError::FieldValueError {
                field: "selected_order_ids".to_string(),
                message: format!("JSON 解析失败: {}", e),
            })?;

        let mut stmt = conn.prepare(
            "SELECT * FROM planning_result_items WHERE result_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![rid], Self::map_item_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(Some(PlanningResult {
            result_id: rid,
            calculated_at,
            selected_order_ids,
            entries,
            total_minutes,
            required_workdays,
        }))
    }

    /// 最近一次排产结果的标识
    pub fn latest_result_id(&self) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT result_id FROM planning_results \
             ORDER BY calculated_at DESC, created_at DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 指定工序在最近一次快照中的计划条目
    ///
    /// 只看最新快照: 计划与实际的偏差总是相对当前计划判定，
    /// 历史快照里的旧条目不参与对账。
    pub fn latest_item_for_operation(
        &self,
        operation_id: &str,
    ) -> RepositoryResult<Option<PlanEntry>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT i.* FROM planning_result_items i
            JOIN planning_results r ON r.result_id = i.result_id
            WHERE i.operation_id = ?1
            ORDER BY r.calculated_at DESC, r.created_at DESC, i.position ASC
            LIMIT 1
            "#,
            params![operation_id],
            Self::map_item_row,
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 把计划条目标记为 RESCHEDULED 并记录原因
    ///
    /// 已标记过的条目不再改写，返回 false（对账重复跑不重复记）。
    pub fn mark_item_rescheduled(
        &self,
        entry_id: &str,
        reason: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE planning_result_items
            SET status = 'RESCHEDULED', reschedule_reason = ?1
            WHERE entry_id = ?2 AND status != 'RESCHEDULED'
            "#,
            params![reason, entry_id],
        )?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_test_repo() -> PlanningResultRepository {
        let conn = Connection::open_in_memory().unwrap();
        PlanningResultRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn sample_result(calculated_at: NaiveDateTime) -> PlanningResult {
        let mut result = PlanningResult::new(calculated_at);
        let entry = PlanEntry::new(
            result.result_id.clone(),
            1,
            "O-1".to_string(),
            "OP-1".to_string(),
            "CNC-01".to_string(),
            TimeWindow {
                start: at(4, 8),
                end: at(4, 12),
                shift: ShiftKind::Day,
            },
        );
        result.push_entry(entry, 240);
        let entry = PlanEntry::new(
            result.result_id.clone(),
            2,
            "O-1".to_string(),
            "OP-2".to_string(),
            "CNC-02".to_string(),
            TimeWindow {
                start: at(4, 16),
                end: at(4, 20),
                shift: ShiftKind::Night,
            },
        );
        result.push_entry(entry, 240);
        result
    }

    #[test]
    fn test_append_and_find_round_trip() {
        let repo = setup_test_repo();
        let result = sample_result(at(4, 7));
        let id = repo.append(&result).unwrap();

        let loaded = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.selected_order_ids, vec!["O-1".to_string()]);
        assert_eq!(loaded.total_minutes, 480);
        assert_eq!(loaded.required_workdays, 1);
        assert_eq!(loaded.entries[0].window.start, at(4, 8));
        assert_eq!(loaded.entries[1].window.shift, ShiftKind::Night);
        assert_eq!(loaded.entries[0].status, PlanEntryStatus::Planned);
    }

    #[test]
    fn test_latest_item_prefers_newest_snapshot() {
        let repo = setup_test_repo();
        let older = sample_result(at(4, 7));
        repo.append(&older).unwrap();
        let newer = sample_result(at(5, 7));
        repo.append(&newer).unwrap();

        assert_eq!(
            repo.latest_result_id().unwrap().as_deref(),
            Some(newer.result_id.as_str())
        );
        let item = repo.latest_item_for_operation("OP-1").unwrap().unwrap();
        assert_eq!(item.result_id, newer.result_id);

        assert!(repo.latest_item_for_operation("OP-404").unwrap().is_none());
    }

    #[test]
    fn test_mark_rescheduled_once() {
        let repo = setup_test_repo();
        let result = sample_result(at(4, 7));
        repo.append(&result).unwrap();
        let entry_id = result.entries[0].entry_id.clone();

        let marked = repo
            .mark_item_rescheduled(&entry_id, "MACHINE_CHANGED: planned=CNC-01 actual=CNC-03")
            .unwrap();
        assert!(marked);
        // 重复标记返回 false，原因保持首次记录
        let marked_again = repo
            .mark_item_rescheduled(&entry_id, "MACHINE_CHANGED: planned=CNC-01 actual=CNC-04")
            .unwrap();
        assert!(!marked_again);

        let loaded = repo.find_by_id(&result.result_id).unwrap().unwrap();
        assert_eq!(loaded.entries[0].status, PlanEntryStatus::Rescheduled);
        assert_eq!(
            loaded.entries[0].reschedule_reason.as_deref(),
            Some("MACHINE_CHANGED: planned=CNC-01 actual=CNC-03")
        );
        // 其余条目不受影响
        assert_eq!(loaded.entries[1].status, PlanEntryStatus::Planned);
    }
}
