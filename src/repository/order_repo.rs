// ==========================================
// 机加工车间排产系统 - 订单仓储
// ==========================================
// 职责: orders 表的建表与读写
// 排序约定: 排产取数统一按 priority ASC, deadline ASC, drawing_number ASC
// ==========================================

use crate::domain::Order;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 订单仓储
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
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
            CREATE TABLE IF NOT EXISTS orders (
                order_id        TEXT PRIMARY KEY,
                drawing_number  TEXT NOT NULL UNIQUE,
                quantity        INTEGER NOT NULL,
                deadline        TEXT NOT NULL,
                priority        INTEGER NOT NULL,
                work_type       TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_dispatch
                ON orders(priority, deadline, drawing_number);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<Order> {
        Ok(Order {
            order_id: row.get("order_id")?,
            drawing_number: row.get("drawing_number")?,
            quantity: row.get("quantity")?,
            deadline: row.get::<_, NaiveDate>("deadline")?,
            priority: row.get("priority")?,
            work_type: row.get("work_type")?,
            created_at: row.get::<_, NaiveDateTime>("created_at")?,
            updated_at: row.get::<_, NaiveDateTime>("updated_at")?,
        })
    }

    /// 写入或覆盖一条订单（导入与测试数据准备使用）
    pub fn upsert(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO orders
                (order_id, drawing_number, quantity, deadline, priority, work_type, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(order_id) DO UPDATE SET
                drawing_number = excluded.drawing_number,
                quantity       = excluded.quantity,
                deadline       = excluded.deadline,
                priority       = excluded.priority,
                work_type      = excluded.work_type,
                updated_at     = excluded.updated_at
            "#,
            params![
                order.order_id,
                order.drawing_number,
                order.quantity,
                order.deadline.format("%Y-%m-%d").to_string(),
                order.priority,
                order.work_type,
                order.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                order.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT * FROM orders WHERE order_id = ?1",
            params![order_id],
            Self::map_row,
        );
        match result {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 取优先级不超过截止秩的订单，按排产顺序返回
    ///
    /// 排序三键: 优先级升序、交期升序、图号升序。
    /// 同一输入集重复调用返回完全一致的顺序。
    pub fn list_by_priority_cutoff(&self, max_priority_rank: i64) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM orders
            WHERE priority <= ?1
            ORDER BY priority ASC, deadline ASC, drawing_number ASC
            "#,
        )?;
        let rows = stmt.query_map(params![max_priority_rank], Self::map_row)?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        Ok(orders)
    }

    /// 全量订单，按排产顺序返回（报表与演示数据校验使用）
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM orders ORDER BY priority ASC, deadline ASC, drawing_number ASC",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        Ok(orders)
    }
}
