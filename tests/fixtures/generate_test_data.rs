// ==========================================
// 演示数据生成器
// ==========================================
// 用途: 生成一套可直接排产演练的车间数据库
//       (两类机台多轴数、多工序订单、在制占台与班次实绩)
// 输出: 默认 tests/fixtures/demo_shop.db，可用第一个参数改路径
// 运行: cargo run --bin generate_test_data [db路径]
// ==========================================

use chrono::{Local, NaiveDate, NaiveDateTime};
use machine_shop_aps::config::{config_keys, ConfigManager};
use machine_shop_aps::db;
use machine_shop_aps::domain::types::{MachineKind, OperationKind, OperationStatus, ShiftKind};
use machine_shop_aps::domain::{Machine, Operation, Order};
use machine_shop_aps::engine::{ScheduleRepositories, WorkCalendar};
use std::env;
use std::error::Error;
use std::sync::{Arc, Mutex};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn machine(code: &str, kind: MachineKind, axes: i64, is_active: bool) -> Machine {
    Machine {
        machine_id: format!("DEMO-M-{}", code),
        code: code.to_string(),
        kind,
        axes,
        is_active,
        is_occupied: false,
        current_operation_id: None,
        created_at: now(),
        updated_at: now(),
    }
}

fn order(
    order_id: &str,
    drawing_number: &str,
    quantity: i64,
    priority: i64,
    deadline: NaiveDate,
    work_type: &str,
) -> Order {
    Order {
        order_id: order_id.to_string(),
        drawing_number: drawing_number.to_string(),
        quantity,
        deadline,
        priority,
        work_type: Some(work_type.to_string()),
        created_at: now(),
        updated_at: now(),
    }
}

fn operation(
    operation_id: &str,
    order_id: &str,
    seq_no: i64,
    kind: OperationKind,
    minutes_per_unit: f64,
) -> Operation {
    Operation {
        operation_id: operation_id.to_string(),
        order_id: order_id.to_string(),
        seq_no,
        kind,
        required_axes: None,
        estimated_minutes: 0,
        minutes_per_unit: Some(minutes_per_unit),
        status: OperationStatus::Pending,
        assigned_machine_code: None,
        assigned_at: None,
        completed_quantity: 0,
        created_at: now(),
        updated_at: now(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/demo_shop.db".to_string());
    println!("开始生成演示车间数据库: {}", db_path);

    let conn = Arc::new(Mutex::new(db::open_sqlite_connection(&db_path)?));
    let repos = ScheduleRepositories::from_connection(conn.clone())?;
    let config = ConfigManager::from_connection(conn)?;
    let calendar = WorkCalendar::new();
    let today = Local::now().date_naive();

    // 1. 机台台账
    seed_machines(&repos)?;

    // 2. 订单与工序
    seed_orders(&repos, &calendar, today)?;

    // 3. 在制现场: 完工历史、派工占台与班次实绩
    seed_work_in_progress(&repos, today)?;

    // 4. 排产参数
    seed_config(&config)?;

    print_summary(&repos, &config, &calendar, today)?;
    println!("✓ 演示车间数据库生成完成！");
    Ok(())
}

/// 两类机台、三档轴数，外加一台大修停用的铣床
fn seed_machines(repos: &ScheduleRepositories) -> Result<(), Box<dyn Error>> {
    let machines = [
        machine("MILL-01", MachineKind::Milling, 3, true),
        machine("MILL-02", MachineKind::Milling, 4, true),
        machine("MILL-03", MachineKind::Milling, 5, true),
        machine("TURN-01", MachineKind::Turning, 0, true),
        machine("TURN-02", MachineKind::Turning, 0, true),
        machine("MILL-90", MachineKind::Milling, 3, false), // 大修停用
    ];
    for m in &machines {
        repos.machines().upsert(m)?;
    }
    println!("✓ 机台台账 {} 台 (含1台停用)", machines.len());
    Ok(())
}

/// 五笔订单覆盖常见工艺路线与优先级分布
///
/// 交期用工作日历向后推，避免落在停工日上。
fn seed_orders(
    repos: &ScheduleRepositories,
    calendar: &WorkCalendar,
    today: NaiveDate,
) -> Result<(), Box<dyn Error>> {
    // DEMO-O-101: 批产件，铣 -> 车 -> 磨 三道工序
    repos.orders().upsert(&order(
        "DEMO-O-101",
        "DWG-2403-101",
        30,
        1,
        calendar.add_working_days(today, 5),
        "批产",
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-101-1",
        "DEMO-O-101",
        1,
        OperationKind::Milling,
        6.0,
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-101-2",
        "DEMO-O-101",
        2,
        OperationKind::Turning,
        4.0,
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-101-3",
        "DEMO-O-101",
        3,
        OperationKind::Grinding,
        2.0,
    ))?;

    // DEMO-O-102: 高轴数铣削件，只有四轴及以上可接
    repos.orders().upsert(&order(
        "DEMO-O-102",
        "DWG-2403-102",
        12,
        1,
        calendar.add_working_days(today, 8),
        "批产",
    ))?;
    let mut high_axes = operation(
        "DEMO-OP-102-1",
        "DEMO-O-102",
        1,
        OperationKind::Milling,
        15.0,
    );
    high_axes.required_axes = Some(4);
    repos.operations().upsert(&high_axes)?;

    // DEMO-O-103: 车削 + 钻孔两道
    repos.orders().upsert(&order(
        "DEMO-O-103",
        "DWG-2403-103",
        45,
        2,
        calendar.add_working_days(today, 10),
        "批产",
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-103-1",
        "DEMO-O-103",
        1,
        OperationKind::Turning,
        3.0,
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-103-2",
        "DEMO-O-103",
        2,
        OperationKind::Drilling,
        1.5,
    ))?;

    // DEMO-O-104: 试制件，总工时已估定，外加一道未识别工艺
    repos.orders().upsert(&order(
        "DEMO-O-104",
        "DWG-2403-104",
        8,
        3,
        calendar.add_working_days(today, 12),
        "试制",
    ))?;
    let mut estimated = operation(
        "DEMO-OP-104-1",
        "DEMO-O-104",
        1,
        OperationKind::Milling,
        0.0,
    );
    estimated.estimated_minutes = 240;
    estimated.minutes_per_unit = None;
    repos.operations().upsert(&estimated)?;
    repos.operations().upsert(&operation(
        "DEMO-OP-104-2",
        "DEMO-O-104",
        2,
        OperationKind::Unknown("激光打标".to_string()),
        1.0,
    ))?;

    // DEMO-O-105: 低优先级，默认截止秩 3 之外，排产默认不取
    repos.orders().upsert(&order(
        "DEMO-O-105",
        "DWG-2403-105",
        20,
        4,
        calendar.add_working_days(today, 20),
        "备库",
    ))?;
    repos.operations().upsert(&operation(
        "DEMO-OP-105-1",
        "DEMO-O-105",
        1,
        OperationKind::Turning,
        5.0,
    ))?;

    println!("✓ 订单 5 笔 / 工序 9 道");
    Ok(())
}

/// 铺一段在制现场: 101 首道已完工，103 首道在 TURN-01 上在制
fn seed_work_in_progress(
    repos: &ScheduleRepositories,
    today: NaiveDate,
) -> Result<(), Box<dyn Error>> {
    // DEMO-OP-101-1: 白班18 + 夜班12 达标完工，机台早已归还
    repos.operations().commit_assignment("DEMO-OP-101-1", "MILL-01", today)?;
    repos.shift_records().record_quantity(
        "DEMO-OP-101-1",
        "MILL-01",
        today,
        ShiftKind::Day,
        18,
        Some("王师傅"),
        Some(6.2),
        60,
    )?;
    repos.shift_records().record_quantity(
        "DEMO-OP-101-1",
        "MILL-01",
        today,
        ShiftKind::Night,
        12,
        Some("赵师傅"),
        Some(5.8),
        0,
    )?;
    repos.operations().complete_and_release("DEMO-OP-101-1", 30)?;

    // DEMO-OP-103-1: 已派工 TURN-01，白班报了15件，仍在制占台
    repos.operations().commit_assignment("DEMO-OP-103-1", "TURN-01", today)?;
    repos.shift_records().record_quantity(
        "DEMO-OP-103-1",
        "TURN-01",
        today,
        ShiftKind::Day,
        15,
        Some("李师傅"),
        Some(3.1),
        45,
    )?;

    println!("✓ 在制现场: 1 道完工 + 1 道在制占台 + 班次实绩 3 条");
    Ok(())
}

/// 排产参数覆写，其余键走默认值
fn seed_config(config: &ConfigManager) -> Result<(), Box<dyn Error>> {
    config.set_global_config_value(config_keys::SETUP_MINUTES, "45")?;
    config.set_global_config_value(config_keys::BUFFER_PERCENT, "10")?;
    println!("✓ 排产参数覆写 2 项");
    Ok(())
}

fn print_summary(
    repos: &ScheduleRepositories,
    config: &ConfigManager,
    calendar: &WorkCalendar,
    today: NaiveDate,
) -> Result<(), Box<dyn Error>> {
    let orders = repos.orders().list_all()?;
    let machines = repos.machines().list(false, false)?;
    let available = repos.machines().list(false, true)?;

    println!("--- 演示现场汇总 ---");
    println!(
        "订单 {} 笔 / 机台 {} 台 (当前空闲 {} 台)",
        orders.len(),
        machines.len(),
        available.len()
    );
    if let Some(tightest) = orders.iter().map(|o| o.deadline).min() {
        println!(
            "最紧交期 {} (今天起含 {} 个工作日)",
            tightest,
            calendar.count_working_days(today, tightest)
        );
    }
    println!("配置快照: {}", config.get_config_snapshot()?);
    Ok(())
}
