//! 健康监控核心集成测试

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use vitals_doctor::health::PENDING_MESSAGE;
use vitals_doctor::{Check, CheckContext, CheckError, CheckResult, Doctor, RegisterError, CAPACITY};

async fn ok_check(_ctx: CheckContext) -> CheckResult {
    Ok(())
}

async fn boom_check(_ctx: CheckContext) -> CheckResult {
    Err(CheckError::failed("boom"))
}

async fn stuck_check(_ctx: CheckContext) -> CheckResult {
    std::future::pending::<()>().await;
    Ok(())
}

fn new_doctor() -> Doctor {
    Doctor::new(CancellationToken::new())
}

/// 可切换结果的检查
fn toggle_check(name: &str, healthy: Arc<AtomicBool>) -> Check {
    Check::new(name, move |_ctx: CheckContext| {
        let healthy = healthy.load(Ordering::SeqCst);
        async move {
            if healthy {
                CheckResult::Ok(())
            } else {
                CheckResult::Err(CheckError::failed("toggled off"))
            }
        }
    })
    .with_interval(Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn test_capacity_boundary() {
    let doctor = new_doctor();
    for i in 0..CAPACITY {
        doctor
            .register(Check::new(format!("check-{i}"), ok_check).with_interval(Duration::from_secs(3600)))
            .unwrap();
    }
    assert_eq!(doctor.len(), 64);

    let err = doctor
        .register(Check::new("one-too-many", ok_check))
        .unwrap_err();
    assert_eq!(err, RegisterError::CapacityExceeded { capacity: 64 });
    assert_eq!(err.to_string(), "health-check threshold (64) exceeded");
    assert_eq!(doctor.len(), 64);
    assert!(!doctor.failing_checks().contains_key("one-too-many"));

    sleep(Duration::from_millis(10)).await;
    assert!(doctor.is_healthy());
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_doctor_is_healthy() {
    let doctor = new_doctor();
    assert!(doctor.is_healthy());
    assert!(doctor.failing_checks().is_empty());
    assert!(doctor.report().is_healthy());
}

#[tokio::test(start_paused = true)]
async fn test_pending_before_first_result() {
    let doctor = new_doctor();
    doctor
        .register(Check::new("slow", stuck_check).with_timeout(Duration::from_secs(60)))
        .unwrap();

    // 注册后立即查询：尚无结果
    assert!(!doctor.is_healthy());
    assert_eq!(doctor.failing_checks()["slow"], PENDING_MESSAGE);

    // 超时前仍为待定状态
    sleep(Duration::from_secs(30)).await;
    assert_eq!(doctor.failing_checks()["slow"], "[n/a]");
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_healthy_after_first_cycle() {
    let doctor = new_doctor();
    let check = Check::new("db", ok_check)
        .with_interval(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(1));
    doctor.register(check).unwrap();

    sleep(Duration::from_secs(6)).await;
    assert!(doctor.is_healthy());
    assert!(doctor.failing_checks().is_empty());
    assert_eq!(doctor.status().bits(), 0);

    // 检查持续成功时保持健康
    for _ in 0..4 {
        sleep(Duration::from_secs(5)).await;
        assert!(doctor.is_healthy());
        assert!(doctor.failing_checks().is_empty());
    }
    assert_eq!(doctor.checks()[0].consecutive_failures, 0);
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failure_message_reported() {
    let doctor = new_doctor();
    doctor.register(Check::new("db", boom_check)).unwrap();
    doctor.register(Check::new("cache", ok_check)).unwrap();

    sleep(Duration::from_millis(100)).await;
    assert!(!doctor.is_healthy());

    let failing = doctor.failing_checks();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing["db"], "boom");

    let report = serde_json::to_value(doctor.report()).unwrap();
    assert_eq!(
        report,
        serde_json::json!({"status": "down", "errors": {"db": "boom"}})
    );
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stuck_check_does_not_block_others() {
    let doctor = new_doctor();
    let calls = Arc::new(AtomicUsize::new(0));

    doctor
        .register(Check::new("stuck", stuck_check).with_timeout(Duration::from_secs(2)))
        .unwrap();
    let counter = Arc::clone(&calls);
    doctor
        .register(
            Check::new("fast", move |_ctx: CheckContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { CheckResult::Ok(()) }
            })
            .with_interval(Duration::from_millis(500)),
        )
        .unwrap();

    sleep(Duration::from_millis(1600)).await;
    assert!(calls.load(Ordering::SeqCst) >= 3);
    assert!(!doctor.status().is_failing(1));
    assert_eq!(doctor.failing_checks()["stuck"], PENDING_MESSAGE);

    // 超时后被标记为失败
    sleep(Duration::from_secs(1)).await;
    assert_eq!(doctor.failing_checks()["stuck"], "timeout after 2s");
    assert_eq!(doctor.failing_checks().len(), 1);
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_toggle_changes_only_own_bit() {
    let doctor = new_doctor();
    let flag = Arc::new(AtomicBool::new(true));

    doctor.register(Check::new("a", ok_check)).unwrap();
    doctor.register(toggle_check("b", Arc::clone(&flag))).unwrap();
    doctor.register(Check::new("c", ok_check)).unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(doctor.status().bits(), 0);

    flag.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(doctor.status().bits(), 0b010);
    assert_eq!(doctor.failing_checks()["b"], "toggled off");

    flag.store(true, Ordering::SeqCst);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(doctor.status().bits(), 0);
    assert!(doctor.is_healthy());
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_aspect_rewrites_result() {
    let doctor = new_doctor();
    let check = Check::new("optional", boom_check).with_aspect(
        |_check: &Check, result: CheckResult| match result {
            Err(CheckError::Failed(_)) => Ok(()),
            other => other,
        },
    );
    doctor.register(check).unwrap();

    sleep(Duration::from_millis(100)).await;
    assert!(doctor.is_healthy());
    doctor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_scheduling() {
    let doctor = new_doctor();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    doctor
        .register(
            Check::new("counted", move |_ctx: CheckContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { CheckResult::Ok(()) }
            })
            .with_interval(Duration::from_secs(1)),
        )
        .unwrap();

    sleep(Duration::from_millis(2500)).await;
    doctor.shutdown().await;
    let after_shutdown = calls.load(Ordering::SeqCst);
    assert_eq!(after_shutdown, 3);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_shutdown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_positions() {
    let doctor = Arc::new(new_doctor());
    let n = 48;

    let tasks: Vec<_> = (0..n)
        .map(|i| {
            let doctor = Arc::clone(&doctor);
            tokio::spawn(async move {
                doctor.register(
                    Check::new(format!("check-{i}"), ok_check)
                        .with_interval(Duration::from_secs(3600)),
                )
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let positions: HashSet<usize> = doctor.checks().iter().map(|s| s.position).collect();
    assert_eq!(doctor.len(), n);
    assert_eq!(positions, (0..n).collect::<HashSet<_>>());
    doctor.shutdown().await;
}

#[test]
fn test_register_outside_runtime() {
    let doctor = new_doctor();
    let err = doctor.register(Check::new("db", ok_check)).unwrap_err();
    assert!(matches!(err, RegisterError::NoRuntime(_)));
    assert!(doctor.is_empty());
    assert!(doctor.is_healthy());
}
