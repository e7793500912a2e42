//! 健康检测模块
//!
//! 提供检查注册、并发调度、单检查状态跟踪以及基于位掩码的健康聚合

pub mod check;
pub mod doctor;
pub mod probes;
pub mod registry;
pub mod runner;
pub mod state;
pub mod status;

// 重新导出主要类型
pub use check::{Aspect, Check, CheckContext, CheckHandler, CheckResult, Identity};
pub use doctor::{Doctor, HealthReport, HealthStatus};
pub use probes::{HttpProbe, TcpProbe};
pub use registry::Registry;
pub use runner::{run_once, Runner};
pub use state::{CheckSnapshot, CheckState, PENDING_MESSAGE};
pub use status::{StatusMask, CAPACITY};
