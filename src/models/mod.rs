//! 数据模型模块
//! 审计事件、查询条件与统计结果

pub mod audit;
pub mod event;
pub mod filters;
pub mod session;
pub mod stats;

pub use audit::*;
pub use event::*;
pub use filters::*;
pub use session::*;
pub use stats::*;
