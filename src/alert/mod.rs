/// 告警系统 (Alert System)
///
/// 跌倒判定之后的两道关口:
/// - Debouncer:  每个接收人的冷却窗口 (客户端与服务端共用同一实现)
/// - Dispatcher: 独立工作线程发起呼叫请求,结果异步回报
pub mod clock;
pub mod debouncer;
pub mod dispatcher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use debouncer::{
    normalize_phone, AlertDebouncer, CooldownState, NotificationState, SharedDebouncer,
};
pub use dispatcher::{
    CallEvent, DispatchOutcome, DispatchReport, Dispatcher, HttpNotifier, Notifier,
};
