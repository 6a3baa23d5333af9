//! 通知模块
//!
//! - [`compose`] - 消息文本与 WhatsApp 深链
//! - [`dispatcher`] - 单用户通知、广播、收件箱

pub mod compose;
pub mod dispatcher;

pub use compose::OutboundMessage;
pub use dispatcher::{NotificationDispatcher, NotifyPort};
