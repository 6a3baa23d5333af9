//! 状态词汇表与进度推导
//!
//! 订单 / 代购请求与运单共用一个 [`Status`] 枚举：同步生成的运单会直接继承
//! 订单状态（例如 `Processing`），所以两套词汇必须能在同一列中共存。
//!
//! ```text
//! 订单 / 代购:  Pending → Processing → Shipped → Completed      (+ Cancelled)
//! 运单:        Received → In Transit → Arrived → Cleared
//!              → Out for Delivery → Delivered                   (+ Cancelled)
//! ```
//!
//! 进度百分比只在读取时计算，永不落库。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 统一状态
///
/// 数据库中以标签文本存储（`"In Transit"` 等）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum Status {
    // ═══ 订单 / 代购 ═══
    Pending,
    Processing,
    Shipped,
    Completed,

    // ═══ 运单 ═══
    Received,
    #[serde(rename = "In Transit")]
    #[cfg_attr(feature = "db", sqlx(rename = "In Transit"))]
    InTransit,
    Arrived,
    Cleared,
    #[serde(rename = "Out for Delivery")]
    #[cfg_attr(feature = "db", sqlx(rename = "Out for Delivery"))]
    OutForDelivery,
    Delivered,

    // ═══ 公共 ═══
    Cancelled,
}

/// 无法识别的状态字符串
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct InvalidStatus(pub String);

impl Status {
    /// 订单 / 代购的规范路径
    pub const ORDER_FLOW: [Status; 4] = [
        Status::Pending,
        Status::Processing,
        Status::Shipped,
        Status::Completed,
    ];

    /// 运单的规范路径
    pub const SHIPMENT_FLOW: [Status; 6] = [
        Status::Received,
        Status::InTransit,
        Status::Arrived,
        Status::Cleared,
        Status::OutForDelivery,
        Status::Delivered,
    ];

    /// 存储 / 展示用标签
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Processing => "Processing",
            Status::Shipped => "Shipped",
            Status::Completed => "Completed",
            Status::Received => "Received",
            Status::InTransit => "In Transit",
            Status::Arrived => "Arrived",
            Status::Cleared => "Cleared",
            Status::OutForDelivery => "Out for Delivery",
            Status::Delivered => "Delivered",
            Status::Cancelled => "Cancelled",
        }
    }

    /// 终态：Completed / Delivered / Cancelled
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Completed | Status::Delivered | Status::Cancelled
        )
    }

    /// 是否属于订单 / 代购词汇
    pub fn is_order_status(&self) -> bool {
        *self == Status::Cancelled || Self::ORDER_FLOW.contains(self)
    }

    /// 是否属于运单词汇
    pub fn is_shipment_status(&self) -> bool {
        *self == Status::Cancelled || Self::SHIPMENT_FLOW.contains(self)
    }

    /// 同步生成运单时的初始状态：Pending 推进为 Processing，其余原样透传
    pub const fn for_synced_shipment(self) -> Status {
        match self {
            Status::Pending => Status::Processing,
            other => other,
        }
    }
}

/// 展示进度（0..=100），沿两条规范路径单调不减
pub const fn progress(status: Status) -> u8 {
    match status {
        Status::Cancelled => 0,
        Status::Pending => 10,
        Status::Received => 20,
        Status::Processing => 30,
        Status::Shipped => 50,
        Status::InTransit => 60,
        Status::Arrived => 90,
        Status::Cleared => 94,
        Status::OutForDelivery => 97,
        Status::Delivered | Status::Completed => 100,
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pending" => Ok(Status::Pending),
            "Processing" => Ok(Status::Processing),
            "Shipped" => Ok(Status::Shipped),
            "Completed" => Ok(Status::Completed),
            "Received" => Ok(Status::Received),
            "In Transit" => Ok(Status::InTransit),
            "Arrived" => Ok(Status::Arrived),
            "Cleared" => Ok(Status::Cleared),
            "Out for Delivery" => Ok(Status::OutForDelivery),
            "Delivered" => Ok(Status::Delivered),
            "Cancelled" => Ok(Status::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_monotonic_along_shipment_flow() {
        let values: Vec<u8> = Status::SHIPMENT_FLOW.iter().map(|s| progress(*s)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert_eq!(progress(Status::Delivered), 100);
    }

    #[test]
    fn test_progress_monotonic_along_order_flow() {
        let values: Vec<u8> = Status::ORDER_FLOW.iter().map(|s| progress(*s)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
    }

    #[test]
    fn test_progress_anchor_values() {
        assert_eq!(progress(Status::Pending), 10);
        assert_eq!(progress(Status::Processing), 30);
        assert_eq!(progress(Status::InTransit), 60);
        assert_eq!(progress(Status::Arrived), 90);
        assert_eq!(progress(Status::Delivered), 100);
    }

    #[test]
    fn test_labels_parse_back() {
        for s in Status::ORDER_FLOW.iter().chain(Status::SHIPMENT_FLOW.iter()) {
            assert_eq!(s.as_str().parse::<Status>(), Ok(*s));
        }
        assert_eq!("Cancelled".parse::<Status>(), Ok(Status::Cancelled));
        assert!("in transit".parse::<Status>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Status::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        let back: Status = serde_json::from_str("\"In Transit\"").unwrap();
        assert_eq!(back, Status::InTransit);
    }

    #[test]
    fn test_synced_shipment_status() {
        assert_eq!(Status::Pending.for_synced_shipment(), Status::Processing);
        assert_eq!(Status::Shipped.for_synced_shipment(), Status::Shipped);
        assert_eq!(Status::Processing.for_synced_shipment(), Status::Processing);
    }

    #[test]
    fn test_vocabulary_membership() {
        assert!(Status::Shipped.is_order_status());
        assert!(!Status::InTransit.is_order_status());
        assert!(Status::Cancelled.is_shipment_status());
        assert!(!Status::Processing.is_shipment_status());
        assert!(Status::Delivered.is_terminal());
        assert!(!Status::Arrived.is_terminal());
    }
}
