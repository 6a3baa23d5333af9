//! 出站消息文本
//!
//! 只负责拼装文本与 WhatsApp 深链，投递由外部完成。

use shared::models::{ItemType, Order};
use shared::status::Status;

/// 一条待发送的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub title: String,
    pub message: String,
}

impl OutboundMessage {
    fn new(title: &str, message: String) -> Self {
        Self {
            title: title.to_string(),
            message,
        }
    }
}

pub fn order_status(ref_code: &str, status: Status, tracking_id: Option<&str>) -> OutboundMessage {
    let mut message = format!("Your order {} is now {}.", ref_code, status);
    if let Some(tracking_id) = tracking_id {
        message.push_str(&format!(" Tracking ID: {}.", tracking_id));
    }
    OutboundMessage::new("Order Update", message)
}

pub fn procurement_status(item_name: &str, status: Status, tracking_id: Option<&str>) -> OutboundMessage {
    let mut message = format!("Your procurement request for {} is now {}.", item_name, status);
    if let Some(tracking_id) = tracking_id {
        message.push_str(&format!(" Tracking ID: {}.", tracking_id));
    }
    OutboundMessage::new("Procurement Update", message)
}

pub fn shipment_status(tracking_id: &str, status: Status, location: Option<&str>) -> OutboundMessage {
    let message = match location {
        Some(location) => format!("Shipment {} is now {} at {}.", tracking_id, status, location),
        None => format!("Shipment {} is now {}.", tracking_id, status),
    };
    OutboundMessage::new("Shipment Update", message)
}

pub fn shipment_created(tracking_id: &str) -> OutboundMessage {
    OutboundMessage::new(
        "Shipment Created",
        format!("A shipment with tracking ID {} has been created for you.", tracking_id),
    )
}

pub fn item_received(item_type: ItemType, label: &str) -> OutboundMessage {
    let what = match item_type {
        ItemType::Shop => "order",
        ItemType::Procurement => "procurement item",
    };
    OutboundMessage::new(
        "Item Received",
        format!("Your {} {} has arrived at our warehouse.", what, label),
    )
}

pub fn consolidated(tracking_id: &str, item_count: usize) -> OutboundMessage {
    OutboundMessage::new(
        "Consolidated Shipment Created",
        format!("{} items were consolidated into shipment {}.", item_count, tracking_id),
    )
}

/// 结账确认文本（WhatsApp 预填）
pub fn checkout_text(order: &Order) -> String {
    let mut text = format!("Hello MQM, I would like to confirm order {}.\n", order.ref_code);
    for item in &order.items {
        text.push_str(&format!("- {} x {} ({:.2})\n", item.quantity, item.name, item.line_total()));
    }
    text.push_str(&format!("Total: {:.2}\nName: {}", order.total_amount, order.customer_name));
    text
}

/// `https://wa.me/{digits}?text={urlencoded}`，号码中没有数字时返回 None
pub fn whatsapp_link(number: &str, text: &str) -> Option<String> {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("https://wa.me/{}?text={}", digits, urlencoding::encode(text)))
}
