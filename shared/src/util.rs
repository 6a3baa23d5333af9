use rand::Rng;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 随机编号（参考号 / 运单号）撞号后的最大尝试次数
pub const MAX_ID_ATTEMPTS: usize = 10;

/// 订单参考号：`REF-` + 4 位随机数字 + `-MQM`
///
/// 不保证唯一，冲突时由调用方换一个随机值重试。
pub fn generate_ref_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("REF-{:04}-MQM", n)
}

/// 运单号：`TRK-` + 6 位随机数字
///
/// 不保证唯一，冲突时由调用方换一个随机值重试。
pub fn generate_tracking_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("TRK-{:06}", n)
}

/// Check the `REF-####-MQM` shape
pub fn is_ref_code(value: &str) -> bool {
    value.len() == 12
        && value.starts_with("REF-")
        && value.ends_with("-MQM")
        && value[4..8].bytes().all(|b| b.is_ascii_digit())
}

/// Check the `TRK-######` shape of generated tracking ids
pub fn is_generated_tracking_id(value: &str) -> bool {
    value.len() == 10 && value.starts_with("TRK-") && value[4..].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ref_code_shape() {
        for _ in 0..200 {
            let code = generate_ref_code();
            assert!(is_ref_code(&code), "bad ref code {}", code);
        }
        assert!(is_ref_code("REF-1234-MQM"));
        assert!(!is_ref_code("REF-12a4-MQM"));
        assert!(!is_ref_code("REF-1234-XYZ"));
    }

    #[test]
    fn test_generated_tracking_id_shape() {
        for _ in 0..200 {
            let id = generate_tracking_id();
            assert!(is_generated_tracking_id(&id), "bad tracking id {}", id);
        }
        assert!(is_generated_tracking_id("TRK-000555"));
        assert!(!is_generated_tracking_id("TRK-55"));
    }
}
