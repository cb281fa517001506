//! Phone number normalization and log masking
//!
//! Every lookup, cache key, and comparison goes through `normalize_phone`
//! first; raw user input never reaches storage.

/// Normalize to bare digits with a leading country code of `7`
///
/// Accepts `+7 (999) 123-45-67`, `89991234567`, and similar local
/// spellings; strips everything but digits and rewrites the Russian-style
/// leading `8` (or a stray `07`) to `7`.
pub fn normalize_phone(phone: &str) -> String {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with('8') {
        digits.replace_range(..1, "7");
    }
    if let Some(rest) = digits.strip_prefix("07") {
        digits = format!("7{}", rest);
    }
    digits
}

/// All but the last four digits starred, for log lines
pub fn mask_phone(phone: &str) -> String {
    let len = phone.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let visible: String = phone.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), visible)
}

/// Vendor half of a MAC starred, device half kept, for log lines
pub fn mask_mac(mac: &str) -> String {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() < 6 {
        return "XX:XX:XX".to_string();
    }
    format!("XX:XX:XX:{}", parts[3..].join(":"))
}
