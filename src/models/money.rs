//! VND amount formatting

/// Currency unit appended to formatted amounts
pub const VND_UNIT: &str = "VNĐ";

/// Format an amount the way vi-VN displays it: `50000` becomes `"50.000 VNĐ"`.
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{} {}", sign, grouped, VND_UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vnd() {
        assert_eq!(format_vnd(0), "0 VNĐ");
        assert_eq!(format_vnd(999), "999 VNĐ");
        assert_eq!(format_vnd(10_000), "10.000 VNĐ");
        assert_eq!(format_vnd(50_000), "50.000 VNĐ");
        assert_eq!(format_vnd(1_234_567), "1.234.567 VNĐ");
    }

    #[test]
    fn test_format_vnd_negative() {
        assert_eq!(format_vnd(-120_000), "-120.000 VNĐ");
    }
}
