pub fn prettyprint_usize(x: usize) -> String {
    let num = format!("{}", x);
    let mut result = String::new();
    let mut i = num.len();
    for c in num.chars() {
        result.push(c);
        i -= 1;
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
    }
    result
}

/// Human-readable byte counts, for memory accounting.
pub fn prettyprint_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let kb = (bytes as f64) / 1024.0;
    if kb < 1024.0 {
        return format!("{:.1} KiB", kb);
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        return format!("{:.1} MiB", mb);
    }
    format!("{:.1} GiB", mb / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas() {
        assert_eq!(prettyprint_usize(0), "0");
        assert_eq!(prettyprint_usize(999), "999");
        assert_eq!(prettyprint_usize(1000), "1,000");
        assert_eq!(prettyprint_usize(1234567), "1,234,567");
    }

    #[test]
    fn bytes() {
        assert_eq!(prettyprint_bytes(12), "12 bytes");
        assert_eq!(prettyprint_bytes(2048), "2.0 KiB");
        assert_eq!(prettyprint_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
