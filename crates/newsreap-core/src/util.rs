//! Shared utilities
//!
//! Small helpers used across the core: human-readable byte sizes and a
//! hexdump renderer for content inspection.

/// Multipliers accepted by [`strsize_to_bytes`], largest unit first.
const UNITS: [(&str, u64); 8] = [
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("T", 1 << 40),
    ("G", 1 << 30),
    ("M", 1 << 20),
    ("K", 1 << 10),
];

/// Parse a human-readable size such as `512K`, `25MB` or `1048576` into a
/// byte count. Returns `None` for anything unparseable or zero-length.
pub fn strsize_to_bytes(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let upper = value.to_ascii_uppercase();
    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|d| (d, *mult)))
        .unwrap_or((upper.as_str(), 1));

    let digits = digits.trim().strip_suffix('B').unwrap_or(digits.trim());
    digits.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

/// Render a byte count with a binary unit suffix, e.g. `1.00MB`.
pub fn bytes_to_strsize(bytes: u64) -> String {
    for (suffix, mult) in [("TB", 1u64 << 40), ("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10)] {
        if bytes >= mult {
            return format!("{:.2}{}", bytes as f64 / mult as f64, suffix);
        }
    }
    format!("{bytes}B")
}

/// Render a classic 16-bytes-per-row hex dump with an ASCII gutter.
pub fn hexdump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4);
    for (row, chunk) in data.chunks(16).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{:08x}  ", row * 16));
        for col in 0..16 {
            match chunk.get(col) {
                Some(b) => out.push_str(&format!("{b:02x} ")),
                None => out.push_str("   "),
            }
            if col == 7 {
                out.push(' ');
            }
        }
        out.push(' ');
        for &b in chunk {
            out.push(if (0x20..0x7f).contains(&b) { b as char } else { '.' });
        }
    }
    out
}
