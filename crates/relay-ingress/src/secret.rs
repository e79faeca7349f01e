/// Compares `a` and `b` for equality in constant time, inspecting up to
/// `max(len_a, len_b) + 1` bytes regardless of where they first differ
/// (spec §4.5 step 2).
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let max_len = a.len().max(b.len());
    let mut diff: u8 = u8::from(a.len() != b.len());
    for i in 0..=max_len {
        let ai = a.get(i).copied().unwrap_or(0);
        let bi = b.get(i).copied().unwrap_or(0);
        diff |= ai ^ bi;
    }
    diff == 0
}
