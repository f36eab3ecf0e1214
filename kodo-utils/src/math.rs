pub fn roundup_div(lhs: u64, rhs: u64) -> u64 {
    (lhs + rhs - 1) / rhs
}
