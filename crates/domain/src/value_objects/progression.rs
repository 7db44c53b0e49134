//! Level progression.

const BASE_EXP: u64 = 100;
const EXP_PER_LEVEL: u64 = 15;

/// Experience needed to advance from `level` to `level + 1`.
///
/// Must match the server's curve exactly; the client uses it only to render
/// progress toward the next level.
pub fn exp_required_for_level(level: u32) -> u64 {
    BASE_EXP + EXP_PER_LEVEL * u64::from(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_three_needs_145() {
        assert_eq!(exp_required_for_level(3), 145);
    }

    #[test]
    fn test_curve_is_linear() {
        assert_eq!(exp_required_for_level(0), 100);
        assert_eq!(exp_required_for_level(1), 115);
        assert_eq!(exp_required_for_level(40), 700);
    }
}
