//! GREASE values (RFC 8701).
//!
//! Reserved ids of the form `0x?A?A` that a client advertises to keep peers
//! tolerant of unknown values. They are valid in every u16 registry (cipher
//! suites, extensions, versions, groups) and must never be selected.

use rand::Rng;

pub const VALUES: [u16; 16] = [
    0x0A0A, 0x1A1A, 0x2A2A, 0x3A3A, 0x4A4A, 0x5A5A, 0x6A6A, 0x7A7A, 0x8A8A, 0x9A9A, 0xAAAA,
    0xBABA, 0xCACA, 0xDADA, 0xEAEA, 0xFAFA,
];

pub fn is_grease(value: u16) -> bool {
    value & 0x0F0F == 0x0A0A && (value >> 8) == (value & 0xFF)
}

/// Pick a random GREASE value.
pub fn random() -> u16 {
    VALUES[rand::thread_rng().gen_range(0..VALUES.len())]
}

/// Pick a random GREASE value different from `other`.
///
/// Used where two GREASE entries appear in the same message and must not
/// collide (RFC 8701 section 3.1).
pub fn random_except(other: u16) -> u16 {
    loop {
        let v = random();
        if v != other {
            return v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_values_are_grease() {
        for v in VALUES {
            assert!(is_grease(v), "{:04x}", v);
        }
    }

    #[test]
    fn near_misses_are_not_grease() {
        assert!(!is_grease(0x0A1A));
        assert!(!is_grease(0x1301));
        assert!(!is_grease(0x0B0B));
    }

    #[test]
    fn random_except_differs() {
        for _ in 0..32 {
            let a = random();
            assert_ne!(random_except(a), a);
        }
    }
}
