//! Client fingerprint derivation.
//!
//! The fingerprint is a fast, deterministic, non-cryptographic hash of the
//! client characteristics a token was issued to. It is a secondary binding
//! signal only; the token signature is the trust boundary, so collisions are
//! acceptable. No I/O, no allocation beyond the output string.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derive a fingerprint from client request characteristics.
///
/// Same inputs always yield the same 16-hex-character output.
pub fn generate_fingerprint(user_agent: &str, client_addr: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in user_agent
        .as_bytes()
        .iter()
        .chain(b"|")
        .chain(client_addr.as_bytes())
    {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = generate_fingerprint("Mozilla/5.0", "203.0.113.7");
        let b = generate_fingerprint("Mozilla/5.0", "203.0.113.7");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_inputs_differ() {
        let a = generate_fingerprint("Mozilla/5.0", "203.0.113.7");
        let b = generate_fingerprint("Mozilla/5.0", "203.0.113.8");
        let c = generate_fingerprint("curl/8.0", "203.0.113.7");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_separator_prevents_boundary_aliasing() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = generate_fingerprint("ab", "c");
        let b = generate_fingerprint("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_output_shape() {
        let fp = generate_fingerprint("", "");
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
