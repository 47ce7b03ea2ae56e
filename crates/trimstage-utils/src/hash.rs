//! Stable parameter ID generation.

/// Compute the FNV-1a 32-bit hash of a string.
///
/// Parameter identifiers such as `"gain"` or `"inTrim"` are hashed once,
/// usually in a `const`, to produce the numeric `ParameterId` used on the
/// control surface and in host automation. The result does not depend on
/// platform or compiler version, so IDs recorded by a host in one session
/// resolve to the same parameter in the next.
///
/// ```
/// use trimstage_utils::fnv1a_32;
///
/// const GAIN_ID: u32 = fnv1a_32("gain");
/// assert_eq!(GAIN_ID, fnv1a_32("gain"));
/// ```
#[inline]
pub const fn fnv1a_32(s: &str) -> u32 {
    const FNV_OFFSET: u32 = 2166136261;
    const FNV_PRIME: u32 = 16777619;

    let bytes = s.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}
