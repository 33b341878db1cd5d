//! CPython-compatible hash functions for the builtin value types.
//!
//! Hashing is deterministic, equivalent to running CPython with `PYTHONHASHSEED=0`:
//! text and bytes go through SipHash-1-3 with a zeroed key. All results are the
//! signed values `hash()` would return.
//!
//! ## Cross-type hash invariant
//!
//! If `a == b` then `hash(a) == hash(b)`. Since `1 == 1.0 == True`, int, float and bool
//! hash through the same Mersenne-prime reduction, and an integral float hashes as the
//! integer it equals. Dict keys rely on this.

/// Mersenne prime used for numeric hashing: `2^61 - 1`.
const MODULUS: u64 = (1 << 61) - 1;

/// Hash of positive infinity; negative infinity hashes to its negation.
const INF_HASH: i64 = 314_159;

/// Multiplier for the imaginary part of a complex number.
const IMAG_MULTIPLIER: i64 = 1_000_003;

/// `-1` is reserved as an error sentinel by CPython, every hash path remaps it.
fn fix_sentinel(hash: i64) -> i64 {
    if hash == -1 { -2 } else { hash }
}

/// Hashes an integer: `n mod (2^61 - 1)`, keeping the sign of `n`.
#[must_use]
pub(crate) fn hash_int(value: i64) -> i64 {
    let remainder = (value.unsigned_abs() % MODULUS).cast_signed();
    fix_sentinel(if value < 0 { -remainder } else { remainder })
}

/// Hashes a float.
///
/// Integral values go through [`hash_int`] so that `hash(2.0) == hash(2)`. Other values
/// are reduced from their `frexp` decomposition 28 bits at a time.
#[must_use]
pub(crate) fn hash_float(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    if value.is_infinite() {
        return if value > 0.0 { INF_HASH } else { -INF_HASH };
    }
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
        let integral = value as i64;
        return hash_int(integral);
    }

    let (mut mantissa, mut exponent) = frexp(value.abs());
    let mut acc: u64 = 0;
    while mantissa > 0.0 {
        acc = ((acc << 28) & MODULUS) | (acc >> 33);
        mantissa *= 268_435_456.0; // 2^28
        exponent -= 28;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "0 <= mantissa < 2^28")]
        let chunk = mantissa as u64;
        mantissa -= chunk as f64;
        acc += chunk;
        if acc >= MODULUS {
            acc -= MODULUS;
        }
    }

    let shift = exponent.rem_euclid(61).cast_unsigned();
    acc = ((acc << shift) & MODULUS) | (acc >> (61 - shift));

    let signed = acc.cast_signed();
    fix_sentinel(if value < 0.0 { -signed } else { signed })
}

/// Hashes a complex number from the hashes of its parts.
#[must_use]
pub(crate) fn hash_complex(real: f64, imag: f64) -> i64 {
    let combined = hash_float(real).wrapping_add(IMAG_MULTIPLIER.wrapping_mul(hash_float(imag)));
    fix_sentinel(combined)
}

/// Hashes text the way `hash(str)` does.
#[must_use]
pub(crate) fn hash_str(value: &str) -> i64 {
    hash_bytes(value.as_bytes())
}

/// Hashes raw bytes the way `hash(bytes)` does. Empty input hashes to `0`.
#[must_use]
pub(crate) fn hash_bytes(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    fix_sentinel(SipHash13::digest(bytes).cast_signed())
}

/// Combines element hashes the way `hash(tuple)` does (xxHash-style lanes).
#[must_use]
pub(crate) fn hash_tuple(lanes: impl ExactSizeIterator<Item = i64>) -> i64 {
    const PRIME_1: u64 = 11_400_714_785_074_694_791;
    const PRIME_2: u64 = 14_029_467_366_897_019_727;
    const PRIME_5: u64 = 2_870_177_450_012_600_261;

    let len = lanes.len() as u64;
    let mut acc = PRIME_5;
    for lane in lanes {
        acc = acc.wrapping_add(lane.cast_unsigned().wrapping_mul(PRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(PRIME_1);
    }
    acc = acc.wrapping_add(len ^ (PRIME_5 ^ 3_527_539));

    if acc == u64::MAX {
        1_546_275_796
    } else {
        acc.cast_signed()
    }
}

/// Identity hash for objects without value semantics, derived from their address.
#[must_use]
pub(crate) fn hash_pointer(address: usize) -> i64 {
    fix_sentinel((address as u64).rotate_right(4).cast_signed())
}

/// Returns `(frac, exp)` such that `value == frac * 2^exp` with `0.5 <= frac < 1.0`.
///
/// `value` must be finite and non-negative.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }
    let bits = value.to_bits();
    #[expect(clippy::cast_possible_truncation, reason = "masked to 11 bits")]
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: scale into the normal range first
        let (frac, exp) = frexp(value * 2f64.powi(64));
        return (frac, exp - 64);
    }
    let frac = f64::from_bits((bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000);
    (frac, biased - 1022)
}

/// SipHash-1-3 keyed with zeros.
struct SipHash13 {
    v: [u64; 4],
}

impl SipHash13 {
    fn new() -> Self {
        Self {
            v: [
                0x736f_6d65_7073_6575,
                0x646f_7261_6e64_6f6d,
                0x6c79_6765_6e65_7261,
                0x7465_6462_7974_6573,
            ],
        }
    }

    fn digest(bytes: &[u8]) -> u64 {
        let mut state = Self::new();
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut block = [0_u8; 8];
            block.copy_from_slice(chunk);
            state.compress(u64::from_le_bytes(block));
        }

        let mut tail = (bytes.len() as u64) << 56;
        for (index, byte) in chunks.remainder().iter().enumerate() {
            tail |= u64::from(*byte) << (index * 8);
        }
        state.compress(tail);

        state.v[2] ^= 0xff;
        for _ in 0..3 {
            state.round();
        }
        state.v.iter().fold(0, |acc, lane| acc ^ lane)
    }

    fn compress(&mut self, message: u64) {
        self.v[3] ^= message;
        self.round();
        self.v[0] ^= message;
    }

    fn round(&mut self) {
        let [v0, v1, v2, v3] = &mut self.v;
        *v0 = v0.wrapping_add(*v1);
        *v1 = v1.rotate_left(13) ^ *v0;
        *v0 = v0.rotate_left(32);

        *v2 = v2.wrapping_add(*v3);
        *v3 = v3.rotate_left(16) ^ *v2;

        *v0 = v0.wrapping_add(*v3);
        *v3 = v3.rotate_left(21) ^ *v0;

        *v2 = v2.wrapping_add(*v1);
        *v1 = v1.rotate_left(17) ^ *v2;
        *v2 = v2.rotate_left(32);
    }
}
