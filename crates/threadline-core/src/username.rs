//! Username derivation for the profile bootstrap.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Target length for generated usernames.
pub const DEFAULT_USERNAME_LEN: usize = 8;

/// Length of the deterministic prefix taken from the normalized source.
const BASE_LEN: usize = 5;

/// Characters drawn for the random suffix.
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[^a-z0-9]").expect("static pattern")
});

/// Derives a short, collision-resistant username candidate.
///
/// The source (full name or email) is lowercased and stripped of
/// non-alphanumerics; the first five characters form the base (`"user"` when
/// the source normalizes to nothing), padded with at least one pseudorandom
/// lowercase-alphanumeric character up to `max_len`.
///
/// Candidates are not guaranteed unique; the caller resolves collisions by
/// regenerating with a fresh suffix.
pub fn generate_username<R: Rng + ?Sized>(source: &str, max_len: usize, rng: &mut R) -> String {
    let lowercased = source.to_lowercase();
    let normalized = NON_ALNUM.replace_all(&lowercased, "");
    let mut base: String = normalized.chars().take(BASE_LEN).collect();
    if base.is_empty() {
        base = "user".to_string();
    }

    let suffix_len = max_len.saturating_sub(base.len()).max(1);
    let suffix: String = (0..suffix_len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    let mut candidate = base;
    candidate.push_str(&suffix);
    candidate.truncate(max_len);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_base_is_normalized_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidate = generate_username("Jane Doe", 8, &mut rng);

        assert!(candidate.starts_with("janed"));
        assert_eq!(candidate.len(), 8);
        assert!(candidate.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_empty_source_falls_back_to_user() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidate = generate_username("!!!", 8, &mut rng);

        assert!(candidate.starts_with("user"));
        assert_eq!(candidate.len(), 8);
    }

    #[test]
    fn test_suffix_is_at_least_one_char() {
        // A long base still gets one random char, then truncates to max_len.
        let mut rng = StdRng::seed_from_u64(7);
        let candidate = generate_username("abcdefghij", 5, &mut rng);
        assert_eq!(candidate.len(), 5);
        assert!(candidate.starts_with("abcde"));
    }

    #[test]
    fn test_regeneration_draws_fresh_suffixes() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = generate_username("Jane Doe", 8, &mut rng);
        let second = generate_username("Jane Doe", 8, &mut rng);

        assert_eq!(&first[..5], &second[..5]);
        assert_ne!(first, second);
    }
}
