use rand::Rng;
use rand::seq::IndexedRandom;
use starshop_db::models::Challenge;

pub const EMOJI_POOL: [&str; 12] = [
    "😀", "😎", "🐼", "🚀", "⭐", "💰", "🎯", "🦁", "🐶", "🍎", "🍕", "⚽",
];

pub const CHALLENGE_SIZE: usize = 3;

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const REFERRAL_CODE_LEN: usize = 6;
pub const MAX_REFERRAL_CODE_LEN: usize = 16;

/// Three distinct emoji from the pool, one of them the target.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Challenge {
    let candidates: Vec<String> = EMOJI_POOL
        .choose_multiple(rng, CHALLENGE_SIZE)
        .map(|e| e.to_string())
        .collect();
    let target = candidates
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| EMOJI_POOL[0].to_string());
    Challenge { candidates, target }
}

pub fn referral_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.random_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

/// Deep-link payloads are honoured as referral codes only when they could be one.
pub fn is_referral_code(payload: &str) -> bool {
    !payload.is_empty()
        && payload.len() <= MAX_REFERRAL_CODE_LEN
        && payload.chars().all(|c| c.is_ascii_alphanumeric())
}
