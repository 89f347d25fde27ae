/// Opaque API token keys
use rand::RngCore;

/// Random bytes per key; hex-encoded this gives a 40 character key.
const TOKEN_BYTES: usize = 20;

/// Generate a new token key from the OS-seeded thread RNG
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extract the key from an `Authorization` header value.
///
/// Accepts `Token <key>` and `Bearer <key>`. Other schemes yield `None` so the
/// request is treated as anonymous.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(key.trim())
    } else {
        None
    }
}
