use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::RngCore;

/// Bytes of entropy in a login token; hex encoding doubles the wire length.
pub const TOKEN_BYTES: usize = 16;

/// hash_password
///
/// Hashes a plaintext password with Argon2 and a fresh per-user salt,
/// producing a self-describing PHC string (algorithm, parameters, salt and
/// digest in one column). Plaintext is never persisted.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// verify_password
///
/// Verifies a plaintext candidate against a stored PHC string. A malformed
/// stored hash counts as a failed verification rather than an error: the
/// caller only ever learns pass/fail.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// generate_token
///
/// Issues a fresh opaque login token: `TOKEN_BYTES` of CSPRNG output,
/// hex-encoded. Tokens are compared by equality lookup only — no signing,
/// no embedded claims.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
