use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;

/// Size of a token id in bytes (128 bits)
pub const TOKEN_ID_BYTES: usize = 16;

/// Trait for generating unguessable token identifiers
pub trait TokenIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws 128 bits from the thread-local CSPRNG (seeded from the OS)
/// and encodes them as unpadded base64url.
pub struct RandomTokenIdGenerator;

impl RandomTokenIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomTokenIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIdGenerator for RandomTokenIdGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}
