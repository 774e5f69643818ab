use rand::Rng;

/// Primary keys are opaque strings. Users come from the external auth
/// provider; everything else is generated by [`generate_id`].
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Length of server-generated ids.
pub const ID_LENGTH: usize = 21;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a random 21-character lowercase alphanumeric id.
pub fn generate_id() -> EntityId {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
