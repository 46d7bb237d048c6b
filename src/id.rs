//! Transaction identifiers and how new ones are minted.

/// Opaque transaction identifier.
pub type TransactionId = String;

/// Mints identifiers for new transactions.
pub trait IdGenerator {
    /// Create an identifier that has not been used before.
    fn next_id(&mut self) -> TransactionId;
}

/// Mints random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> TransactionId {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::id::{IdGenerator, UuidGenerator};

    #[test]
    fn uuid_ids_are_unique() {
        let mut generator = UuidGenerator;

        assert_ne!(generator.next_id(), generator.next_id());
    }
}
