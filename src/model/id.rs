use rand::Rng;

use crate::model::node::NodeId;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

/// Produces ids for new nodes. Ids only need to be unique within one tree;
/// the engine re-draws on collision.
pub trait IdSource {
    fn next_id(&mut self) -> NodeId;
}

/// Nine random base36 characters (36^9 combinations).
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> NodeId {
        let mut rng = rand::thread_rng();
        let id: String = (0..ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        NodeId::new(id)
    }
}

/// `prefix1`, `prefix2`, ... Deterministic ids for fixtures and tests.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_nine_base36_chars() {
        let mut ids = RandomIds;
        for _ in 0..64 {
            let id = ids.next_id();
            assert_eq!(id.as_str().len(), ID_LEN);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
            );
        }
    }

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIds::new("n");
        assert_eq!(ids.next_id(), NodeId::from("n1"));
        assert_eq!(ids.next_id(), NodeId::from("n2"));
    }
}
