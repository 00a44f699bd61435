use crossbeam::atomic::AtomicCell;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::ConnectionId;

static CONNECTION_COUNTER: AtomicCell<ConnectionId> = AtomicCell::new(1);

/// Allocates a process-unique connection id.
pub fn next_connection_id() -> ConnectionId {
    CONNECTION_COUNTER.fetch_add(1)
}

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod test {
    use super::{next_connection_id, random_string};

    #[test]
    fn connection_ids_are_unique() {
        let first = next_connection_id();
        let second = next_connection_id();

        assert_ne!(first, second);
    }

    #[test]
    fn random_strings_have_requested_length() {
        assert_eq!(random_string(8).len(), 8);
        assert!(random_string(8).chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
