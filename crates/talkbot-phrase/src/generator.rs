use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use talkbot_archive::ArchiveStore;
use tracing::debug;

use crate::chain::WordChain;
use crate::error::PhraseError;

/// Builds a fresh [`WordChain`] from the archive on every call and samples
/// one phrase from it.
pub struct PhraseGenerator {
    store: Arc<ArchiveStore>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl PhraseGenerator {
    /// Generator backed by an entropy-seeded RNG.
    pub fn new(store: Arc<ArchiveStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Generator with an injected RNG, for reproducible output.
    pub fn with_rng(store: Arc<ArchiveStore>, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            store,
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Generate a phrase of `word_count + 1` words from the archive.
    pub fn generate_phrase(&self, word_count: usize) -> Result<String, PhraseError> {
        let contents = self.store.contents()?;
        if contents.is_empty() {
            return Err(PhraseError::insufficient("archive holds no messages"));
        }

        let chain = WordChain::from_contents(&contents);
        debug!(
            messages = contents.len(),
            words = chain.words().len(),
            "word chain built"
        );

        // A panic elsewhere cannot leave the RNG in an invalid state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        chain.generate(&mut **rng, word_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rusqlite::Connection;
    use talkbot_core::types::MessageRecord;

    fn store_with(contents: &[&str]) -> Arc<ArchiveStore> {
        let store = ArchiveStore::new(Connection::open_in_memory().unwrap()).unwrap();
        for (i, content) in contents.iter().enumerate() {
            store
                .insert(&MessageRecord {
                    message_id: Some(i as u64 + 1),
                    content: content.to_string(),
                    author_name: "erin".into(),
                    author_id: 1,
                    channel_id: Some(1),
                    timestamp: Utc::now(),
                })
                .unwrap();
        }
        Arc::new(store)
    }

    #[test]
    fn empty_archive_is_insufficient() {
        let generator = PhraseGenerator::new(store_with(&[]));
        let err = generator.generate_phrase(30).unwrap_err();
        assert!(matches!(err, PhraseError::InsufficientData { .. }));
    }

    #[test]
    fn seeded_generators_agree() {
        let store = store_with(&["a b c", "b c a"]);
        let a = PhraseGenerator::with_rng(Arc::clone(&store), StdRng::seed_from_u64(3));
        let b = PhraseGenerator::with_rng(store, StdRng::seed_from_u64(3));
        for _ in 0..5 {
            assert_eq!(a.generate_phrase(10).unwrap(), b.generate_phrase(10).unwrap());
        }
    }

    #[test]
    fn phrase_has_requested_length() {
        let generator = PhraseGenerator::with_rng(
            store_with(&["a b c", "b c a"]),
            StdRng::seed_from_u64(9),
        );
        let phrase = generator.generate_phrase(30).unwrap();
        assert_eq!(phrase.split(' ').count(), 31);
    }

    #[test]
    fn poisoned_rng_lock_still_generates() {
        let generator = Arc::new(PhraseGenerator::with_rng(
            store_with(&["a b c", "b c a"]),
            StdRng::seed_from_u64(1),
        ));
        let holder = Arc::clone(&generator);
        let _ = std::thread::spawn(move || {
            let _guard = holder.rng.lock().unwrap();
            panic!("panic while holding the rng");
        })
        .join();

        assert!(generator.rng.is_poisoned());
        let phrase = generator.generate_phrase(5).unwrap();
        assert_eq!(phrase.split(' ').count(), 6);
    }
}
