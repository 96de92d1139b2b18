#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryStore, KeyValueStore, KvRepository, LearnerRepository, ProgressRecord,
    ProgressRepository, PronunciationScoreRepository, Storage, StorageError,
};
