pub mod kv_entries;

pub use kv_entries::KvRepository;
