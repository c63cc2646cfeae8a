//! MongoDB document schemas

mod metadata;
mod phone_record;

pub use metadata::Metadata;
pub use phone_record::{
    decode_legacy_threads, version_filter, PhoneRecordDoc, StoredThreads, PHONE_RECORD_COLLECTION,
};
