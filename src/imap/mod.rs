mod body_structure;
mod codec;
mod fetch;
#[cfg(test)]
pub mod mock_connection;
mod server_record;
mod transcript;

pub use body_structure::BodyPart;
pub use body_structure::Disposition;
pub use body_structure::LeafPart;
pub use body_structure::MultipartPart;
pub use codec::ResponseCodec;
pub use codec::ResponseFrame;
pub use fetch::Completion;
pub use fetch::FetchError;
pub use fetch::FetchItem;
pub use fetch::FetchMetadata;
pub use fetch::FetchRequest;
pub use fetch::FieldSpec;
pub use fetch::SYNC_HEADER_FIELDS;
pub use server_record::ServerRecord;
pub use server_record::ServerRecordBuilder;
pub use transcript::TranscriptConnection;
