// datalake2bq-core - Shared types for the export pipeline
//
// Everything the source, storage and warehouse crates exchange lives here:
// export descriptors as listed by the analytics API, the signed transfers
// resolved from them, schema types and the staging paths derived from them,
// plus the HTTP client abstraction every remote call goes through.

mod error;
pub mod http;
mod schema_type;
mod types;

pub use error::ErrorCode;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use schema_type::{is_path_segment, SchemaType, SchemaTypeSet};
pub use types::{ExportDescriptor, ExportPage, SignedTransfer, StagedObject};

/// Maximum number of exports per metadata page and per bulk-resolve request.
///
/// The analytics API rejects larger batches, so both the listing page size and
/// the bulk request chunking are pinned to this value.
pub const MAX_BATCH_SIZE: usize = 200;
