// datalake2bq-storage - Staging bucket access
//
// Exports are written to `{schemaType}_parquet/{exportId}_{schemaType}.parquet`
// through an OpenDAL operator (GCS in production, fs or memory for local
// runs) and purged per schema type once their load has succeeded.

mod error;
mod init;
mod reclaim;
mod transfer;

pub use error::{ReclaimError, TransferError};
pub use init::build_operator;
pub use reclaim::StagingReclaimer;
pub use transfer::{parquet_row_count, TransferWorker};
