// Dataset ingestion: CSV text → validated, schema-checked record sets held per slot.
// Parsing is pure; only `store` owns mutable session data.

pub mod csv_reader;
pub mod handlers;
pub mod schema;
pub mod store;

pub use schema::{
    load_dataset, AshbyRow, DatasetKind, HeadcountRow, MmmRow, RosterRow, SchemaError, SpendRow,
};
pub use store::{DatasetSnapshot, DatasetStatus, RecordStore};
