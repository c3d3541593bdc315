//! Test-reconciliation engine: walks the document's coordinate space,
//! matches parsed trace items onto existing or freshly appended rows, and
//! produces the batched write plan.

pub mod gateway;
pub mod loader;
pub mod output;
pub mod publish;

pub use gateway::{DocumentGateway, GatewayError, MemoryGateway, WritePlan};
pub use loader::{LoadError, Loader, ReconcileOutcome, TestMap};
pub use output::{CELL_MAX_CHARS, Mode, ModeError};
pub use publish::{PublishError, PublishOptions, PublishSummary, publish};
pub use test::{Test, TestLocations};
