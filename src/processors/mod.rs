pub mod inventory_reconciler;
pub mod metadata_reconciler;
pub mod staleness_detector;

pub use inventory_reconciler::{summarize, DeltaSummary, InventoryDelta};
pub use metadata_reconciler::{reconcile, MetadataReconciliation};
pub use staleness_detector::{StalenessDetector, YearWorkSet};
