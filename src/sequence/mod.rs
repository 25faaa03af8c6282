pub mod cache;
pub mod reconciler;

pub use cache::{Allocation, AllocationSource, SequenceAllocator};
pub use reconciler::{DriftEvent, DriftObserver, LogDriftObserver, Reconciler};
