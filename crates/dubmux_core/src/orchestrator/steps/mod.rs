//! Pipeline step implementations.
//!
//! Each step handles one phase of an assembly job, in this order:
//! Fetch, Probe, Reconcile, Captions, Mux, Burn, Thumbnail.

mod burn;
mod captions;
mod fetch;
mod mux;
mod probe;
mod reconcile;
mod thumbnail;

pub use burn::BurnStep;
pub use captions::CaptionsStep;
pub use fetch::FetchStep;
pub use mux::MuxStep;
pub use probe::ProbeStep;
pub use reconcile::ReconcileStep;
pub use thumbnail::ThumbnailStep;
