pub mod applier;
pub mod defects;
pub mod matcher;
pub mod partition;
pub mod permission;
pub mod reconcile;
pub mod shipments;
pub mod status;

pub use applier::BatchApplier;
pub use defects::{DefectQuery, DefectService};
pub use matcher::RecordMatcher;
pub use partition::partition;
pub use reconcile::{ReconcileOutcome, ReconcileService};
pub use shipments::{ShipmentListing, ShipmentQuery, ShipmentService};
pub use status::{StatusFilter, StatusService};
