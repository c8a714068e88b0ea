pub mod defect;
pub mod line_item;
pub mod principal;
pub mod result;
pub mod shipment;
pub mod status;
pub mod summary;

pub use defect::{DefectDraft, DefectReport, DEFECT_STATUSES};
pub use line_item::{LineItemSummary, LineItemUpdate, OrderLineItem};
pub use principal::Principal;
pub use result::{ApplyReport, MatchResult, MatchedShipment, Partition};
pub use shipment::{LineKey, ShipmentRecord, ShipmentRow};
pub use status::ElectrodeStatus;
pub use summary::ShipmentSummary;
