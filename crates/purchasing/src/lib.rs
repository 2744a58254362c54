//! Purchasing domain module: supplier deliveries and their approval.

pub mod delivery;

pub use delivery::{
    ApproveDelivery, DeliveryApproved, DeliveryCommand, DeliveryEvent, DeliveryId,
    DeliveryRegistered, RegisterDelivery, SupplierDelivery,
};
