//! Domain model of the round-up pipeline: notifications, stored records, decisions and the
//! ports through which the application reaches storage and the bank.

pub mod notification;
pub mod ports;
pub mod record;
pub mod roundup;
pub mod transfer;
