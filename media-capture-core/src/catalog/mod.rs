pub mod identity;
pub mod pairing;
pub mod report;
pub mod usb_ids;
