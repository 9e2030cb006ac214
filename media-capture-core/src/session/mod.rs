pub mod negotiation;
pub mod pump;
pub mod service;
