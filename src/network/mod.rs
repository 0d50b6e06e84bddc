pub mod device;
pub mod ethernet;
pub mod link;
