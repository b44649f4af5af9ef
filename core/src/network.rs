pub mod channel;
pub mod link;
