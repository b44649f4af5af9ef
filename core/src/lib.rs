//! The engine of `lure`: ARP poisoning sessions and DNS capture windows.
//!
//! A [`session::Session`] drives the poison/restore lifecycle against a set
//! of targets, while [`capture::capture_dns`] runs a bounded passive listen.
//! Both reach the wire through a [`network::link::LinkProvider`], so the
//! whole engine can run against a simulated link.

pub mod cache;
pub mod capture;
pub mod error;
pub mod injector;
pub mod network;
pub mod observer;
pub mod resolver;
pub mod session;

#[cfg(any(test, feature = "fixtures"))]
pub mod testing;

pub use error::{ErrorKind, SpoofError};
