//! End-to-end scenarios over a simulated link.

mod capture;
mod session;
