#![cfg_attr(not(test), no_std)]

pub mod sampling;
pub mod serial_link;
