//! Cache storage backends

pub mod memory;
