//! Adapters behind the domain ports: storage backends and the payment gateway.

pub mod in_memory;
pub mod payment_gateway;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
