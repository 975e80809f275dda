//! Registry record store adapters.
//!
//! Both adapters implement `CertificateRecordStore`: one over the registry's
//! HTTP API and one over an in-memory fixture.

mod dto;
mod http_store;
mod memory;

pub use http_store::HttpCertificateRecordStore;
pub use memory::InMemoryCertificateRecordStore;
