//! Collaborator traits consumed by the reconciliation core

pub mod dns_api;
pub mod splitter;

pub use dns_api::{
    ApiMessage, DnsApi, DnsRecord, RecordFilter, RecordPage, ResultInfo, UpdateResponse, Zone,
};
pub use splitter::{FlatRecord, PRIMARY_KEY, SpfSplitter, SplitPlan};
