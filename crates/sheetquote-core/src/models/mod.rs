//! Data models for extracted documents and configuration.

pub mod config;
pub mod document;

pub use config::ExtractConfig;
pub use document::{
    flatten, unflatten, CategoryGroup, CategoryMarker, CleanValue, DocumentMeta, FlatRow,
    InvoiceDocument, Items, LineItem,
};
