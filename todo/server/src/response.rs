//! JSON envelopes shared by every endpoint.

use crate::task::Filter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success envelope: `{"data": ..., "metadata": ...}`.
///
/// `metadata` is only present for list responses, i.e. when a [`Filter`] was
/// supplied.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Response<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl<T> Response<T> {
    pub fn new(
        data: Option<T>,
        total: u64,
        filter: Option<&Filter>,
        message: Option<String>,
    ) -> Self {
        Self {
            data,
            metadata: filter.map(|filter| Metadata::new(total, filter, message)),
        }
    }

    /// Envelope carrying a single value and no pagination metadata.
    pub fn data(data: T) -> Self {
        Self::new(Some(data), 0, None, None)
    }

    /// Envelope carrying one page of a list together with its metadata.
    pub fn page(data: T, total: u64, filter: &Filter) -> Self {
        Self::new(Some(data), total, Some(filter), None)
    }

    /// Envelope with neither data nor metadata, serialized as `{}`.
    pub fn empty() -> Self {
        Self::new(None, 0, None, None)
    }
}

/// Pagination metadata echoed back on list responses.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Metadata {
    pub offset: u64,
    pub limit: u64,
    /// Number of rows in the table, independent of `offset` and `limit`
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Metadata {
    pub fn new(total: u64, filter: &Filter, message: Option<String>) -> Self {
        Self {
            offset: filter.offset,
            limit: filter.limit,
            total,
            message,
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
