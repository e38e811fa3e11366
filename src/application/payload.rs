//! JSON envelopes shared by fresh responses and cached payloads.

use serde::Serialize;

use crate::application::pagination::PageRequest;

#[derive(Debug, Serialize)]
pub struct Envelope<'a, T> {
    pub success: bool,
    pub message: &'a str,
    pub data: T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn ok(message: &'a str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedEnvelope<'a, T> {
    pub success: bool,
    pub message: &'a str,
    pub data: T,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<'a, T: Serialize> PagedEnvelope<'a, T> {
    pub fn ok(message: &'a str, data: T, total: u64, page: PageRequest) -> Self {
        Self {
            success: true,
            message,
            data,
            total,
            page: page.page(),
            limit: page.limit(),
            total_pages: page.total_pages(total),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope<'a> {
    pub success: bool,
    pub message: &'a str,
}

impl<'a> MessageEnvelope<'a> {
    pub fn ok(message: &'a str) -> Self {
        Self {
            success: true,
            message,
        }
    }

    pub fn failure(message: &'a str) -> Self {
        Self {
            success: false,
            message,
        }
    }
}
