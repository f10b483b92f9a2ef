//! API response envelope.
//!
//! Every successful response is `{ success: true, data?, message?, count?,
//! total?, pagination? }`. Errors are rendered by `AppError` with the same
//! `success`/`message` keys plus an `error` code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opendraft_core::Page;
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

/// Links to the neighbouring pages, when they exist.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            count: None,
            total: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }

    /// Create a `201 Created` response.
    pub fn created(data: T) -> Self {
        let mut response = Self::ok(data);
        response.status = StatusCode::CREATED;
        response
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// A success response carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            count: None,
            total: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// An unpaginated list with its `count`.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        let mut response = Self::ok(items);
        response.count = Some(count);
        response
    }

    /// One page of a listing with `count`, `total` and neighbour links.
    pub fn paginated<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let pagination = pagination_of(&page);
        let total = page.total;
        let mut response = Self::list(page.map(f).items);
        response.total = Some(total);
        response.pagination = Some(pagination);
        response
    }
}

/// Build neighbour links for a page.
pub fn pagination_of<T>(page: &Page<T>) -> Pagination {
    let limit = page.request.limit;
    Pagination {
        next: page.has_next().then(|| PageLink {
            page: page.request.page + 1,
            limit,
        }),
        prev: page.has_prev().then(|| PageLink {
            page: page.request.page - 1,
            limit,
        }),
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
