//! HTTP request, response and error types

pub mod chain;
pub mod error;
pub mod json;

pub use chain::{
    ChainDebugResponse, ChainView, CreateChainRequest, CreateChainResponse, DescribeChainResponse,
    OwnerChainsResponse, PreviewRequest, PreviewResponse, ProcessRequest, ProcessResponse,
    SlugLookupResponse,
};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
