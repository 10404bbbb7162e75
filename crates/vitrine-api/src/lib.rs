#![forbid(unsafe_code)]
//! Wire surface for the Vitrine demo app: DTOs, the error contract, and
//! request parameter validation.

mod dto;
mod errors;
mod params;

pub use dto::{
    BrandSearchResult, CheckoutRequest, CheckoutResponse, LoginForm, RunAccepted, RunRequest,
    RunStatusResponse, SignupRequest, TokenResponse,
};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_proxy_image_params, parse_search_brands_params, ProxyImageParams, SearchBrandsParams,
    MAX_SEARCH_QUERY_LEN,
};

pub const CRATE_NAME: &str = "vitrine-api";
