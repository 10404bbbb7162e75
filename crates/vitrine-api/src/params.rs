use crate::errors::ApiError;
use std::collections::BTreeMap;

pub const MAX_SEARCH_QUERY_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBrandsParams {
    pub query: String,
}

pub fn parse_search_brands_params(
    query: &BTreeMap<String, String>,
) -> Result<SearchBrandsParams, ApiError> {
    let raw = query.get("q").ok_or_else(|| ApiError::missing_param("q"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_param("q", raw));
    }
    if trimmed.len() > MAX_SEARCH_QUERY_LEN {
        return Err(ApiError::invalid_param("q", raw));
    }
    Ok(SearchBrandsParams {
        query: trimmed.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyImageParams {
    pub url: String,
}

/// Basic open-proxy guard: only absolute http(s) URLs pass.
pub fn parse_proxy_image_params(
    query: &BTreeMap<String, String>,
) -> Result<ProxyImageParams, ApiError> {
    let raw = query
        .get("url")
        .ok_or_else(|| ApiError::missing_param("url"))?;
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiError::invalid_param("url", raw));
    }
    Ok(ProxyImageParams {
        url: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiErrorCode;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn search_requires_non_empty_query() {
        assert_eq!(
            parse_search_brands_params(&query(&[])).expect_err("missing").code,
            ApiErrorCode::InvalidQueryParameter
        );
        assert!(parse_search_brands_params(&query(&[("q", "  ")])).is_err());
        assert_eq!(
            parse_search_brands_params(&query(&[("q", " acme ")]))
                .expect("valid")
                .query,
            "acme"
        );
    }

    #[test]
    fn search_bounds_query_length() {
        let long = "x".repeat(MAX_SEARCH_QUERY_LEN + 1);
        assert!(parse_search_brands_params(&query(&[("q", &long)])).is_err());
    }

    #[test]
    fn proxy_rejects_non_http_urls() {
        for bad in ["", "ftp://x/y.png", "file:///etc/passwd", "javascript:alert(1)"] {
            assert!(parse_proxy_image_params(&query(&[("url", bad)])).is_err());
        }
        assert!(parse_proxy_image_params(&query(&[("url", "https://img.example/a.png")])).is_ok());
    }
}
