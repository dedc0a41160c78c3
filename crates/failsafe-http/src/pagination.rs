//! Pagination, sorting and next-link helpers for collection listings.

use failsafe_model::ApiError;
use failsafe_model::output::Link;

use crate::request::ApiRequest;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(ApiError::invalid(format!(
                "Unknown sort direction '{other}', must be 'desc' or 'asc'"
            ))),
        }
    }
}

/// `limit` and `marker` of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    /// Effective limit, already clamped to the configured maximum.
    pub limit: usize,
    pub marker: Option<String>,
}

impl PageParams {
    /// Read `limit` and `marker` from the query string.
    ///
    /// A missing limit means the maximum; negative or non-integer limits are
    /// rejected.
    pub fn from_request(request: &ApiRequest, max_limit: usize) -> Result<Self, ApiError> {
        let limit = match request.query_param("limit") {
            None => max_limit,
            Some(raw) => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::invalid("limit param must be an integer"))?;
                let value = usize::try_from(value)
                    .map_err(|_| ApiError::invalid("limit param must be positive"))?;
                value.min(max_limit)
            }
        };
        let marker = request
            .query_param("marker")
            .filter(|m| !m.is_empty())
            .map(ToOwned::to_owned);
        Ok(Self { limit, marker })
    }

    /// The `next` link for a page of `count` items, if the page is full.
    ///
    /// Existing query parameters are kept; `limit` and `marker` are replaced
    /// by the effective limit and `last_uuid`.
    #[must_use]
    pub fn next_link(&self, request: &ApiRequest, count: usize, last_uuid: Option<&str>) -> Option<Link> {
        if self.limit == 0 || count != self.limit {
            return None;
        }
        let last_uuid = last_uuid?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &request.query {
            if key != "limit" && key != "marker" {
                query.append_pair(key, value);
            }
        }
        query.append_pair("limit", &self.limit.to_string());
        query.append_pair("marker", last_uuid);

        let href = format!("{}{}?{}", request.base_url, request.path, query.finish());
        Some(Link::new("next", href))
    }
}

/// Sort keys and directions of a listing, paired up.
///
/// Every key must be in `allowed`. A missing direction list defaults to
/// `desc` for every key; otherwise directions must pair with keys one to
/// one. Without keys, `default_key` sorts descending.
pub fn sort_params(
    request: &ApiRequest,
    allowed: &[&str],
    default_key: &str,
) -> Result<Vec<(String, SortDir)>, ApiError> {
    let keys: Vec<&str> = request.query_values("sort_key").collect();
    let dirs = request
        .query_values("sort_dir")
        .map(SortDir::parse)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(bad) = keys.iter().find(|k| !allowed.contains(k)) {
        return Err(ApiError::invalid(format!("Invalid sort_key: {bad}")));
    }

    if keys.is_empty() {
        let dir = dirs.first().copied().unwrap_or(SortDir::Desc);
        return Ok(vec![(default_key.to_owned(), dir)]);
    }

    if !dirs.is_empty() && dirs.len() != keys.len() {
        return Err(ApiError::invalid(
            "The number of sort_keys and sort_dirs must be same",
        ));
    }

    Ok(keys
        .iter()
        .enumerate()
        .map(|(i, key)| ((*key).to_owned(), dirs.get(i).copied().unwrap_or(SortDir::Desc)))
        .collect())
}

#[cfg(test)]
mod tests {
    use failsafe_model::VersionToken;

    use super::*;
    use crate::request::test_support::request;

    fn with_query(pairs: &[(&str, &str)]) -> ApiRequest {
        let mut req = request("index", VersionToken::Null);
        req.query = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        req
    }

    #[test]
    fn test_should_default_limit_to_max() {
        let params = PageParams::from_request(&with_query(&[]), 1000).unwrap();
        assert_eq!(params.limit, 1000);
        assert_eq!(params.marker, None);
    }

    #[test]
    fn test_should_clamp_limit_and_use_it_in_next_link() {
        let req = with_query(&[("limit", "5000"), ("recovery_method", "auto")]);
        let params = PageParams::from_request(&req, 2).unwrap();
        assert_eq!(params.limit, 2);

        let link = params.next_link(&req, 2, Some("uuid-2")).unwrap();
        assert_eq!(link.rel, "next");
        assert_eq!(
            link.href,
            "http://localhost/v1/segments?recovery_method=auto&limit=2&marker=uuid-2"
        );
    }

    #[test]
    fn test_should_not_link_partial_or_empty_pages() {
        let req = with_query(&[("limit", "0")]);
        let params = PageParams::from_request(&req, 1000).unwrap();
        assert_eq!(params.limit, 0);
        assert!(params.next_link(&req, 0, None).is_none());

        let req = with_query(&[("limit", "3")]);
        let params = PageParams::from_request(&req, 1000).unwrap();
        assert!(params.next_link(&req, 2, Some("x")).is_none());
    }

    #[test]
    fn test_should_reject_bad_limits() {
        assert!(PageParams::from_request(&with_query(&[("limit", "-1")]), 10).is_err());
        assert!(PageParams::from_request(&with_query(&[("limit", "ten")]), 10).is_err());
    }

    #[test]
    fn test_should_pair_sort_keys_and_dirs() {
        let allowed = ["name", "created_at", "id"];
        let req = with_query(&[("sort_key", "name"), ("sort_key", "id"), ("sort_dir", "asc"), ("sort_dir", "desc")]);
        assert_eq!(
            sort_params(&req, &allowed, "created_at").unwrap(),
            vec![("name".to_owned(), SortDir::Asc), ("id".to_owned(), SortDir::Desc)]
        );

        assert_eq!(
            sort_params(&with_query(&[]), &allowed, "created_at").unwrap(),
            vec![("created_at".to_owned(), SortDir::Desc)]
        );
    }

    #[test]
    fn test_should_reject_unknown_sort_key_or_dir() {
        let allowed = ["name"];
        assert!(sort_params(&with_query(&[("sort_key", "password")]), &allowed, "name").is_err());
        assert!(sort_params(&with_query(&[("sort_dir", "sideways")]), &allowed, "name").is_err());
        assert!(
            sort_params(
                &with_query(&[("sort_key", "name"), ("sort_dir", "asc"), ("sort_dir", "asc")]),
                &allowed,
                "name"
            )
            .is_err()
        );
    }
}
