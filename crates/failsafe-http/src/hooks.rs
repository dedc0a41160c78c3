//! Two-phase extension hooks around an action.

use failsafe_model::ApiError;

use crate::request::{ApiRequest, ApiResponse};

/// A hook wrapping a resource action.
///
/// `before` runs ahead of the handler in registration order and may answer
/// the request itself. `after` runs in reverse order once the handler has
/// produced a response and may replace it.
pub trait ActionHook: Send + Sync {
    fn before(&self, request: &mut ApiRequest) -> Result<Option<ApiResponse>, ApiError> {
        let _ = request;
        Ok(None)
    }

    fn after(
        &self,
        request: &mut ApiRequest,
        response: &ApiResponse,
    ) -> Result<Option<ApiResponse>, ApiError> {
        let _ = (request, response);
        Ok(None)
    }
}

impl std::fmt::Debug for dyn ActionHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ActionHook")
    }
}
