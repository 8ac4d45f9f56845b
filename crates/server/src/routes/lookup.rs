use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, Query, State};
use axum::Json;
use dom6api::{MatchRequest, SelectionMode, ShapedResponse};
use std::collections::HashSet;
use std::sync::Arc;

/// Query parameter switching on fuzzy text matching (`match=fuzzy`).
pub const MATCH_PARAM: &str = "match";
/// Query parameter selecting `all` or `best`.
pub const MODE_PARAM: &str = "mode";

/// Build a request from raw query pairs.
///
/// The reserved `match` and `mode` parameters are consumed; every other key
/// becomes a constraint, keeping its first value only.
pub fn build_request(
    table: String,
    path_identifier: Option<String>,
    params: Vec<(String, String)>,
) -> ServerResult<MatchRequest> {
    let mut req = MatchRequest::new(table);
    if let Some(id) = path_identifier {
        req = req.with_path_identifier(id);
    }

    let mut seen = HashSet::new();
    for (key, value) in params {
        if !seen.insert(key.clone()) {
            continue;
        }
        match key.as_str() {
            MATCH_PARAM => req.fuzzy = value.eq_ignore_ascii_case("fuzzy"),
            MODE_PARAM => req.mode = value.parse::<SelectionMode>()?,
            _ => req = req.with_constraint(key, value),
        }
    }
    Ok(req)
}

/// `GET /{table}`: filter a table by its query parameters.
pub async fn lookup_table(
    State(state): State<Arc<ServerState>>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> ServerResult<Json<ShapedResponse>> {
    let req = build_request(table, None, params)?;
    run_lookup(state, req).await
}

/// `GET /{table}/{id}`: look up by identifier, optionally with more filters.
pub async fn lookup_entity(
    State(state): State<Arc<ServerState>>,
    Path((table, id)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> ServerResult<Json<ShapedResponse>> {
    let req = build_request(table, Some(id), params)?;
    run_lookup(state, req).await
}

/// Evaluate on the blocking pool; scans are synchronous.
async fn run_lookup(state: Arc<ServerState>, req: MatchRequest) -> ServerResult<Json<ShapedResponse>> {
    let service = Arc::clone(&state.service);
    let verify_images = state.config.verify_images;

    let shaped = tokio::task::spawn_blocking(move || {
        let mut shaped = service.lookup(&req)?;
        if verify_images {
            for record in shaped.records_mut() {
                if record.image_path().is_some_and(|path| !path.is_file()) {
                    record.clear_image();
                }
            }
        }
        Ok::<_, ServerError>(shaped)
    })
    .await??;

    Ok(Json(shaped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reserved_parameters_are_not_constraints() {
        let req = build_request(
            "units".into(),
            None,
            pairs(&[("name", "long"), ("match", "fuzzy"), ("mode", "best")]),
        )
        .unwrap();
        assert!(req.fuzzy);
        assert_eq!(req.mode, SelectionMode::Best);
        assert_eq!(req.constraints.len(), 1);
        assert_eq!(req.constraints[0].column, "name");
    }

    #[test]
    fn first_value_per_key_wins() {
        let req = build_request(
            "units".into(),
            None,
            pairs(&[("name", "long"), ("name", "short"), ("match", "exact"), ("match", "fuzzy")]),
        )
        .unwrap();
        assert_eq!(req.constraints[0].raw_value, "long");
        assert!(!req.fuzzy);
    }

    #[test]
    fn path_identifier_is_kept_raw() {
        let req = build_request("items".into(), Some("07".into()), Vec::new()).unwrap();
        assert_eq!(req.path_identifier.as_deref(), Some("07"));
        assert_eq!(req.mode, SelectionMode::All);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = build_request("units".into(), None, pairs(&[("mode", "top")])).unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }
}
