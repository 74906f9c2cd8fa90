use axum::{
    extract::{Form, Query, State},
    Json,
};
use serde::Deserialize;
use sonic_rs::Value;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

/// The query shape for a certificate lookup.
#[derive(Deserialize, Debug)]
pub struct VerifyQuery {
    #[serde(rename = "certificateNo")]
    pub certificate_no: Option<String>,
}

/// Looks up a certificate by number.
///
/// A missing or empty number is rejected locally; the spreadsheet sees
/// only well-formed lookups.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<Value>> {
    let certificate_no = query
        .certificate_no
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation("Certificate number is required".to_string()))?;

    let result = state.datastore.verify(&certificate_no).await?;
    Ok(Json(result))
}

/// Forwards arbitrary record fields to the spreadsheet.
pub async fn add_to_database(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Json<Value>> {
    tracing::info!("POST /add_TO_database accessed");

    let result = state.datastore.add_record(&fields).await?;
    Ok(Json(result))
}

/// Returns the full record list.
pub async fn load_from_database(State(state): State<AppState>) -> Result<Json<Value>> {
    let result = state.datastore.list_records().await?;
    Ok(Json(result))
}
