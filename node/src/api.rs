// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

#[derive(Serialize, Deserialize, Debug)]
pub struct WriteEventResponse {
    pub id: String,
    pub entry: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteEventResponse {
    pub id: String,
}

/// `GET /query?from=YYYY-MM-DD&to=YYYY-MM-DD[&who=a,b][&type=x,y]`
#[derive(Deserialize, Debug)]
pub struct QueryParams {
    pub from: String,
    pub to: String,
    pub who: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

impl QueryParams {
    /// Unix bounds in UTC: start of `from`'s day through the last second of
    /// `to`'s day.
    pub fn bounds(&self) -> Result<(i64, i64), ApiError> {
        let from = parse_date("from", &self.from)?;
        let to = parse_date("to", &self.to)?;
        if to < from {
            return Err(ApiError::InvalidInput(
                "'from' needs to be before 'to'".to_string(),
            ));
        }
        let start = from.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let end = to
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .map(|t| t.and_utc().timestamp() - 1);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(ApiError::InvalidInput("date out of range".to_string())),
        }
    }
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidInput(format!("invalid '{}' date {:?}: {}", name, value, e)))
}
