//! Google Sheets v4 `values` gateway.
//!
//! Thin synchronous client over the REST surface the run needs:
//! `values.get`, `values.update` (RAW input), and `values.batchUpdate` for
//! the final flush. Authentication is a ready bearer token supplied by the
//! caller; interactive OAuth flows are out of scope.

use serde::{Deserialize, Serialize};
use tracepub_common::{Dimension, Location};
use tracepub_core::{DocumentGateway, GatewayError, WritePlan};

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// The Sheets API's majorDimension label for a value sequence that extends
/// along `dimension`: one row of values runs rightward, one column of
/// values runs downward.
fn major_dimension(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Columns => "ROWS",
        Dimension::Rows => "COLUMNS",
    }
}

#[derive(Serialize)]
struct ValueRange {
    range: String,
    #[serde(rename = "majorDimension")]
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

impl ValueRange {
    fn new(location: &Location, values: &[String], dimension: Dimension) -> Self {
        ValueRange {
            range: location.to_string(),
            major_dimension: major_dimension(dimension),
            values: vec![values.to_vec()],
        }
    }
}

#[derive(Serialize)]
struct BatchUpdateRequest {
    #[serde(rename = "valueInputOption")]
    value_input_option: &'static str,
    data: Vec<ValueRange>,
}

#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Gateway over one spreadsheet, identified by its document id.
pub struct SheetsGateway {
    http: reqwest::blocking::Client,
    spreadsheet_id: String,
    token: String,
}

impl SheetsGateway {
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Result<Self, GatewayError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(GatewayError::transport)?;
        Ok(SheetsGateway {
            http,
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        })
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{SHEETS_ENDPOINT}/{id}/values{suffix}",
            id = self.spreadsheet_id
        )
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(GatewayError::Protocol(format!("{status}: {body}")))
    }
}

impl DocumentGateway for SheetsGateway {
    fn read(&self, location: &Location, dimension: Dimension) -> Result<Vec<String>, GatewayError> {
        tracing::debug!(range = %location, "values.get");
        let response = self
            .http
            .get(self.values_url(&format!("/{location}")))
            .bearer_auth(&self.token)
            // Group by the walked axis so every walked cell is one entry.
            .query(&[("majorDimension", major_dimension(dimension.opposite()))])
            .send()
            .map_err(GatewayError::transport)?;
        let body: ReadResponse = Self::check(response)?
            .json()
            .map_err(GatewayError::transport)?;
        reduce_dimension(body.values)
    }

    fn read_one(&self, location: &Location) -> Result<String, GatewayError> {
        let values = self.read(location, Dimension::Rows)?;
        Ok(values.into_iter().next().unwrap_or_default())
    }

    fn write(
        &self,
        location: &Location,
        values: &[String],
        dimension: Dimension,
    ) -> Result<(), GatewayError> {
        tracing::debug!(range = %location, count = values.len(), "values.update");
        let body = ValueRange::new(location, values, dimension);
        let response = self
            .http
            .put(self.values_url(&format!("/{location}")))
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .map_err(GatewayError::transport)?;
        Self::check(response)?;
        Ok(())
    }

    fn write_one(&self, location: &Location, value: &str) -> Result<(), GatewayError> {
        let values = [value.to_string()];
        self.write(location, &values, Dimension::Rows)
    }

    fn batch_write(&self, plan: &WritePlan, dimension: Dimension) -> Result<(), GatewayError> {
        tracing::info!(entries = plan.len(), "values.batchUpdate");
        let body = BatchUpdateRequest {
            value_input_option: "RAW",
            data: plan
                .entries()
                .iter()
                .map(|(location, values)| ValueRange::new(location, values, dimension))
                .collect(),
        };
        let response = self
            .http
            .post(self.values_url(":batchUpdate"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(GatewayError::transport)?;
        Self::check(response)?;
        Ok(())
    }
}

/// Flatten the two-dimensional value table returned by `values.get` into
/// the single walked sequence: one value per walked position, empty string
/// for gaps. More than one value per position means the request grouped by
/// the wrong axis and is reported, not guessed at.
fn reduce_dimension(table: Vec<Vec<String>>) -> Result<Vec<String>, GatewayError> {
    let mut values = Vec::with_capacity(table.len());
    for mut entry in table {
        match entry.len() {
            0 => values.push(String::new()),
            1 => values.push(entry.remove(0)),
            n => {
                return Err(GatewayError::Protocol(format!(
                    "expected at most one value per walked cell, got {n}"
                )));
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_dimension_labels_the_layout_axis() {
        // A sequence extending downward is one API column, and vice versa.
        assert_eq!(major_dimension(Dimension::Rows), "COLUMNS");
        assert_eq!(major_dimension(Dimension::Columns), "ROWS");
    }

    #[test]
    fn value_range_serialises_like_the_api_expects() {
        let location: Location = "Sheet1!D2".parse().unwrap();
        let values = vec!["req".to_string(), "resp".to_string()];
        let body = serde_json::to_value(ValueRange::new(
            &location,
            &values,
            Dimension::Columns,
        ))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "range": "Sheet1!D2",
                "majorDimension": "ROWS",
                "values": [["req", "resp"]],
            })
        );
    }

    #[test]
    fn batch_body_carries_every_plan_entry() {
        let mut plan = WritePlan::default();
        plan.push("S!A5".parse().unwrap(), vec!["T3".to_string()]);
        plan.push("S!D5".parse().unwrap(), vec!["req".to_string()]);
        let body = BatchUpdateRequest {
            value_input_option: "RAW",
            data: plan
                .entries()
                .iter()
                .map(|(loc, values)| ValueRange::new(loc, values, Dimension::Columns))
                .collect(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["valueInputOption"], "RAW");
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["data"][0]["range"], "S!A5");
    }

    #[test]
    fn reduce_dimension_flattens_single_value_entries() {
        let table = vec![
            vec!["a".to_string()],
            vec![],
            vec!["c".to_string()],
        ];
        assert_eq!(
            reduce_dimension(table).unwrap(),
            vec!["a".to_string(), String::new(), "c".to_string()]
        );
        let wide = vec![vec!["a".to_string(), "b".to_string()]];
        assert!(matches!(
            reduce_dimension(wide),
            Err(GatewayError::Protocol(_))
        ));
    }
}
