//! Upstream REST source
//!
//! `GET {base}/patients/{id}` plus one sub-resource per record kind. A 404 on
//! the patient means it does not exist; a 404 on the discharge summary means
//! the patient has not been discharged. Any other failure aborts the fetch.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::report::{ReportError, ReportResult};

use super::{ClinicalSource, PatientBundle};

pub struct RestSource {
    client: Client,
    base_url: Url,
}

impl RestSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> ReportResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ReportError::UpstreamFetch(format!("invalid base url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ReportError::UpstreamFetch(format!(
                "invalid base url {}",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// `{base}/patients/{id}[/{resource}]` with the identifier percent-encoded
    fn url(&self, patient_id: &str, resource: Option<&str>) -> ReportResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ReportError::UpstreamFetch("base url cannot hold a path".into()))?;
            segments.pop_if_empty().push("patients").push(patient_id);
            if let Some(resource) = resource {
                segments.push(resource);
            }
        }
        Ok(url)
    }

    /// GET and decode; `Ok(None)` on 404
    fn get<T: DeserializeOwned>(&self, url: Url) -> ReportResult<Option<T>> {
        debug!(%url, "Fetching");
        let response = self.client.get(url.clone()).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json()?)),
            status => Err(ReportError::UpstreamFetch(format!("{} returned {}", url, status))),
        }
    }

    fn get_list<T: DeserializeOwned>(&self, patient_id: &str, resource: &str) -> ReportResult<Vec<T>> {
        let url = self.url(patient_id, Some(resource))?;
        self.get(url.clone())?
            .ok_or_else(|| ReportError::UpstreamFetch(format!("{} returned 404 Not Found", url)))
    }
}

impl ClinicalSource for RestSource {
    fn fetch_bundle(&self, patient_id: &str) -> ReportResult<PatientBundle> {
        let patient = self
            .get(self.url(patient_id, None)?)?
            .ok_or_else(|| ReportError::PatientNotFound(patient_id.to_string()))?;

        Ok(PatientBundle {
            patient,
            treatments: self.get_list(patient_id, "treatments")?,
            observations: self.get_list(patient_id, "observations")?,
            notes: self.get_list(patient_id, "evolution")?,
            discharge: self.get(self.url(patient_id, Some("discharge"))?)?,
        })
    }

    fn kind(&self) -> &'static str {
        "rest"
    }
}
