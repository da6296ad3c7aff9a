use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient};
use crate::models::{Page, Report, ReportQuery, UpdateReportStatusRequest};

pub async fn list_reports(client: &HttpClient, query: &ReportQuery) -> Result<Page<Report>, ApiError> {
    client.fetch_data(ApiRequest::get("/admin/reports").query(query)?).await
}

/// PUT /admin/reports/{id} with `{status, type}`; returns the updated report.
pub async fn update_report_status(
    client: &HttpClient,
    id: i64,
    request: &UpdateReportStatusRequest,
) -> Result<Report, ApiError> {
    client
        .fetch_data(ApiRequest::put(format!("/admin/reports/{id}")).json(request)?)
        .await
}
