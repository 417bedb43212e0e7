//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the attendance backend. It is the
//! concrete implementation of the `AttendanceBackend` and `AdminBackend` ports
//! from the `core` crate and owns every wire format detail: endpoint paths,
//! field names, the response envelope and the photo encoding.

use async_trait::async_trait;
use attendance_core::domain::{
    ApprovalDecision, ApprovalStatus, AttendanceAction, AttendanceHistory, AttendanceRecord,
    AttendanceStats, AttendanceStatus, AttendanceSubmission, Branch, EarlyDepartureRequest,
    EmployeeSummary, GeoPoint, LeaveRequest, PendingUser, Photo, RecapFilter, Registration, Role,
    Session, SubmissionReceipt, TimeClassification, TodayStatus, UserProfile,
};
use attendance_core::ports::{AdminBackend, AttendanceBackend, PortError, PortResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{NaiveDate, NaiveTime};
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the backend ports over the REST API.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The spreadsheet export link. The token travels in the query string
    /// because the link is meant to be opened directly in a browser.
    pub fn export_url(&self, session: &Session, month: u32, year: i32) -> PortResult<String> {
        let month = month.to_string();
        let year = year.to_string();
        reqwest::Url::parse_with_params(
            &self.url("/admin/export-excel"),
            [
                ("bulan", month.as_str()),
                ("tahun", year.as_str()),
                ("token", session.token.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| PortError::Unexpected(format!("Invalid export URL: {}", e)))
    }

    /// Sends the request and unwraps the backend's `{success, message, data}` envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<Envelope<T>> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network_error)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            warn!("Backend answered {} ({:?})", status, message);
            return Err(match (status, message) {
                (StatusCode::UNAUTHORIZED, _) => PortError::Unauthorized,
                (_, Some(message)) => PortError::Rejected(message),
                (StatusCode::NOT_FOUND, None) => PortError::NotFound(status.to_string()),
                (_, None) => PortError::Unexpected(format!("Backend answered {}", status)),
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| PortError::Unexpected(format!("Malformed response body: {}", e)))?;
        if envelope.success == Some(false) {
            let message = envelope
                .message
                .unwrap_or_else(|| "The server rejected the request".to_string());
            return Err(PortError::Rejected(message));
        }
        Ok(envelope)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request.bearer_auth(&session.token)
    }
}

fn network_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("Network error: {}", e))
}

fn photo_data_url(photo: &Photo) -> String {
    format!(
        "data:{};base64,{}",
        photo.content_type,
        STANDARD.encode(&photo.data)
    )
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
    #[serde(default)]
    stats: Option<StatsRecord>,
    #[serde(default)]
    branch: Option<BranchRecord>,
}

impl<T> Envelope<T> {
    fn require_data(self) -> PortResult<T> {
        self.data
            .ok_or_else(|| PortError::Unexpected("Response carried no data".to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct LoginRecord {
    token: String,
    user: Option<UserRecord>,
}

#[derive(Deserialize)]
struct UserRecord {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    peran: Option<String>,
    #[serde(default)]
    jabatan: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            role: match self.peran.as_deref() {
                Some("admin") => Role::Admin,
                _ => Role::Employee,
            },
            job_title: self.jabatan,
        }
    }
    fn to_pending(self) -> PendingUser {
        PendingUser {
            id: self.id,
            name: self.name,
            email: self.email,
            job_title: self.jabatan,
        }
    }
}

#[derive(Deserialize)]
struct BranchRecord {
    id: u64,
    #[serde(default, alias = "nama")]
    nama_cabang: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    radius: Option<f64>,
}
impl BranchRecord {
    fn to_domain(self) -> Branch {
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
                .map_err(|e| warn!("Ignoring branch {} location: {}", self.id, e))
                .ok(),
            _ => None,
        };
        Branch {
            id: self.id,
            name: self
                .nama_cabang
                .unwrap_or_else(|| format!("Branch {}", self.id)),
            location,
            radius_meters: self.radius.filter(|r| *r > 0.0),
        }
    }
}

#[derive(Deserialize)]
struct BranchNameRecord {
    nama_cabang: Option<String>,
}

#[derive(Deserialize)]
struct EmployeeRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    jabatan: Option<String>,
    #[serde(default)]
    branch: Option<BranchNameRecord>,
}
impl EmployeeRecord {
    fn to_domain(self) -> EmployeeSummary {
        EmployeeSummary {
            name: self.name.unwrap_or_else(|| "User".to_string()),
            job_title: self.jabatan,
            branch_name: self.branch.and_then(|b| b.nama_cabang),
        }
    }
}

#[derive(Deserialize)]
struct AttendanceRecordWire {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    tanggal_absen: Option<String>,
    #[serde(default)]
    jam_masuk: Option<String>,
    #[serde(default)]
    jam_pulang: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    status_pulang_cepat: Option<String>,
    #[serde(default)]
    user: Option<EmployeeRecord>,
}
impl AttendanceRecordWire {
    fn to_domain(self) -> AttendanceRecord {
        AttendanceRecord {
            id: self.id,
            date: self.tanggal_absen.as_deref().and_then(parse_date),
            check_in: self.jam_masuk.as_deref().and_then(parse_time),
            check_out: self.jam_pulang.as_deref().and_then(parse_time),
            status: AttendanceStatus::from_code(self.status.as_deref().unwrap_or("hadir")),
            early_departure: self
                .status_pulang_cepat
                .as_deref()
                .and_then(ApprovalStatus::from_code),
            employee: self.user.map(EmployeeRecord::to_domain),
        }
    }
}

#[derive(Deserialize, Default)]
struct StatsRecord {
    #[serde(default)]
    hadir: u32,
    #[serde(default)]
    telat: u32,
    #[serde(default)]
    izin: u32,
    #[serde(default)]
    alpha: u32,
}
impl StatsRecord {
    fn to_domain(self) -> AttendanceStats {
        AttendanceStats {
            on_time: self.hadir,
            late: self.telat,
            leave: self.izin,
            absent: self.alpha,
        }
    }
}

#[derive(Deserialize)]
struct EarlyDepartureRecord {
    id: u64,
    #[serde(default)]
    user: Option<EmployeeRecord>,
    #[serde(default)]
    jam_masuk: Option<String>,
    #[serde(default)]
    alasan_pulang_cepat: Option<String>,
}
impl EarlyDepartureRecord {
    fn to_domain(self) -> EarlyDepartureRequest {
        EarlyDepartureRequest {
            id: self.id,
            employee: self.user.map(EmployeeRecord::to_domain),
            check_in: self.jam_masuk.as_deref().and_then(parse_time),
            reason: self.alasan_pulang_cepat,
        }
    }
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterPayload<'a> {
    email: &'a str,
    name: &'a str,
    jabatan: &'a str,
    nomor_hp: &'a str,
    id_cabang: u64,
    password: &'a str,
}

#[derive(Serialize)]
struct CheckInPayload<'a> {
    foto: String,
    latitude: f64,
    longitude: f64,
    catatan_telat: &'a str,
    status: &'static str,
}

#[derive(Serialize)]
struct CheckOutPayload<'a> {
    foto: String,
    latitude: f64,
    longitude: f64,
    alasan: Option<&'a str>,
}

#[derive(Serialize)]
struct ActivatePayload {
    is_admin: bool,
}

#[derive(Serialize)]
struct DecisionPayload {
    status: &'static str,
}

/// Laravel serializes decimal columns as strings; accept both forms.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Accepts `2025-01-31` as well as full timestamps such as `2025-01-31T00:00:00.000000Z`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

//=========================================================================================
// `AttendanceBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl AttendanceBackend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> PortResult<Session> {
        let request = self
            .client
            .post(self.url("/login"))
            .json(&LoginPayload { email, password });
        let envelope: Envelope<LoginRecord> = self.send(request).await.map_err(|e| match e {
            PortError::Unauthorized => PortError::Rejected("Invalid email or password".to_string()),
            other => other,
        })?;
        let record = envelope.require_data()?;
        let user = record.user.map(UserRecord::to_domain);
        info!(
            "Logged in as user {:?}",
            user.as_ref().map(|u| u.id)
        );
        Ok(Session {
            token: record.token,
            user,
        })
    }

    async fn register(&self, registration: &Registration) -> PortResult<()> {
        let payload = RegisterPayload {
            email: &registration.email,
            name: &registration.name,
            jabatan: &registration.job_title,
            nomor_hp: &registration.phone,
            id_cabang: registration.branch_id,
            password: &registration.password,
        };
        let request = self.client.post(self.url("/register")).json(&payload);
        self.send::<serde_json::Value>(request).await?;
        info!("Registration submitted for {}", registration.email);
        Ok(())
    }

    async fn list_branches(&self) -> PortResult<Vec<Branch>> {
        let request = self.client.get(self.url("/cabang"));
        let envelope: Envelope<Vec<BranchRecord>> = self.send(request).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(BranchRecord::to_domain)
            .collect())
    }

    async fn today_status(&self, session: &Session) -> PortResult<TodayStatus> {
        let request = self.authorized(
            self.client.get(self.url("/attendance/check-status")),
            session,
        );
        let envelope: Envelope<AttendanceRecordWire> = self.send(request).await?;
        Ok(TodayStatus {
            record: envelope.data.map(AttendanceRecordWire::to_domain),
            branch: envelope.branch.map(BranchRecord::to_domain),
        })
    }

    async fn submit_attendance(
        &self,
        session: &Session,
        submission: &AttendanceSubmission,
    ) -> PortResult<SubmissionReceipt> {
        let foto = photo_data_url(&submission.photo);
        let latitude = submission.position.latitude();
        let longitude = submission.position.longitude();
        let justification = submission.justification.as_deref();

        let request = match submission.action {
            AttendanceAction::CheckIn => {
                let late = submission.classification == TimeClassification::Late;
                let payload = CheckInPayload {
                    foto,
                    latitude,
                    longitude,
                    catatan_telat: justification.unwrap_or_default(),
                    status: if late { "telat" } else { "hadir" },
                };
                self.client.post(self.url("/absen-masuk")).json(&payload)
            }
            AttendanceAction::CheckOut => {
                let early = submission.classification == TimeClassification::EarlyDeparture;
                let path = if early { "/absen-pulang-cepat" } else { "/absen-pulang" };
                let payload = CheckOutPayload {
                    foto,
                    latitude,
                    longitude,
                    alasan: if early { justification } else { None },
                };
                self.client.post(self.url(path)).json(&payload)
            }
        };

        debug!(
            "Submitting {:?} ({:?}), photo {} bytes",
            submission.action,
            submission.classification,
            submission.photo.data.len()
        );
        let envelope: Envelope<serde_json::Value> =
            self.send(self.authorized(request, session)).await?;
        info!("{:?} accepted by the backend", submission.action);
        Ok(SubmissionReceipt {
            message: envelope.message,
        })
    }

    async fn history(
        &self,
        session: &Session,
        month: u32,
        year: i32,
    ) -> PortResult<AttendanceHistory> {
        let request = self
            .client
            .get(self.url("/riwayat-absensi"))
            .query(&[("month", month.to_string()), ("year", year.to_string())]);
        let envelope: Envelope<Vec<AttendanceRecordWire>> =
            self.send(self.authorized(request, session)).await?;
        Ok(AttendanceHistory {
            records: envelope
                .data
                .unwrap_or_default()
                .into_iter()
                .map(AttendanceRecordWire::to_domain)
                .collect(),
            stats: envelope.stats.unwrap_or_default().to_domain(),
        })
    }

    async fn submit_leave(&self, session: &Session, request: &LeaveRequest) -> PortResult<()> {
        let mut form = multipart::Form::new()
            .text("jenis_izin", request.kind.code())
            .text("tanggal", request.date.format("%Y-%m-%d").to_string())
            .text("keterangan", request.description.clone());
        if let Some(attachment) = &request.attachment {
            let part = multipart::Part::bytes(attachment.data.to_vec())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.content_type)
                .map_err(|e| PortError::Unexpected(format!("Invalid attachment type: {}", e)))?;
            form = form.part("dokumen", part);
        }
        let builder = self.client.post(self.url("/pengajuan-zin")).multipart(form);
        self.send::<serde_json::Value>(self.authorized(builder, session))
            .await?;
        info!("Leave request ({}) submitted for {}", request.kind.code(), request.date);
        Ok(())
    }
}

//=========================================================================================
// `AdminBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl AdminBackend for HttpBackend {
    async fn pending_users(&self, session: &Session) -> PortResult<Vec<PendingUser>> {
        let request = self.authorized(self.client.get(self.url("/admin/pending-users")), session);
        let envelope: Envelope<Vec<UserRecord>> = self.send(request).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(UserRecord::to_pending)
            .collect())
    }

    async fn activate_user(
        &self,
        session: &Session,
        user_id: u64,
        as_admin: bool,
    ) -> PortResult<()> {
        let request = self
            .client
            .put(self.url(&format!("/admin/activate-user/{}", user_id)))
            .json(&ActivatePayload { is_admin: as_admin });
        self.send::<serde_json::Value>(self.authorized(request, session))
            .await?;
        info!("Activated user {} (admin: {})", user_id, as_admin);
        Ok(())
    }

    async fn pending_early_departures(
        &self,
        session: &Session,
    ) -> PortResult<Vec<EarlyDepartureRequest>> {
        let request = self.authorized(
            self.client.get(self.url("/admin/pending-pulang-cepat")),
            session,
        );
        let envelope: Envelope<Vec<EarlyDepartureRecord>> = self.send(request).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(EarlyDepartureRecord::to_domain)
            .collect())
    }

    async fn decide_early_departure(
        &self,
        session: &Session,
        request_id: u64,
        decision: ApprovalDecision,
    ) -> PortResult<()> {
        let request = self
            .client
            .post(self.url(&format!("/admin/approve-pulang-cepat/{}", request_id)))
            .json(&DecisionPayload {
                status: decision.code(),
            });
        self.send::<serde_json::Value>(self.authorized(request, session))
            .await?;
        info!("Early departure {} marked {}", request_id, decision.code());
        Ok(())
    }

    async fn recap(
        &self,
        session: &Session,
        filter: &RecapFilter,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let mut params = vec![
            ("bulan", filter.month.to_string()),
            ("tahun", filter.year.to_string()),
        ];
        if let Some(status) = filter.status.as_ref().filter(|s| !s.is_empty()) {
            params.push(("status", status.clone()));
        }
        if let Some(date) = filter.date {
            params.push(("tanggal", date.format("%Y-%m-%d").to_string()));
        }
        let request = self.client.get(self.url("/admin/rekap-absen")).query(&params);
        let envelope: Envelope<Vec<AttendanceRecordWire>> =
            self.send(self.authorized(request, session)).await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(AttendanceRecordWire::to_domain)
            .collect())
    }

    async fn export_recap(&self, session: &Session, month: u32, year: i32) -> PortResult<Vec<u8>> {
        let url = self.export_url(session, month, year)?;
        let response = self
            .authorized(self.client.get(url), session)
            .send()
            .await
            .map_err(network_error)?;
        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(PortError::Unauthorized),
            status if !status.is_success() => {
                return Err(PortError::Unexpected(format!("Export failed with {}", status)))
            }
            _ => {}
        }
        let bytes = response.bytes().await.map_err(network_error)?;
        info!("Downloaded recap export for {}/{} ({} bytes)", month, year, bytes.len());
        Ok(bytes.to_vec())
    }
}
