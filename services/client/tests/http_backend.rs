//! Integration tests for the HTTP backend adapter.
//!
//! Uses wiremock to stand in for the attendance REST API.

use attendance_core::domain::{
    ApprovalDecision, ApprovalStatus, AttendanceAction, AttendanceStatus, AttendanceSubmission,
    GeoPoint, LeaveKind, LeaveRequest, NextAction, Photo, RecapFilter, Role, Session,
    TimeClassification,
};
use attendance_core::ports::{AdminBackend, AttendanceBackend, PortError};
use chrono::{NaiveDate, NaiveTime};
use client_lib::adapters::HttpBackend;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(server.uri(), Duration::from_secs(5)).unwrap()
}

fn session() -> Session {
    Session::new("tok-123")
}

fn submission(
    action: AttendanceAction,
    classification: TimeClassification,
    justification: Option<&str>,
) -> AttendanceSubmission {
    AttendanceSubmission {
        action,
        photo: Photo::jpeg(&b"abc"[..]),
        position: GeoPoint::new(-6.245358, 106.872379).unwrap(),
        accuracy_meters: 8.0,
        classification,
        justification: justification.map(str::to_string),
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[tokio::test]
async fn login_returns_token_and_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"email": "a@b.c", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "token": "tok-xyz",
                "user": {"id": 7, "name": "Sari", "email": "a@b.c", "peran": "admin", "jabatan": "HR"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = backend(&server).login("a@b.c", "pw").await.unwrap();
    assert_eq!(session.token, "tok-xyz");
    let user = session.user.as_ref().unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(user.role, Role::Admin);
    assert!(session.is_admin());
}

#[tokio::test]
async fn login_with_bad_credentials_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let err = backend(&server).login("a@b.c", "nope").await.unwrap_err();
    match err {
        PortError::Rejected(message) => assert_eq!(message, "Invalid email or password"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn branches_are_listed_without_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cabang"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"id": 1, "nama_cabang": "Cawang", "latitude": "-6.2453", "longitude": "106.8723", "radius": 150},
                {"id": 2, "nama_cabang": "Bekasi"}
            ]
        })))
        .mount(&server)
        .await;

    let branches = backend(&server).list_branches().await.unwrap();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].radius_meters, Some(150.0));
    assert!(branches[0].location.is_some());
    assert_eq!(branches[1].name, "Bekasi");
    assert!(branches[1].location.is_none());
}

// =============================================================================
// ATTENDANCE
// =============================================================================

#[tokio::test]
async fn today_status_carries_record_and_branch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attendance/check-status"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 9, "tanggal_absen": "2025-03-03", "jam_masuk": "07:41:00", "status": "telat"},
            "branch": {"id": 1, "nama_cabang": "Cawang", "latitude": -6.2453, "longitude": 106.8723}
        })))
        .mount(&server)
        .await;

    let status = backend(&server).today_status(&session()).await.unwrap();
    let record = status.record.as_ref().unwrap();
    assert_eq!(record.status, AttendanceStatus::Late);
    assert_eq!(record.check_in, NaiveTime::from_hms_opt(7, 41, 0));
    assert_eq!(status.branch.as_ref().unwrap().name, "Cawang");
    assert_eq!(status.next_action(), NextAction::CheckOut);
}

#[tokio::test]
async fn today_status_without_record_means_check_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attendance/check-status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": null})),
        )
        .mount(&server)
        .await;

    let status = backend(&server).today_status(&session()).await.unwrap();
    assert!(status.record.is_none());
    assert!(status.branch.is_none());
    assert_eq!(status.next_action(), NextAction::CheckIn);
}

#[tokio::test]
async fn late_check_in_sends_photo_and_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-masuk"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_partial_json(json!({
            "foto": "data:image/jpeg;base64,YWJj",
            "catatan_telat": "traffic",
            "status": "telat"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Absen masuk berhasil"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = backend(&server)
        .submit_attendance(
            &session(),
            &submission(AttendanceAction::CheckIn, TimeClassification::Late, Some("traffic")),
        )
        .await
        .unwrap();
    assert_eq!(receipt.message.as_deref(), Some("Absen masuk berhasil"));
}

#[tokio::test]
async fn on_time_check_in_sends_empty_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-masuk"))
        .and(body_partial_json(json!({"catatan_telat": "", "status": "hadir"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .submit_attendance(
            &session(),
            &submission(AttendanceAction::CheckIn, TimeClassification::OnTime, None),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn early_check_out_goes_to_its_own_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-pulang-cepat"))
        .and(body_partial_json(json!({"alasan": "doctor"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/absen-pulang"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    backend(&server)
        .submit_attendance(
            &session(),
            &submission(
                AttendanceAction::CheckOut,
                TimeClassification::EarlyDeparture,
                Some("doctor"),
            ),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn regular_check_out_sends_null_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-pulang"))
        .and(body_partial_json(json!({"alasan": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .submit_attendance(
            &session(),
            &submission(AttendanceAction::CheckOut, TimeClassification::OnTime, None),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn backend_message_is_kept_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-masuk"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Anda sudah absen hari ini"
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .submit_attendance(
            &session(),
            &submission(AttendanceAction::CheckIn, TimeClassification::OnTime, None),
        )
        .await
        .unwrap_err();
    match err {
        PortError::Rejected(message) => assert_eq!(message, "Anda sudah absen hari ini"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn success_false_with_ok_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absen-masuk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Di luar jam kerja"
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .submit_attendance(
            &session(),
            &submission(AttendanceAction::CheckIn, TimeClassification::OnTime, None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Rejected(m) if m == "Di luar jam kerja"));
}

#[tokio::test]
async fn expired_token_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attendance/check-status"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})),
        )
        .mount(&server)
        .await;

    let err = backend(&server).today_status(&session()).await.unwrap_err();
    assert!(matches!(err, PortError::Unauthorized));
}

#[tokio::test]
async fn server_error_without_message_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attendance/check-status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let err = backend(&server).today_status(&session()).await.unwrap_err();
    assert!(matches!(err, PortError::Unexpected(_)));
}

#[tokio::test]
async fn history_reports_records_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/riwayat-absensi"))
        .and(query_param("month", "3"))
        .and(query_param("year", "2025"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"id": 1, "tanggal_absen": "2025-03-03T00:00:00.000000Z", "status": "hadir"},
                {"id": 2, "tanggal_absen": "2025-03-04", "status": "sakit"}
            ],
            "stats": {"hadir": 10, "telat": 2, "izin": 1}
        })))
        .mount(&server)
        .await;

    let history = backend(&server).history(&session(), 3, 2025).await.unwrap();
    assert_eq!(history.records.len(), 2);
    assert_eq!(history.records[0].date, NaiveDate::from_ymd_opt(2025, 3, 3));
    assert_eq!(history.records[1].status, AttendanceStatus::Sick);
    assert_eq!(history.stats.present(), 12);
    assert_eq!(history.stats.absent, 0);
}

#[tokio::test]
async fn leave_request_is_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pengajuan-zin"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let request = LeaveRequest::new(
        Some(LeaveKind::Sick),
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        "flu",
        None,
    )
    .unwrap();
    backend(&server).submit_leave(&session(), &request).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body).into_owned();
    assert!(body.contains("name=\"jenis_izin\""));
    assert!(body.contains("sakit"));
    assert!(body.contains("2025-03-10"));
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

#[tokio::test]
async fn admin_lists_and_activates_users() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/pending-users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": 4, "name": "Budi", "email": "budi@x.id", "jabatan": "Staff"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/admin/activate-user/4"))
        .and(body_partial_json(json!({"is_admin": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let pending = backend.pending_users(&session()).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "Budi");
    backend.activate_user(&session(), 4, false).await.unwrap();
}

#[tokio::test]
async fn admin_decides_early_departures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/pending-pulang-cepat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{
                "id": 12,
                "jam_masuk": "07:20:00",
                "alasan_pulang_cepat": "family",
                "user": {"name": "Rina", "branch": {"nama_cabang": "Cawang"}}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/approve-pulang-cepat/12"))
        .and(body_partial_json(json!({"status": "ditolak"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let requests = backend.pending_early_departures(&session()).await.unwrap();
    assert_eq!(requests[0].reason.as_deref(), Some("family"));
    let employee = requests[0].employee.as_ref().unwrap();
    assert_eq!(employee.branch_name.as_deref(), Some("Cawang"));
    backend
        .decide_early_departure(&session(), 12, ApprovalDecision::Reject)
        .await
        .unwrap();
}

#[tokio::test]
async fn recap_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/rekap-absen"))
        .and(query_param("bulan", "3"))
        .and(query_param("tahun", "2025"))
        .and(query_param("status", "telat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": 5, "status": "telat", "status_pulang_cepat": "pending", "user": {"name": "Andi"}}]
        })))
        .mount(&server)
        .await;

    let filter = RecapFilter {
        month: 3,
        year: 2025,
        status: Some("telat".to_string()),
        date: None,
    };
    let records = backend(&server).recap(&session(), &filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].early_departure, Some(ApprovalStatus::Pending));
}

#[tokio::test]
async fn export_downloads_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/export-excel"))
        .and(query_param("bulan", "1"))
        .and(query_param("tahun", "2025"))
        .and(query_param("token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x50, 0x4b, 0x03, 0x04]))
        .mount(&server)
        .await;

    let bytes = backend(&server)
        .export_recap(&session(), 1, 2025)
        .await
        .unwrap();
    assert_eq!(bytes, vec![0x50, 0x4b, 0x03, 0x04]);
}
