// End-to-end pipeline: store -> hub/subscriptions -> services -> HTTP
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::FixedOffset;
use phase_telemetry::application::alarm_service::AlarmService;
use phase_telemetry::application::dashboard_service::DashboardService;
use phase_telemetry::application::data_hub::DataHub;
use phase_telemetry::application::fixture_service::FixtureService;
use phase_telemetry::application::history_service::HistoryService;
use phase_telemetry::application::live_chart::{ChartRequest, LiveChart};
use phase_telemetry::application::streaming_service::{StreamMessage, StreamingService};
use phase_telemetry::application::subscriber::{RefreshPolicy, SeriesSubscriber};
use phase_telemetry::domain::phase::{Phase, PhaseMetric, TimeFrame};
use phase_telemetry::domain::series;
use phase_telemetry::domain::telemetry::{PhaseSnapshot, RawTimestamp, RawValue, Sample, SeriesPoint};
use phase_telemetry::infrastructure::config::AppConfig;
use phase_telemetry::infrastructure::fixtures::{
    FixtureStore, ALARMS_FILE, GENERAL_METRICS_FILE, GENERATION_FILE, HISTORY_FILES,
    HISTORY_VARIABLES_FILE, PHASE_LINES_FILE, SHARE_WEEKLY_FILE,
};
use phase_telemetry::infrastructure::memory_repository::InMemoryRepository;
use phase_telemetry::presentation::app_state::AppState;
use phase_telemetry::presentation::handlers::router;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn document(time_ms: i64, fields: &[(&str, f64)]) -> PhaseSnapshot {
    let mut snapshot = PhaseSnapshot::new(
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::Number(*v)))
            .collect::<BTreeMap<_, _>>(),
    );
    snapshot.created_at = Some(RawTimestamp::EpochMillis(time_ms as f64));
    snapshot
}

struct Harness {
    _fixtures: tempfile::TempDir,
    repository: Arc<InMemoryRepository>,
    hub: Arc<DataHub>,
    state: Arc<AppState>,
}

fn harness(documents: Vec<PhaseSnapshot>) -> Harness {
    let fixtures = tempfile::tempdir().unwrap();
    std::fs::write(
        fixtures.path().join(PHASE_LINES_FILE),
        r#"{ "semanal": { "Fase A": { "Seg": "10", "Dom": 7 } } }"#,
    )
    .unwrap();
    std::fs::write(
        fixtures.path().join(ALARMS_FILE),
        r#"[{ "id": 1, "variableName": "Tensão A", "value": "245 V", "description": "Sobretensão",
              "time": "2024-05-01T10:00:00Z", "priority": "high" }]"#,
    )
    .unwrap();
    std::fs::write(fixtures.path().join(SHARE_WEEKLY_FILE), r#"{ "Fase A": "40", "Fase B": "35.5" }"#)
        .unwrap();
    std::fs::write(
        fixtures.path().join(GENERATION_FILE),
        r#"{ "direta": { "week": { "Seg": "12" }, "year": {} }, "reversa": { "week": {}, "year": {} } }"#,
    )
    .unwrap();
    std::fs::write(fixtures.path().join(GENERAL_METRICS_FILE), r#"{ "dht": "3.8" }"#).unwrap();
    std::fs::create_dir_all(fixtures.path().join("historico")).unwrap();
    for name in HISTORY_FILES {
        let body = if name == "historico/tensao.json" {
            r#"[
                { "id": 1, "variableName": "Tensão A", "value": 219.5, "unit": "V", "time": "2024-05-01T12:00:00Z" },
                { "id": 2, "variableName": "Tensão A", "value": 221.0, "unit": "V", "time": "2024-05-03T23:59:00Z" },
                { "id": 3, "variableName": "Tensão B", "value": 220.0, "unit": "V", "time": "2024-05-02T12:00:00Z" }
            ]"#
        } else {
            "[]"
        };
        std::fs::write(fixtures.path().join(name), body).unwrap();
    }
    std::fs::write(
        fixtures.path().join(HISTORY_VARIABLES_FILE),
        r#"[{ "id": 1, "variableName": "Tensão A" }, { "id": 2, "variableName": "Tensão B" }]"#,
    )
    .unwrap();
    let store = FixtureStore::new(fixtures.path());
    let offset = FixedOffset::west_opt(3 * 3600).unwrap();

    let repository = Arc::new(InMemoryRepository::with_documents(documents));
    let hub = Arc::new(DataHub::new(repository.clone(), Duration::from_secs(3600), None));
    let subscriber = SeriesSubscriber::new(
        repository.clone(),
        RefreshPolicy {
            interval: Duration::from_secs(3600),
            fetch_timeout: Some(Duration::from_secs(1)),
        },
    );

    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(hub.clone()),
        streaming_service: StreamingService::new(subscriber, hub.clone(), offset),
        fixture_service: FixtureService::new(store.clone()),
        alarm_service: AlarmService::new(store.clone()),
        history_service: HistoryService::new(store, offset),
        charts: AppConfig::default().charts,
        max_points: 500,
    });

    Harness {
        _fixtures: fixtures,
        repository,
        hub,
        state,
    }
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn wait_loaded(hub: &DataHub) {
    let mut rx = hub.subscribe();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.loaded))
        .await
        .expect("hub loaded in time")
        .expect("hub open");
}

#[test]
fn test_series_builder_mixed_inputs() {
    let samples = vec![
        Sample::new("Va", Some(RawTimestamp::EpochMillis(3000.0)), RawValue::Number(10.0)),
        Sample::new("Va", Some(RawTimestamp::EpochMillis(1000.0)), RawValue::Text("bad".into())),
        Sample::new("Va", None, RawValue::Number(5.0)),
        Sample::new("Va", Some(RawTimestamp::EpochMillis(2000.0)), RawValue::Number(7.0)),
    ];

    assert_eq!(
        series::build(&samples, 2),
        vec![SeriesPoint::time(2000, 7.0), SeriesPoint::time(3000, 10.0)]
    );
}

#[tokio::test]
async fn test_cards_follow_the_latest_snapshot() {
    let t = now_ms();
    let h = harness(vec![document(
        t,
        &[("Va", 220.0), ("Ia", 10.0), ("Ib", 20.0), ("angVa", 30.0), ("angIa", 0.0), ("Pdir", 900.0)],
    )]);
    h.hub.start();
    wait_loaded(&h.hub).await;

    let (status, overview) = get_json(h.state.clone(), "/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["loading"], false);
    assert_eq!(overview["dashboard"]["tiles"][0]["display"], "220.00 V");
    assert_eq!(overview["dashboard"]["tiles"][3]["display"], "900.00 W");

    let (_, cards) = get_json(h.state.clone(), "/phases/a/cards?phases=A,B").await;
    assert_eq!(cards["cards"][0]["value"], 15.0);

    let (_, angles) = get_json(h.state.clone(), "/phases/A/angles").await;
    assert_eq!(angles["cards"][2]["display"], "30°");

    h.repository.push(document(t + 1000, &[("Va", 230.0)]));
    let mut rx = h.hub.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| s.snapshot.as_ref().and_then(|s| s.number("Va")) == Some(230.0)),
    )
    .await
    .unwrap()
    .unwrap();

    let (_, general) = get_json(h.state.clone(), "/general/cards").await;
    // Snapshots replace each other wholesale
    assert_eq!(general["cards"][0]["display"], "-- W");
    // Distortion is not in the snapshot, so the recorded site figure fills in
    assert_eq!(general["cards"][5]["display"], "3.80 %");
}

#[tokio::test]
async fn test_bad_query_parameters_are_rejected() {
    let h = harness(Vec::new());
    let (status, _) = get_json(h.state.clone(), "/phases/D/cards").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(h.state.clone(), "/charts/phase/stream?metric=Pressao").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(h.state.clone(), "/charts/desconhecido/stream").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fixture_routes() {
    let h = harness(Vec::new());

    let (_, lines) = get_json(h.state.clone(), "/consumption/phases?period=semanal").await;
    assert_eq!(lines[0]["name"], "Fase A");
    assert_eq!(lines[0]["data"].as_array().unwrap().len(), 7);
    assert_eq!(lines[0]["data"][6]["y"], 7.0);

    // Missing fixture file degrades to an empty body
    let (status, peak) = get_json(h.state.clone(), "/consumption/peak?mode=ponta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(peak["thisYear"].as_array().unwrap().len(), 0);

    let (_, alarms) = get_json(h.state.clone(), "/alarms?search=tens&priority=high").await;
    assert_eq!(alarms.as_array().unwrap().len(), 1);

    let (_, suggestions) = get_json(h.state.clone(), "/alarms/suggestions?q=ten").await;
    assert_eq!(suggestions, serde_json::json!(["Tensão A"]));
}

#[tokio::test]
async fn test_history_routes() {
    let h = harness(Vec::new());

    let (status, result) =
        get_json(h.state.clone(), "/history?variable=tens%C3%A3o%20a&start=2024-05-01&end=2024-05-03").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = result["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(result["series"][0]["name"], "Tensão A");
    assert_eq!(result["series"][0]["data"][0]["x"], "05/01");
    assert_eq!(result["series"][0]["data"][1]["x"], "05/03");

    // End bound excludes the later day
    let (_, narrowed) = get_json(h.state.clone(), "/history?variable=Tens%C3%A3o%20A&end=2024-05-02").await;
    assert_eq!(narrowed["entries"].as_array().unwrap().len(), 1);

    let (_, empty) = get_json(h.state.clone(), "/history").await;
    assert_eq!(empty["entries"].as_array().unwrap().len(), 0);

    let (status, _) = get_json(h.state.clone(), "/history?variable=x&start=01-05-2024").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, suggestions) = get_json(h.state.clone(), "/history/suggestions?q=tens").await;
    assert_eq!(suggestions, serde_json::json!(["Tensão A", "Tensão B"]));
}

#[tokio::test]
async fn test_share_and_generation_routes() {
    let h = harness(Vec::new());

    let (_, share) = get_json(h.state.clone(), "/consumption/phases/share").await;
    assert_eq!(share, serde_json::json!([{ "name": "Fase A", "amount": 40.0 }, { "name": "Fase B", "amount": 35.5 }]));

    // Monthly file is absent
    let (status, monthly) = get_json(h.state.clone(), "/consumption/phases/share?period=mensal").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(monthly, serde_json::json!([]));

    let (_, generation) = get_json(h.state.clone(), "/generation?period=semanal").await;
    assert_eq!(generation["direta"][0]["y"], 12.0);
    assert_eq!(generation["reversa"].as_array().unwrap().len(), 7);

    let (status, _) = get_json(h.state.clone(), "/generation?period=diario").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_live_chart_switches_metric_without_leaking_subscriptions() {
    let t = now_ms();
    let h = harness(vec![
        document(t - 2000, &[("Ia", 1.0), ("Ib", 2.0), ("Va", 220.0)]),
        document(t - 1000, &[("Ia", 1.5), ("Ib", 2.5), ("Va", 221.0)]),
    ]);
    let subscriber = SeriesSubscriber::new(
        h.repository.clone(),
        RefreshPolicy {
            interval: Duration::from_secs(3600),
            fetch_timeout: None,
        },
    );
    let mut chart = LiveChart::new(subscriber);
    let board = chart.board();

    chart.configure(ChartRequest::phase_metric(
        PhaseMetric::Current,
        TimeFrame::Day,
        &[Phase::A, Phase::B],
        500,
    ));
    assert_eq!(board.snapshot().len(), 2);

    chart.configure(ChartRequest::phase_metric(PhaseMetric::Voltage, TimeFrame::Day, &[Phase::A], 500));
    let mut events = board.events();
    tokio::time::timeout(Duration::from_secs(2), async {
        while board.snapshot()[0].data.len() < 2 {
            let _ = events.recv().await;
        }
    })
    .await
    .unwrap();

    let series = chart.series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name, "Tensão");
    assert_eq!(series[0].data.iter().map(|p| p.y).collect::<Vec<_>>(), vec![220.0, 221.0]);

    // Old subscriptions release their push feed once their tasks wind down
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while h.repository.push_listeners() > 1 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_streamed_chart_reports_axis_plan() {
    let t = now_ms();
    let h = harness(vec![document(t - 60_000, &[("Va", 220.0)]), document(t, &[("Va", 222.0)])]);
    let request = ChartRequest::phase_metric(PhaseMetric::Voltage, TimeFrame::Day, &[Phase::A], 500);
    let mut rx = h.state.streaming_service.stream_chart(request);

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(first, StreamMessage::Skeleton { .. }));

    let update = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    let StreamMessage::SeriesUpdate { axis, ticks, .. } = update else {
        panic!("expected series update");
    };
    assert_eq!(axis.span_ms, Some(60_000));
    assert_eq!(axis.tick_count, 2);
    assert_eq!(ticks.len(), 2);
}
