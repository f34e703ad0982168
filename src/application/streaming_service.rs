// Streaming service - Progressive delivery of live charts and overview tiles
use crate::application::data_hub::DataHub;
use crate::application::dashboard_service;
use crate::application::live_chart::{ChartRequest, LiveChart};
use crate::application::series_board::{BoardEvent, SeriesBoard};
use crate::application::subscriber::SeriesSubscriber;
use crate::domain::axis::{self, AxisPlan, AxisTick};
use crate::domain::dashboard::Dashboard;
use crate::domain::telemetry::{ChartSkeleton, NamedSeries};
use chrono::FixedOffset;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Chart layout, sent once before any data.
    Skeleton { chart: ChartSkeleton },
    /// New data for one series slot, with the axis plan of the whole chart.
    SeriesUpdate {
        index: usize,
        series: NamedSeries,
        axis: AxisPlan,
        ticks: Vec<AxisTick>,
    },
    Overview { loading: bool, dashboard: Dashboard },
}

#[derive(Clone)]
pub struct StreamingService {
    subscriber: SeriesSubscriber,
    hub: Arc<DataHub>,
    offset: FixedOffset,
}

impl StreamingService {
    pub fn new(subscriber: SeriesSubscriber, hub: Arc<DataHub>, offset: FixedOffset) -> Self {
        Self {
            subscriber,
            hub,
            offset,
        }
    }

    /// Stream a live chart for as long as the receiver is held. Dropping the
    /// receiver tears down every subscription of the chart.
    pub fn stream_chart(&self, request: ChartRequest) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let skeleton = request.skeleton();
        let chart_id = request.id.clone();

        let mut chart = LiveChart::new(self.subscriber.clone());
        let board = chart.board();
        // Listen before subscribing so the first slot updates are not missed
        let mut events = board.events();
        chart.configure(request);

        let offset = self.offset;
        tokio::spawn(async move {
            if tx.send(StreamMessage::Skeleton { chart: skeleton }).await.is_err() {
                return;
            }

            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    event = events.recv() => event,
                };

                let indices: Vec<usize> = match event {
                    Ok(BoardEvent::Slot(index)) => vec![index],
                    Ok(BoardEvent::Reset) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(chart = %chart_id, "Board lagged by {}, resending all slots", skipped);
                        (0..board.snapshot().len()).collect()
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                for index in indices {
                    let Some(msg) = series_update(&board, index, offset) else {
                        continue;
                    };
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
            }

            chart.teardown();
            tracing::info!(chart = %chart_id, "Chart stream closed");
        });

        rx
    }

    /// Stream overview tiles: the current state first, then one message per snapshot.
    pub fn stream_overview(&self) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut updates = WatchStream::new(self.hub.subscribe());

        tokio::spawn(async move {
            loop {
                let state = tokio::select! {
                    _ = tx.closed() => break,
                    state = updates.next() => state,
                };
                let Some(state) = state else {
                    break;
                };

                let msg = StreamMessage::Overview {
                    loading: !state.loaded,
                    dashboard: dashboard_service::overview(state.snapshot.as_deref()),
                };
                if tx.send(msg).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Overview stream closed");
        });

        rx
    }
}

fn series_update(board: &SeriesBoard, index: usize, offset: FixedOffset) -> Option<StreamMessage> {
    let series = board.slot(index)?;
    let axis = board.axis_plan();
    Some(StreamMessage::SeriesUpdate {
        index,
        series,
        ticks: axis::ticks(&axis, offset),
        axis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::live_chart::SeriesSource;
    use crate::application::subscriber::RefreshPolicy;
    use crate::domain::phase::TimeWindow;
    use crate::domain::telemetry::{PhaseSnapshot, RawTimestamp, RawValue};
    use crate::infrastructure::memory_repository::InMemoryRepository;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn document(time_ms: i64, va: f64) -> PhaseSnapshot {
        let mut fields = BTreeMap::new();
        fields.insert("Va".to_string(), RawValue::Number(va));
        let mut snapshot = PhaseSnapshot::new(fields);
        snapshot.created_at = Some(RawTimestamp::EpochMillis(time_ms as f64));
        snapshot
    }

    fn service(repository: Arc<InMemoryRepository>) -> (StreamingService, Arc<DataHub>) {
        let hub = Arc::new(DataHub::new(repository.clone(), Duration::from_secs(3600), None));
        let subscriber = SeriesSubscriber::new(
            repository,
            RefreshPolicy {
                interval: Duration::from_secs(3600),
                fetch_timeout: None,
            },
        );
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        (StreamingService::new(subscriber, hub.clone(), offset), hub)
    }

    fn request() -> ChartRequest {
        ChartRequest {
            id: "tensao".to_string(),
            title: "Tensão".to_string(),
            unit: Some("V".to_string()),
            sources: vec![SeriesSource {
                name: "Fase A".to_string(),
                variable: "Va".to_string(),
                color: None,
            }],
            window: TimeWindow::Fixed { start: None, end: None },
            max_points: 100,
        }
    }

    async fn next(rx: &mut mpsc::Receiver<StreamMessage>) -> StreamMessage {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("message within deadline")
            .expect("stream open")
    }

    #[tokio::test]
    async fn test_chart_stream_sends_skeleton_then_updates() {
        let repository = Arc::new(InMemoryRepository::with_documents(vec![
            document(1000, 220.0),
            document(2000, 221.0),
        ]));
        let (service, _hub) = service(repository.clone());
        let mut rx = service.stream_chart(request());

        match next(&mut rx).await {
            StreamMessage::Skeleton { chart } => {
                assert_eq!(chart.id, "tensao");
                assert_eq!(chart.series[0].name, "Fase A");
            }
            other => panic!("expected skeleton, got {:?}", other),
        }

        match next(&mut rx).await {
            StreamMessage::SeriesUpdate { index, series, axis, .. } => {
                assert_eq!(index, 0);
                assert_eq!(series.data.len(), 2);
                assert_eq!(axis.span_ms, Some(1000));
                assert_eq!(axis.tick_count, 2);
            }
            other => panic!("expected series update, got {:?}", other),
        }

        repository.push(document(3000, 222.0));
        match next(&mut rx).await {
            StreamMessage::SeriesUpdate { series, .. } => assert_eq!(series.data.len(), 3),
            other => panic!("expected series update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropping_receiver_tears_down_subscriptions() {
        let repository = Arc::new(InMemoryRepository::with_documents(vec![document(1000, 220.0)]));
        let (service, _hub) = service(repository.clone());
        let mut rx = service.stream_chart(request());
        next(&mut rx).await;
        next(&mut rx).await;
        assert_eq!(repository.push_listeners(), 1);

        drop(rx);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while repository.push_listeners() > 0 {
            assert!(tokio::time::Instant::now() < deadline, "subscription still attached");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_overview_stream_follows_snapshots() {
        let repository = Arc::new(InMemoryRepository::new());
        let (service, hub) = service(repository.clone());
        let mut rx = service.stream_overview();

        match next(&mut rx).await {
            StreamMessage::Overview { loading, dashboard } => {
                assert!(loading);
                assert_eq!(dashboard.tiles[0].display, "--");
            }
            other => panic!("expected overview, got {:?}", other),
        }

        hub.start();
        repository.push(document(1000, 221.0));
        loop {
            if let StreamMessage::Overview { dashboard, .. } = next(&mut rx).await {
                if dashboard.tiles[0].display == "221.00 V" {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = StreamMessage::SeriesUpdate {
            index: 1,
            series: NamedSeries::empty("Fase B"),
            axis: AxisPlan::for_series(&[]),
            ticks: Vec::new(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "series_update");
        assert_eq!(value["index"], 1);
        assert_eq!(value["axis"]["has_data"], false);
    }
}
