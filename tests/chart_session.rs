//! End-to-end chart sessions driven by an in-memory data source.

use mdbi_rs::api::Since;
use mdbi_rs::config::{ALL_METRICS_ID, ChartConfig, MetricConfig, SliderCommit};
use mdbi_rs::loader::{DataSource, LoadOutcome, LoadedData, load_chart_data};
use mdbi_rs::models::{Entity, MetricMeta, RawRow};
use mdbi_rs::viz::{FrameBody, MessageKind, RecordingSurface, Role, render_frame};
use mdbi_rs::{ChartSession, FetchError, LoadState, YearRange};

struct Memory {
    rows: Vec<RawRow>,
}

impl DataSource for Memory {
    fn fetch_values(
        &self,
        _endpoint: &str,
        metric_ids: &[String],
        _since: Since,
    ) -> Result<Vec<RawRow>, FetchError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.metric_id
                    .as_ref()
                    .is_none_or(|m| metric_ids.contains(m))
            })
            .cloned()
            .collect())
    }

    fn fetch_entities(&self) -> Result<Vec<Entity>, FetchError> {
        Ok(vec![
            Entity {
                id: 1,
                code: Some("CAF".into()),
                name: Some("Development Bank of Latin America".into()),
            },
            Entity {
                id: 2,
                code: Some("IADB".into()),
                name: None,
            },
            Entity {
                id: 3,
                code: Some("CABEI".into()),
                name: None,
            },
        ])
    }

    fn fetch_metric_metadata(&self) -> Result<Vec<MetricMeta>, FetchError> {
        Ok(vec![MetricMeta {
            metric_id: "a".into(),
            metric_name: Some("Metric A".into()),
            source: Some("Moody's Investors Service".into()),
        }])
    }
}

fn config(entities: &[i64]) -> ChartConfig {
    let mut cfg = ChartConfig::new(
        vec![
            MetricConfig::show_all("Show all"),
            MetricConfig::new("a", "Metric A"),
            MetricConfig::new("b", "Metric B"),
        ],
        "a",
    );
    cfg.default_entities = entities.to_vec();
    cfg
}

fn load(session: &mut ChartSession, source: &Memory) {
    let req = session.take_load_request().expect("load requested");
    assert!(session.apply_load(load_chart_data(source, &req)));
}

#[test]
fn yoy_tooltip_shows_signed_percent() {
    let source = Memory {
        rows: vec![
            RawRow::new(1, 2019, Some(100.0)).with_metric("a"),
            RawRow::new(1, 2020, Some(110.0)).with_metric("a"),
        ],
    };
    let mut session = ChartSession::new(config(&[1]));
    load(&mut session, &source);
    session.set_yoy(true);

    let frame = session.prepare(900.0, 500.0);
    let panel = &frame.panels()[0];
    assert_eq!(panel.title, "Metric A (Var % YoY)");
    let points = &panel.series[0].points;
    assert_eq!(points[0].value, None);
    assert!((points[1].value.unwrap() - 10.0).abs() < 1e-9);

    let x = panel.x.map(2020.0);
    let y = panel.plot.y + panel.plot.height / 2.0;
    session.pointer_moved(x, y);
    let frame = session.prepare(900.0, 500.0);
    let tooltip = frame.tooltip.as_ref().expect("tooltip");
    assert_eq!(tooltip.header, "Year: 2020");
    assert_eq!(tooltip.rows[0].text, "+10.00%");
    assert_eq!(tooltip.rows[0].label, "CAF");
}

#[test]
fn empty_rows_show_empty_state_without_refetching() {
    let source = Memory { rows: vec![] };
    let mut session = ChartSession::new(config(&[1, 2]));
    load(&mut session, &source);

    assert_eq!(session.state(), &LoadState::Empty);
    let frame = session.prepare(800.0, 400.0);
    assert!(matches!(
        frame.body,
        FrameBody::Message(ref m) if m.kind == MessageKind::Empty
    ));
    assert!(session.take_load_request().is_none());
    session.set_yoy(true);
    assert!(session.take_load_request().is_none());

    assert!(session.select_metric("b"));
    assert!(session.take_load_request().is_some());
}

#[test]
fn late_response_of_superseded_load_is_discarded() {
    let mut session = ChartSession::new(config(&[1]));
    let a = session.take_load_request().unwrap();
    assert!(session.select_metric("b"));
    let b = session.take_load_request().unwrap();
    assert!(b.generation > a.generation);
    assert_eq!(b.metric_ids, vec!["b".to_string()]);

    let rows_b = vec![RawRow::new(1, 2020, Some(2.0)).with_metric("b")];
    let rows_a = vec![RawRow::new(1, 2020, Some(1.0)).with_metric("a")];
    let outcome = |generation, rows| LoadOutcome {
        generation,
        result: Ok(LoadedData {
            rows,
            ..Default::default()
        }),
    };

    assert!(session.apply_load(outcome(b.generation, rows_b.clone())));
    assert!(!session.apply_load(outcome(a.generation, rows_a)));
    assert_eq!(session.rows(), rows_b.as_slice());
    assert_eq!(session.state(), &LoadState::Ready);
}

#[test]
fn left_handle_cannot_cross_right_handle() {
    let rows = (2014..=2023)
        .map(|y| RawRow::new(1, y, Some(y as f64)).with_metric("a"))
        .collect();
    let source = Memory { rows };
    let mut session = ChartSession::new(config(&[1]));
    load(&mut session, &source);
    session.set_year_domain(YearRange::new(2014, 2018));

    let frame = session.prepare(1000.0, 600.0);
    let slider = frame.slider.clone().expect("slider");
    let (left, right) = slider.handles;
    let y = slider.track_y();

    assert!(session.pointer_pressed(left, y));
    assert!(session.is_dragging());
    session.pointer_moved(right + 120.0, y);
    let frame = session.prepare(1000.0, 600.0);
    let dragged = frame.slider.unwrap();
    assert!((dragged.handles.0 - right).abs() < 1e-9);
    assert_eq!(dragged.tip.map(|t| t.year), Some(2018));

    let window = session.pointer_released().expect("committed");
    assert_eq!(window, YearRange::new(2018, 2018));
    assert_eq!(session.view().year_domain, Some(window));
}

#[test]
fn extend_to_edge_commit_snaps_other_handle() {
    let rows = (2014..=2023)
        .map(|y| RawRow::new(1, y, Some(1.0 + y as f64)).with_metric("a"))
        .collect();
    let source = Memory { rows };
    let mut cfg = config(&[1]);
    cfg.slider_commit = SliderCommit::ExtendToEdge;
    let mut session = ChartSession::new(cfg);
    load(&mut session, &source);
    session.set_year_domain(YearRange::new(2016, 2020));

    let frame = session.prepare(1000.0, 600.0);
    let slider = frame.slider.unwrap();
    let y = slider.track_y();
    assert!(session.pointer_pressed(slider.handles.0, y));
    session.pointer_moved(slider.handles.0, y);
    let window = session.pointer_released().unwrap();
    assert_eq!(window, YearRange::new(2016, 2023));
}

#[test]
fn grid_mode_renders_each_metric_with_attribution() {
    let mut rows = Vec::new();
    for y in 2015..=2020 {
        rows.push(RawRow::new(1, y, Some(1.0 + y as f64)).with_metric("a"));
        rows.push(RawRow::new(2, y, Some(2.0 * y as f64)).with_metric("b"));
    }
    let source = Memory { rows };
    let mut session = ChartSession::new(config(&[1, 2]));
    assert!(session.select_metric(ALL_METRICS_ID));
    load(&mut session, &source);

    let frame = session.prepare(1000.0, 800.0);
    let titles: Vec<&str> = frame.panels().iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Metric A", "Metric B"]);
    assert_eq!(frame.attributions.len(), 1);

    let mut surface = RecordingSurface::new();
    render_frame(&frame, &mut surface).unwrap();
    assert_eq!(surface.texts_with_role(Role::Title), vec!["Metric A", "Metric B"]);
    assert!(!surface.texts().contains(&"Loading…"));
    assert_eq!(
        surface.texts_with_role(Role::Attribution),
        vec!["Source: Moody's"]
    );
    assert!(surface.with_role(Role::Line(1)).count() >= 1);
    assert!(surface.with_role(Role::Line(2)).count() >= 1);
    assert_eq!(surface.with_role(Role::Label(1)).count(), 0);
}

#[test]
fn legend_and_picker_follow_selection() {
    let rows = vec![
        RawRow::new(1, 2020, Some(1.0)).with_metric("a"),
        RawRow::new(2, 2020, Some(2.0)).with_metric("a"),
        RawRow::new(3, 2020, Some(3.0)).with_metric("a"),
        RawRow::new(4, 2020, Some(4.0)).with_metric("a"),
    ];
    let source = Memory { rows };
    let mut session = ChartSession::new(config(&[2, 1]));
    load(&mut session, &source);

    let legend: Vec<String> = session
        .legend_entries()
        .into_iter()
        .map(|e| e.label)
        .collect();
    assert_eq!(legend, vec!["IADB", "CAF"]);

    let addable: Vec<String> = session
        .addable_entities()
        .iter()
        .map(|e| e.label())
        .collect();
    assert_eq!(addable, vec!["CABEI", "4"]);

    assert!(session.add_entity(4));
    session.toggle_visibility(2);
    let legend = session.legend_entries();
    assert_eq!(legend.len(), 3);
    assert!(legend[0].hidden);
    assert_eq!(legend[2].label, "4");
}

fn assert_empty_frame(session: &mut ChartSession, width: f64, height: f64) {
    let frame = session.prepare(width, height);
    assert!(
        matches!(&frame.body, FrameBody::Message(m) if m.kind == MessageKind::Empty),
        "{width}x{height} should fall back to the empty state"
    );
    let mut surface = RecordingSurface::new();
    render_frame(&frame, &mut surface).unwrap();
}

#[test]
fn canvas_too_small_for_plot_falls_back_to_empty_state() {
    let source = Memory {
        rows: vec![
            RawRow::new(1, 2019, Some(100.0)).with_metric("a"),
            RawRow::new(1, 2020, Some(110.0)).with_metric("a"),
            RawRow::new(2, 2020, Some(90.0)).with_metric("b"),
        ],
    };
    let mut session = ChartSession::new(config(&[1, 2]));
    load(&mut session, &source);

    for (w, h) in [
        (900.0, 100.0),
        (0.0, 0.0),
        (-40.0, 500.0),
        (f64::NAN, 500.0),
        (900.0, f64::INFINITY),
    ] {
        assert_empty_frame(&mut session, w, h);
    }
    assert_eq!(*session.state(), LoadState::Ready);

    // grid canvas tall enough for the outer margins but not for the subchart margins
    assert!(session.select_metric(ALL_METRICS_ID));
    load(&mut session, &source);
    assert_empty_frame(&mut session, 900.0, 180.0);
    assert_eq!(session.prepare(1000.0, 800.0).panels().len(), 2);

    assert!(session.select_metric("a"));
    load(&mut session, &source);
    assert_eq!(session.prepare(900.0, 500.0).panels().len(), 1);
}
