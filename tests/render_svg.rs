use std::fs;

use mdbi_rs::config::{ChartConfig, ChartKind, MetricConfig};
use mdbi_rs::loader::{LoadOutcome, LoadedData};
use mdbi_rs::models::{Entity, RawRow};
use mdbi_rs::viz::{ChartFrame, FrameBody, MessageKind};
use mdbi_rs::{ChartSession, RenderError, viz};

fn session(kind: ChartKind) -> ChartSession {
    let mut cfg = ChartConfig::new(
        vec![MetricConfig::new("sp_08", "Total Assets").millions_usd()],
        "sp_08",
    );
    cfg.default_entities = vec![11, 13];
    cfg.with_area = true;
    cfg.kind = kind;

    let mut rows = Vec::new();
    for (i, y) in (2016..=2022).enumerate() {
        rows.push(RawRow::new(11, y, Some(8_000_000.0 + i as f64 * 1_000_000.0)));
        // 2019 missing for 13 leaves a gap in its line
        let v = if y == 2019 { None } else { Some(5_000_000.0) };
        rows.push(RawRow::new(13, y, v));
    }
    let entities = vec![
        Entity {
            id: 11,
            code: Some("CAF".into()),
            name: None,
        },
        Entity {
            id: 13,
            code: Some("IADB".into()),
            name: None,
        },
    ];

    let mut s = ChartSession::new(cfg);
    let req = s.take_load_request().unwrap();
    s.apply_load(LoadOutcome {
        generation: req.generation,
        result: Ok(LoadedData {
            rows,
            entities: Some(entities),
            metrics: None,
        }),
    });
    s
}

#[test]
fn line_chart_writes_svg() {
    let mut s = session(ChartKind::Line);
    let frame = s.prepare(1000.0, 600.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.svg");
    viz::render_to_file(&frame, &path).unwrap();

    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Total Assets"));
    assert!(svg.contains("CAF"));
    assert!(svg.contains("M USD"));
}

#[test]
fn bar_chart_writes_svg() {
    let mut s = session(ChartKind::LatestBar);
    let frame = s.prepare(800.0, 500.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.svg");
    viz::render_to_file(&frame, &path).unwrap();

    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("IADB"));
    // latest CAF value is 14,000,000 shown in millions
    assert!(svg.contains("14.00 M USD"));
}

#[test]
fn unknown_extension_is_rejected() {
    let mut s = session(ChartKind::Line);
    let frame = s.prepare(400.0, 300.0);
    let dir = tempfile::tempdir().unwrap();
    let err = viz::render_to_file(&frame, dir.path().join("chart.jpg")).unwrap_err();
    assert!(err.to_string().contains("unsupported output format"));
}

#[test]
fn negative_latest_values_hang_below_zero_baseline() {
    let mut cfg = ChartConfig::new(vec![MetricConfig::new("sp_15", "Net income")], "sp_15");
    cfg.default_entities = vec![11, 13];
    cfg.kind = ChartKind::LatestBar;
    let rows = vec![
        RawRow::new(11, 2021, Some(-2.0)),
        RawRow::new(11, 2022, Some(-4.0)),
        RawRow::new(13, 2022, Some(-1.5)),
    ];
    let mut s = ChartSession::new(cfg);
    let req = s.take_load_request().unwrap();
    s.apply_load(LoadOutcome {
        generation: req.generation,
        result: Ok(LoadedData {
            rows,
            entities: None,
            metrics: None,
        }),
    });

    let frame = s.prepare(800.0, 500.0);
    let FrameBody::Bars(bars) = &frame.body else {
        panic!("expected a bar chart, got {:?}", frame.body);
    };
    let (lo, hi) = bars.y.domain_bounds();
    assert!(lo < -4.0, "domain {lo}..{hi}");
    assert!(hi >= 0.0);

    let base = bars.y.map(0.0);
    assert!(base >= bars.plot.y && base <= bars.plot.bottom());
    let values: Vec<f64> = bars.bars.iter().map(|b| b.value).collect();
    assert_eq!(values, vec![-4.0, -1.5]);
    for bar in &bars.bars {
        assert!(bar.rect.height > 0.0);
        assert!((bar.rect.y - base).abs() < 1e-9);
    }
    assert!(bars.bars[0].rect.height > bars.bars[1].rect.height);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("net_income.svg");
    viz::render_to_file(&frame, &path).unwrap();
    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("-4.00"));
    assert!(svg.contains("-1.50"));
}

#[test]
fn undersized_canvas_renders_empty_state() {
    let mut s = session(ChartKind::Line);
    let frame = s.prepare(900.0, 100.0);
    assert!(matches!(&frame.body, FrameBody::Message(m) if m.kind == MessageKind::Empty));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.svg");
    viz::render_to_file(&frame, &path).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("No data"));
}

#[test]
fn unusable_sizes_are_reported_not_drawn() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.svg");
    for (w, h) in [
        (0.0, 0.0),
        (f64::NAN, 300.0),
        (400.0, f64::INFINITY),
        (-10.0, 300.0),
    ] {
        let frame = ChartFrame::message(w, h, MessageKind::Empty, "x");
        assert!(
            matches!(
                viz::render_to_file(&frame, &path),
                Err(RenderError::InvalidSize { .. })
            ),
            "{w}x{h}"
        );
    }
    assert!(!path.exists());

    let mut s = session(ChartKind::LatestBar);
    let frame = s.prepare(0.0, 0.0);
    assert!(viz::render_to_file(&frame, &path).is_err());
}
