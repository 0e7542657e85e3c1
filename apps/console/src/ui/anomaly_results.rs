use dioxus::prelude::*;
use dioxus_router::prelude::*;

use crate::format::{format_bucket_label, format_datetime, format_duration_ms};
use crate::heatmap::builder::{
    column_of, HeatmapDataKind, HeatmapStrategy, SampleStrategy, SummaryStrategy,
};
use crate::heatmap::interaction::{HeatmapEffect, HeatmapInteraction, HeatmapMessage};
use crate::heatmap::{
    severity_color, CellPosition, EntityOption, HeatmapCell, SortType, TOP_N_OPTIONS,
};
use crate::hooks::anomaly_results::use_anomaly_results;
use crate::hooks::detector::use_detector;
use crate::models::{entity_label, AnomalyRecord, DateRange, Detector};
use crate::preferences::Preferences;
use crate::state::use_app_state;
use crate::ui::browser::now_ms;
use crate::ui::fields::{ErrorCallout, BUTTON_CLASS, INPUT_CLASS, SECONDARY_BUTTON_CLASS};
use crate::Route;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;
const RANGE_PRESETS: [(&str, i64); 3] = [
    ("Last 24 hours", DAY_MS),
    ("Last 7 days", 7 * DAY_MS),
    ("Last 30 days", 30 * DAY_MS),
];
const INDIVIDUAL: &str = "individual";

fn preset_class(active: bool) -> &'static str {
    if active {
        BUTTON_CLASS
    } else {
        SECONDARY_BUTTON_CLASS
    }
}

fn range_ending_at(end_ms: i64, span_ms: i64) -> DateRange {
    DateRange::new(end_ms - span_ms, end_ms)
}

/// Multi-entity detectors are charted from backend summaries, single-entity
/// detectors from their raw results.
fn data_kind(detector: &Detector) -> HeatmapDataKind {
    if detector.is_multi_entity() {
        HeatmapDataKind::Aggregated
    } else {
        HeatmapDataKind::Sample
    }
}

fn entity_option_value(option: &EntityOption) -> String {
    match option {
        EntityOption::TopN(top_n) => format!("top-{top_n}"),
        EntityOption::Individual(_) => INDIVIDUAL.to_string(),
    }
}

/// Parses an entity picker value. Switching to individual entities starts
/// from the rows currently shown.
fn parse_entity_option(value: &str, shown: &[String]) -> Option<EntityOption> {
    if value == INDIVIDUAL {
        return Some(EntityOption::Individual(shown.to_vec()));
    }
    value
        .strip_prefix("top-")
        .and_then(|top_n| top_n.parse().ok())
        .map(EntityOption::TopN)
}

fn toggle_label(labels: &[String], label: &str) -> Vec<String> {
    if labels.iter().any(|existing| existing == label) {
        labels.iter().filter(|existing| *existing != label).cloned().collect()
    } else {
        let mut next = labels.to_vec();
        next.push(label.to_string());
        next
    }
}

/// Raw anomalies the grid counted in a selected cell of a heatmap over `range`.
fn anomalies_in_cell<'a>(
    records: &'a [AnomalyRecord],
    range: &DateRange,
    cell: &HeatmapCell,
) -> Vec<&'a AnomalyRecord> {
    let Some(column) = column_of(range, cell.date_range.start_ms) else {
        return Vec::new();
    };
    let label = entity_label(&cell.entity_list);
    records
        .iter()
        .filter(|record| record.is_anomaly())
        .filter(|record| column_of(range, record.start_ms) == Some(column))
        .filter(|record| entity_label(&record.entity) == label)
        .collect()
}

fn cell_class(selected: bool) -> &'static str {
    if selected {
        "h-6 w-8 cursor-pointer text-center text-white outline outline-2 outline-slate-900"
    } else {
        "h-6 w-8 cursor-pointer text-center text-white"
    }
}

fn source_note(kind: HeatmapDataKind) -> &'static str {
    match kind {
        HeatmapDataKind::Aggregated => "Entity summaries computed by the detector.",
        HeatmapDataKind::Sample => "Bucketed from raw anomaly results.",
    }
}

/// Signals behind one heatmap chart.
#[derive(Clone, Copy)]
struct HeatmapSignals {
    interaction: Signal<Option<HeatmapInteraction>>,
    selected: Signal<Option<HeatmapCell>>,
    summary_top_n: Signal<usize>,
    preferences: Signal<Preferences>,
}

impl HeatmapSignals {
    fn dispatch(self, message: HeatmapMessage) {
        let Self {
            mut interaction,
            mut selected,
            mut summary_top_n,
            mut preferences,
        } = self;

        let (effects, option) = {
            let mut slot = interaction.write();
            let Some(heatmap) = slot.as_mut() else {
                return;
            };
            let effects = heatmap.update(message);
            (effects, heatmap.display_option().clone())
        };

        for effect in effects {
            match effect {
                HeatmapEffect::SelectionChanged(cell) => selected.set(cell),
                HeatmapEffect::RefetchSummary { top_n } => {
                    tracing::debug!(top_n, "refetching entity summaries");
                    summary_top_n.set(top_n);
                }
            }
        }

        let mut prefs = preferences.write();
        if prefs.remember_heatmap(&option) {
            prefs.save();
        }
    }
}

#[component]
pub fn DetectorResults(detector_id: String) -> Element {
    use_detector(Some(detector_id.clone()));

    let state = use_app_state();
    let (detector, detail_error, results) = {
        let snapshot = state.read();
        let detector = snapshot
            .detector
            .detector
            .clone()
            .filter(|detector| detector.id == detector_id);
        (detector, snapshot.detector.error.clone(), snapshot.results.clone())
    };

    let mut span_ms = use_signal(|| DAY_MS);
    let mut range = use_signal(|| range_ending_at(now_ms(), DAY_MS));
    let preferences = use_signal(Preferences::load);
    let summary_top_n = use_signal(|| preferences.peek().heatmap_top_n);
    let mut selected = use_signal(|| None::<HeatmapCell>);
    let mut interaction = use_signal(|| None::<HeatmapInteraction>);
    let mut built_revision = use_signal(|| 0u64);

    let kind = detector.as_ref().map(data_kind);
    use_anomaly_results(detector_id.clone(), range(), kind, summary_top_n());

    use_effect(use_reactive!(|kind, detector_id| {
        let Some(kind) = kind else {
            return;
        };
        let snapshot = state.read();
        let results = &snapshot.results;
        if results.detector_id.as_deref() != Some(detector_id.as_str())
            || results.revision == *built_revision.peek()
        {
            return;
        }
        let Some(range) = results.range else {
            return;
        };
        let strategy: Box<dyn HeatmapStrategy> = match kind {
            HeatmapDataKind::Aggregated => {
                Box::new(SummaryStrategy::new(results.summaries.clone()))
            }
            HeatmapDataKind::Sample => Box::new(SampleStrategy::new(results.samples.clone())),
        };
        let revision = results.revision;

        let mut slot = interaction.write();
        match slot.as_mut() {
            Some(heatmap) => heatmap.replace_data(strategy.as_ref(), range),
            None => {
                let display = preferences.peek().heatmap_display_option();
                *slot = Some(HeatmapInteraction::new(strategy.as_ref(), range, display));
            }
        }
        selected.set(None);
        built_revision.set(revision);
    }));

    let signals = HeatmapSignals {
        interaction,
        selected,
        summary_top_n,
        preferences,
    };

    let Some(detector) = detector else {
        return rsx! {
            section { class: "rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
                if let Some(error) = detail_error {
                    ErrorCallout { title: "Unable to load detector", message: error }
                } else {
                    p { class: "text-sm text-slate-500", "Loading detector…" }
                }
            }
        };
    };

    let current_range = range();
    let current_span = span_ms();
    let interval = format_duration_ms(i64::from(detector.detection_interval_minutes) * 60_000);

    let chart = match interaction.read().as_ref() {
        Some(heatmap) => render_heatmap(heatmap, signals),
        None if results.is_loading => rsx! {
            p { class: "text-sm text-slate-500", "Loading anomalies…" }
        },
        None => rsx! {},
    };

    let plotted_range = interaction.read().as_ref().map(HeatmapInteraction::range);
    let detail = selected.read().clone().zip(plotted_range).map(|(cell, plotted_range)| {
        let records = anomalies_in_cell(&results.samples, &plotted_range, &cell);
        let label = entity_label(&cell.entity_list);
        let rows: Vec<(String, String, String)> = records
            .iter()
            .map(|record| {
                (
                    format_datetime(record.start_ms),
                    format!("{:.2}", record.anomaly_grade),
                    format!("{:.2}", record.confidence),
                )
            })
            .collect();
        rsx! {
            div { class: "space-y-2 rounded border border-slate-200 p-3",
                div { class: "flex items-center justify-between",
                    h2 { class: "text-sm font-semibold text-slate-900", "Selected cell" }
                    button {
                        class: SECONDARY_BUTTON_CLASS,
                        onclick: move |_| signals.dispatch(HeatmapMessage::ClearSelection),
                        "Clear"
                    }
                }
                if !label.is_empty() {
                    p { class: "whitespace-pre-line text-xs text-slate-700", "{label}" }
                }
                p { class: "text-xs text-slate-500",
                    "{format_datetime(cell.date_range.start_ms)} to {format_datetime(cell.date_range.end_ms)}"
                }
                if let Some(model_id) = cell.model_id.clone() {
                    p { class: "text-[11px] text-slate-400", "Model {model_id}" }
                }
                if !rows.is_empty() {
                    table { class: "w-full text-left text-xs",
                        thead {
                            tr { class: "text-slate-500",
                                th { "Start" }
                                th { "Grade" }
                                th { "Confidence" }
                            }
                        }
                        tbody {
                            for (start, grade, confidence) in rows {
                                tr {
                                    td { "{start}" }
                                    td { "{grade}" }
                                    td { "{confidence}" }
                                }
                            }
                        }
                    }
                }
            }
        }
    });

    rsx! {
        section { class: "space-y-4 rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
            header { class: "flex flex-wrap items-center justify-between gap-2",
                div {
                    h1 { class: "text-lg font-semibold text-slate-900", "Anomalies for {detector.name}" }
                    p { class: "text-xs text-slate-500",
                        "Interval {interval} · {format_datetime(current_range.start_ms)} to {format_datetime(current_range.end_ms)}"
                    }
                }
                div { class: "flex flex-wrap gap-2",
                    for (label, preset) in RANGE_PRESETS {
                        button {
                            key: "{preset}",
                            class: preset_class(preset == current_span),
                            onclick: move |_| {
                                span_ms.set(preset);
                                range.set(range_ending_at(now_ms(), preset));
                            },
                            "{label}"
                        }
                    }
                    button {
                        class: SECONDARY_BUTTON_CLASS,
                        disabled: results.is_loading,
                        onclick: move |_| range.set(range_ending_at(now_ms(), span_ms())),
                        "Refresh"
                    }
                    Link {
                        class: "{SECONDARY_BUTTON_CLASS}",
                        to: Route::DetectorConfig { detector_id: detector.id.clone() },
                        "Configure"
                    }
                }
            }

            if let Some(error) = results.error.clone() {
                ErrorCallout { title: "Unable to load anomaly results", message: error }
            }

            {chart}
            {detail}
        }
    }
}

fn render_heatmap(heatmap: &HeatmapInteraction, signals: HeatmapSignals) -> Element {
    let display = heatmap.display_option().clone();
    let plot = heatmap.plot().clone();
    let overlay = heatmap.overlay().cloned();
    let selected = heatmap.selected();
    let source = source_note(heatmap.kind());
    let all_labels = heatmap.entity_labels().to_vec();
    let option_value = entity_option_value(&display.entity_option);
    let individual = match &display.entity_option {
        EntityOption::Individual(labels) => Some(labels.clone()),
        EntityOption::TopN(_) => None,
    };
    let column_labels: Vec<String> = plot
        .x
        .iter()
        .map(|start| format_bucket_label(*start, plot.cell_time_interval_ms))
        .collect();

    let rows: Vec<(usize, String, Vec<(usize, &str, String, f64, String)>)> = plot
        .y
        .iter()
        .enumerate()
        .map(|(y, label)| {
            let cells = (0..plot.column_count())
                .map(|x| {
                    let pos = CellPosition { x, y };
                    let value = plot.cell(pos);
                    let opacity = overlay
                        .as_ref()
                        .filter(|overlay| overlay.cell(pos).is_some())
                        .map_or(plot.opacity, |overlay| overlay.opacity);
                    let text = value
                        .filter(|value| value.occurrences > 0)
                        .map(|value| value.occurrences.to_string())
                        .unwrap_or_default();
                    let class = cell_class(selected == Some(pos));
                    (x, class, severity_color(value), opacity, text)
                })
                .collect();
            (y, label.clone(), cells)
        })
        .collect();

    let picker = individual.map(|chosen| {
        rsx! {
            div { class: "flex flex-wrap gap-3",
                for entity in all_labels {
                    label { class: "flex items-center gap-1 whitespace-pre-line text-xs text-slate-600",
                        input {
                            r#type: "checkbox",
                            checked: chosen.contains(&entity),
                            onchange: {
                                let chosen = chosen.clone();
                                let entity = entity.clone();
                                move |_| {
                                    signals.dispatch(HeatmapMessage::SetEntityOption(
                                        EntityOption::Individual(toggle_label(&chosen, &entity)),
                                    ))
                                }
                            },
                        }
                        "{entity}"
                    }
                }
            }
        }
    });

    rsx! {
        div { class: "space-y-3",
            div { class: "flex flex-wrap items-center gap-2",
                select {
                    class: INPUT_CLASS,
                    onchange: move |evt: FormEvent| {
                        let sort_type = if evt.value() == "occurrence" {
                            SortType::Occurrence
                        } else {
                            SortType::Severity
                        };
                        signals.dispatch(HeatmapMessage::SetSortType(sort_type));
                    },
                    option { value: "severity", selected: display.sort_type == SortType::Severity, "{SortType::Severity.label()}" }
                    option { value: "occurrence", selected: display.sort_type == SortType::Occurrence, "{SortType::Occurrence.label()}" }
                }
                select {
                    class: INPUT_CLASS,
                    onchange: {
                        let shown = plot.y.clone();
                        move |evt: FormEvent| {
                            if let Some(option) = parse_entity_option(&evt.value(), &shown) {
                                signals.dispatch(HeatmapMessage::SetEntityOption(option));
                            }
                        }
                    },
                    for top_n in TOP_N_OPTIONS {
                        option {
                            value: "top-{top_n}",
                            selected: option_value == format!("top-{top_n}"),
                            "Top {top_n} entities"
                        }
                    }
                    option { value: INDIVIDUAL, selected: option_value == INDIVIDUAL, "Individual entities" }
                }
            }
            {picker}
            p { class: "text-xs text-slate-400", "{source}" }
            if plot.is_empty() {
                p { class: "text-sm text-slate-500", "No anomalies found in the selected time range." }
            } else {
                div { class: "overflow-x-auto",
                    table { class: "border-separate border-spacing-0.5 text-[10px]",
                        tbody {
                            for (y, label, cells) in rows {
                                tr { key: "{label}",
                                    th { class: "whitespace-pre-line pr-2 text-left font-normal text-slate-600", "{label}" }
                                    for (x, class, color, opacity, text) in cells {
                                        td {
                                            key: "{x}",
                                            class,
                                            style: "background-color: {color}; opacity: {opacity};",
                                            onclick: move |_| signals.dispatch(HeatmapMessage::ClickCell(CellPosition { x, y })),
                                            "{text}"
                                        }
                                    }
                                }
                            }
                            tr {
                                th {}
                                for (x, column) in column_labels.into_iter().enumerate() {
                                    td { key: "{x}", class: "px-0.5 text-center text-slate-400", "{column}" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;

    #[test]
    fn presets_end_at_the_given_instant() {
        let range = range_ending_at(10 * DAY_MS, 7 * DAY_MS);
        assert_eq!(range.start_ms, 3 * DAY_MS);
        assert_eq!(range.span_ms(), 7 * DAY_MS);
    }

    #[test]
    fn data_kind_follows_category_fields() {
        let mut detector = Detector::default();
        assert_eq!(data_kind(&detector), HeatmapDataKind::Sample);
        detector.category_fields = vec!["host".into()];
        assert_eq!(data_kind(&detector), HeatmapDataKind::Aggregated);
    }

    #[test]
    fn selected_cell_is_outlined() {
        assert!(cell_class(true).contains("outline"));
        assert!(!cell_class(false).contains("outline"));
        assert_ne!(
            source_note(HeatmapDataKind::Aggregated),
            source_note(HeatmapDataKind::Sample)
        );
    }

    #[test]
    fn entity_picker_values() {
        let shown = vec!["a".to_string(), "b".to_string()];
        assert_eq!(parse_entity_option("top-20", &shown), Some(EntityOption::TopN(20)));
        assert_eq!(
            parse_entity_option(INDIVIDUAL, &shown),
            Some(EntityOption::Individual(shown.clone()))
        );
        assert_eq!(parse_entity_option("top-x", &shown), None);
        assert_eq!(entity_option_value(&EntityOption::TopN(10)), "top-10");
        assert_eq!(toggle_label(&shown, "a"), vec!["b".to_string()]);
        assert_eq!(toggle_label(&shown, "c").len(), 3);
    }

    #[test]
    fn cell_detail_matches_entity_and_bucket() {
        let host = |value: &str| {
            vec![Entity {
                name: "host".into(),
                value: value.into(),
            }]
        };
        let record = |entity: Vec<Entity>, start_ms: i64, anomaly_grade: f64| AnomalyRecord {
            entity,
            start_ms,
            end_ms: start_ms + 10,
            anomaly_grade,
            ..Default::default()
        };
        let records = vec![
            record(host("a"), 5, 0.8),
            record(host("a"), 50, 0.8),
            record(host("b"), 5, 0.8),
            record(host("a"), 6, 0.0),
        ];
        let cell = HeatmapCell {
            date_range: DateRange::new(0, 10),
            entity_list: host("a"),
            model_id: None,
        };
        let matched = anomalies_in_cell(&records, &DateRange::new(0, 200), &cell);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].start_ms, 5);
    }

    #[test]
    fn record_on_a_bucket_boundary_shows_in_one_cell_only() {
        let range = DateRange::new(0, 2_000);
        let records = vec![AnomalyRecord {
            start_ms: 100,
            end_ms: 200,
            anomaly_grade: 0.9,
            ..Default::default()
        }];
        let cell = |start_ms: i64| HeatmapCell {
            date_range: DateRange::new(start_ms, start_ms + 100),
            entity_list: Vec::new(),
            model_id: None,
        };
        assert!(anomalies_in_cell(&records, &range, &cell(0)).is_empty());
        assert_eq!(anomalies_in_cell(&records, &range, &cell(100)).len(), 1);

        let closing = vec![AnomalyRecord {
            start_ms: 2_000,
            anomaly_grade: 0.9,
            ..Default::default()
        }];
        assert_eq!(anomalies_in_cell(&closing, &range, &cell(1_900)).len(), 1);
    }
}
