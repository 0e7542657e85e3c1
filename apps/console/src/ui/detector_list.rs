use dioxus::prelude::*;
use dioxus_router::prelude::*;

use crate::detectors::list::{page_count, visible_detectors};
use crate::detectors::{detectors_for_action, DetectorAction};
use crate::format::format_optional_datetime;
use crate::hooks::detector_list::{load_detector_list, run_batch_action, use_detector_list};
use crate::models::{DetectorListItem, DetectorState};
use crate::preferences::Preferences;
use crate::query::{GetDetectorsQueryParams, SortDirection};
use crate::state::{use_app_actions, use_app_state};
use crate::ui::browser::confirm;
use crate::ui::fields::{ErrorCallout, BUTTON_CLASS, INPUT_CLASS, SECONDARY_BUTTON_CLASS};
use crate::{Route, APP_CONFIG};

const CHIP_BASE_CLASS: &str = "px-3 py-1 rounded-full border text-xs transition-colors";
const CHIP_ACTIVE_CLASS: &str = "bg-slate-900 text-white border-slate-900";
const CHIP_INACTIVE_CLASS: &str = "bg-white text-slate-600 border-slate-300 hover:bg-slate-100";

const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 20, 50, 100];

const COLUMNS: [(&str, &str); 6] = [
    ("name", "Detector"),
    ("indices", "Indices"),
    ("curState", "State"),
    ("totalAnomalies", "Anomalies last 24h"),
    ("lastActiveAnomaly", "Last anomaly"),
    ("lastUpdateTime", "Last updated"),
];

/// Confirmation text listing the detectors an action will touch.
pub fn confirm_message(
    action: DetectorAction,
    eligible: &[DetectorListItem],
    skipped: usize,
) -> String {
    let names = eligible
        .iter()
        .map(|item| format!("  - {}", item.name))
        .collect::<Vec<_>>()
        .join("\n");
    let mut message = format!(
        "{} the following {} detector(s)?\n{names}",
        action.verb(),
        eligible.len()
    );
    if skipped > 0 {
        message.push_str(&format!(
            "\n\n{skipped} selected detector(s) cannot be {} in their current state and will be skipped.",
            action.past_tense()
        ));
    }
    if action == DetectorAction::Delete {
        message.push_str("\n\nDeleted detectors and their results cannot be recovered.");
    }
    message
}

/// Landing query for the list: stored page size first, then the configured default.
pub fn initial_list_query() -> GetDetectorsQueryParams {
    let default_size = APP_CONFIG
        .get()
        .map(|config| config.default_page_size)
        .unwrap_or_else(|| GetDetectorsQueryParams::default().size);
    list_query_with_size(Preferences::load().page_size, default_size)
}

fn list_query_with_size(stored: Option<usize>, default_size: usize) -> GetDetectorsQueryParams {
    GetDetectorsQueryParams::default().with_size(stored.unwrap_or(default_size))
}

#[component]
pub fn DetectorList(query: GetDetectorsQueryParams) -> Element {
    use_detector_list(query.clone());

    let actions = use_app_actions();
    let list = use_app_state().read().detector_list.clone();
    let navigator = use_navigator();
    let mut search_text = use_signal(|| query.search.clone());
    let mut indices_text = use_signal(|| query.indices.clone());

    let visible = visible_detectors(&list.items, &list.params, &list.filters);
    let pages = page_count(list.total, query.size);
    let page_index = query.page_index();
    let all_visible_selected =
        !visible.is_empty() && visible.iter().all(|item| list.selected.contains(&item.id));
    let selected_items = list.selected_items();

    let apply_search = {
        let query = query.clone();
        move || {
            let next = query
                .with_search(&search_text.peek())
                .with_indices(&indices_text.peek());
            navigator.push(Route::DetectorList { query: next });
        }
    };

    let batch = {
        let selected_items = selected_items.clone();
        let query = query.clone();
        move |action: DetectorAction| {
            let eligible = detectors_for_action(&selected_items, action);
            let skipped = selected_items.len() - eligible.len();
            if eligible.is_empty() {
                actions.set_operation_error(format!(
                    "None of the selected detectors can be {}",
                    action.past_tense()
                ));
                return;
            }
            if !confirm(&confirm_message(action, &eligible, skipped)) {
                return;
            }
            let items = selected_items.clone();
            let query = query.clone();
            spawn(async move {
                let report = run_batch_action(actions, action, items).await;
                if action == DetectorAction::Delete && !report.succeeded.is_empty() {
                    load_detector_list(actions, query).await;
                }
            });
        }
    };

    rsx! {
        section { class: "space-y-4 rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
            header { class: "flex flex-wrap items-center justify-between gap-2",
                h1 { class: "text-lg font-semibold text-slate-900", "Detectors ({list.total})" }
                div { class: "flex gap-2",
                    for action in [DetectorAction::Start, DetectorAction::Stop, DetectorAction::Delete] {
                        button {
                            key: "{action}",
                            class: SECONDARY_BUTTON_CLASS,
                            disabled: selected_items.is_empty(),
                            onclick: {
                                let batch = batch.clone();
                                move |_| batch(action)
                            },
                            "{action.verb()}"
                        }
                    }
                    Link { class: "{BUTTON_CLASS}", to: Route::CreateDetector {}, "Create detector" }
                }
            }

            form {
                class: "flex flex-wrap gap-2",
                onsubmit: {
                    let apply_search = apply_search.clone();
                    move |evt: FormEvent| {
                        evt.prevent_default();
                        apply_search();
                    }
                },
                input {
                    class: INPUT_CLASS,
                    r#type: "search",
                    placeholder: "Search detectors",
                    value: "{search_text}",
                    oninput: move |evt| search_text.set(evt.value()),
                }
                input {
                    class: INPUT_CLASS,
                    r#type: "text",
                    placeholder: "Filter by index",
                    value: "{indices_text}",
                    oninput: move |evt| indices_text.set(evt.value()),
                }
                button { class: BUTTON_CLASS, r#type: "submit", "Search" }
            }

            div { class: "flex flex-wrap gap-2",
                for state in DetectorState::ALL {
                    button {
                        key: "{state.label()}",
                        class: format!(
                            "{} {}",
                            CHIP_BASE_CLASS,
                            if list.filters.is_selected(state) { CHIP_ACTIVE_CLASS } else { CHIP_INACTIVE_CLASS }
                        ),
                        onclick: move |_| actions.toggle_state_filter(state),
                        "{state.label()}"
                    }
                }
                if !list.filters.states.is_empty() {
                    button {
                        class: "text-xs text-slate-500 underline",
                        onclick: move |_| actions.clear_state_filters(),
                        "Reset states"
                    }
                }
            }

            if let Some(error) = list.error.clone() {
                ErrorCallout { title: "Unable to load detectors", message: error }
            }

            if list.is_loading && list.items.is_empty() {
                p { class: "text-sm text-slate-500", "Loading detectors…" }
            } else if visible.is_empty() {
                p { class: "text-sm text-slate-500",
                    if list.items.is_empty() { "No detectors yet." } else { "No detectors match the selected states." }
                }
            } else {
                table { class: "w-full text-left text-sm",
                    thead {
                        tr { class: "border-b border-slate-200 text-xs text-slate-500",
                            th { class: "py-2",
                                input {
                                    r#type: "checkbox",
                                    checked: all_visible_selected,
                                    onchange: {
                                        let ids: Vec<String> = visible.iter().map(|item| item.id.clone()).collect();
                                        move |_| actions.set_all_selected(ids.clone(), !all_visible_selected)
                                    },
                                }
                            }
                            for (field, title) in COLUMNS {
                                th {
                                    key: "{field}",
                                    class: "cursor-pointer py-2 hover:text-slate-900",
                                    onclick: {
                                        let query = query.clone();
                                        move |_| {
                                            navigator.push(Route::DetectorList { query: query.with_sort(field) });
                                        }
                                    },
                                    "{title}{sort_marker(&query, field)}"
                                }
                            }
                            th { class: "py-2", "Monitor" }
                        }
                    }
                    tbody {
                        for item in visible.iter().cloned() {
                            DetectorRow {
                                key: "{item.id}",
                                selected: list.selected.contains(&item.id),
                                monitor: list.monitors.get(&item.id).map(|monitor| monitor.name.clone()),
                                item,
                            }
                        }
                    }
                }
            }

            footer { class: "flex items-center justify-end gap-2 text-xs text-slate-600",
                select {
                    class: "rounded border border-slate-300 px-2 py-1 text-xs",
                    onchange: {
                        let query = query.clone();
                        move |evt: FormEvent| {
                            if let Ok(size) = evt.value().parse::<usize>() {
                                let mut preferences = Preferences::load();
                                preferences.page_size = Some(size);
                                preferences.save();
                                navigator.push(Route::DetectorList { query: query.with_size(size) });
                            }
                        }
                    },
                    for size in PAGE_SIZE_OPTIONS {
                        option { value: "{size}", selected: size == query.size, "{size} per page" }
                    }
                }
                button {
                    class: SECONDARY_BUTTON_CLASS,
                    disabled: page_index == 0,
                    onclick: {
                        let query = query.clone();
                        move |_| {
                            navigator.push(Route::DetectorList { query: query.with_page(page_index.saturating_sub(1)) });
                        }
                    },
                    "Previous"
                }
                span { "Page {page_index + 1} of {pages.max(1)}" }
                button {
                    class: SECONDARY_BUTTON_CLASS,
                    disabled: page_index + 1 >= pages,
                    onclick: {
                        let query = query.clone();
                        move |_| {
                            navigator.push(Route::DetectorList { query: query.with_page(page_index + 1) });
                        }
                    },
                    "Next"
                }
            }
        }
    }
}

fn sort_marker(query: &GetDetectorsQueryParams, field: &str) -> &'static str {
    if query.sort_field != field {
        ""
    } else if query.sort_direction == SortDirection::Asc {
        " ▲"
    } else {
        " ▼"
    }
}

#[component]
fn DetectorRow(item: DetectorListItem, selected: bool, monitor: Option<String>) -> Element {
    let actions = use_app_actions();
    let id = item.id.clone();
    let indices = item.indices.join(", ");
    let monitor_label = monitor.unwrap_or_else(|| "-".to_string());

    rsx! {
        tr { class: "border-b border-slate-100",
            td { class: "py-2",
                input {
                    r#type: "checkbox",
                    checked: selected,
                    onchange: move |_| actions.toggle_selected(&id),
                }
            }
            td { class: "py-2",
                Link {
                    class: "font-medium text-slate-900 hover:underline",
                    to: Route::DetectorResults { detector_id: item.id.clone() },
                    "{item.name}"
                }
            }
            td { class: "py-2 text-slate-600", "{indices}" }
            td { class: "py-2",
                span { class: format!("rounded px-2 py-0.5 text-[11px] {}", item.cur_state.badge_class()),
                    "{item.cur_state.label()}"
                }
            }
            td { class: "py-2", "{item.total_anomalies}" }
            td { class: "py-2 text-xs text-slate-500", "{format_optional_datetime(item.last_active_time_ms)}" }
            td { class: "py-2 text-xs text-slate-500", "{format_optional_datetime(item.last_update_time_ms)}" }
            td { class: "py-2 text-xs text-slate-700", "{monitor_label}" }
        }
    }
}
