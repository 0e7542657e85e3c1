use dioxus::prelude::*;
use dioxus_router::prelude::*;

use crate::detectors::DetectorAction;
use crate::filters::DataFilter;
use crate::forms::{DefinitionErrors, DetectorDefinitionForm, FeatureListErrors, FeatureListForm};
use crate::hooks::detector::{check_detector_name, save_detector, use_detector};
use crate::hooks::detector_list::run_detector_action;
use crate::models::Detector;
use crate::state::{use_app_actions, use_app_state};
use crate::ui::browser::copy_to_clipboard;
use crate::ui::data_filters::DataFilterEditor;
use crate::ui::feature_editor::FeatureEditor;
use crate::ui::fields::{
    split_list, ErrorCallout, TextAreaField, TextField, BUTTON_CLASS, SECONDARY_BUTTON_CLASS,
};
use crate::validation::{MAX_CATEGORY_FIELDS, MAX_DESCRIPTION_SIZE};
use crate::Route;

#[component]
pub fn DetectorConfig(detector_id: String) -> Element {
    rsx! {
        DetectorEditor { detector_id: Some(detector_id) }
    }
}

#[component]
pub fn CreateDetector() -> Element {
    rsx! {
        DetectorEditor { detector_id: None }
    }
}

fn loaded_detector(detector: Option<&Detector>, detector_id: Option<&str>) -> Option<Detector> {
    detector
        .filter(|detector| Some(detector.id.as_str()) == detector_id)
        .cloned()
}

#[component]
fn DetectorEditor(detector_id: Option<String>) -> Element {
    use_detector(detector_id.clone());

    let actions = use_app_actions();
    let state = use_app_state();
    let navigator = use_navigator();
    let detail = state.read().detector.clone();
    let current = loaded_detector(detail.detector.as_ref(), detector_id.as_deref());

    let mut definition = use_signal(DetectorDefinitionForm::default);
    let mut indices_text = use_signal(String::new);
    let mut category_text = use_signal(String::new);
    let filters = use_signal(Vec::<DataFilter>::new);
    let features = use_signal(FeatureListForm::default);
    let mut errors = use_signal(DefinitionErrors::default);
    let mut feature_errors = use_signal(FeatureListErrors::default);
    let mut name_error = use_signal(|| None::<String>);
    let mut saving = use_signal(|| false);
    let mut seeded_for = use_signal(|| None::<String>);

    use_effect(use_reactive!(|detector_id| {
        let snapshot = state.read();
        let Some(detector) =
            loaded_detector(snapshot.detector.detector.as_ref(), detector_id.as_deref())
        else {
            return;
        };
        if seeded_for.peek().as_deref() == Some(detector.id.as_str()) {
            return;
        }
        let mut filters = filters;
        let mut features = features;
        definition.set(DetectorDefinitionForm::from_detector(&detector));
        indices_text.set(detector.indices.join(", "));
        category_text.set(detector.category_fields.join(", "));
        filters.set(detector.filters.clone());
        features.set(FeatureListForm::from_detector(&detector));
        errors.set(DefinitionErrors::default());
        feature_errors.set(FeatureListErrors::default());
        name_error.set(None);
        seeded_for.set(Some(detector.id.clone()));
    }));

    let original_name = current.as_ref().map(|detector| detector.name.clone());

    let check_name = {
        let original_name = original_name.clone();
        move |_: ()| {
            let name = definition.peek().name.clone();
            let original = original_name.clone();
            spawn(async move {
                name_error.set(check_detector_name(name, original).await);
            });
        }
    };

    let save = {
        let detector_id = detector_id.clone();
        let original_name = original_name.clone();
        let base = current.clone().unwrap_or_default();
        move |_| {
            let mut form = definition.peek().clone();
            form.indices = split_list(&indices_text.peek());
            form.category_fields = split_list(&category_text.peek());
            form.filters = filters.peek().clone();
            let feature_form = features.peek().clone();
            let detector_id = detector_id.clone();
            let original = original_name.clone();
            let mut detector = base.clone();

            spawn(async move {
                saving.set(true);
                let name_check = check_detector_name(form.name.clone(), original).await;
                let definition_result = form.apply_to(&mut detector);
                let feature_result = feature_form.apply_to(&mut detector);

                errors.set(definition_result.as_ref().err().cloned().unwrap_or_default());
                feature_errors.set(feature_result.as_ref().err().cloned().unwrap_or_default());
                name_error.set(name_check.clone());

                if definition_result.is_err() || feature_result.is_err() || name_check.is_some() {
                    actions.set_operation_error("Fix the highlighted fields before saving");
                    saving.set(false);
                    return;
                }

                if let Ok(saved) = save_detector(actions, detector_id.clone(), detector).await {
                    if detector_id.is_none() {
                        navigator.push(Route::DetectorConfig {
                            detector_id: saved.id,
                        });
                    }
                }
                saving.set(false);
            });
        }
    };

    if detector_id.is_some() && current.is_none() {
        return rsx! {
            section { class: "rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
                if let Some(error) = detail.error.clone() {
                    ErrorCallout { title: "Unable to load detector", message: error }
                } else {
                    p { class: "text-sm text-slate-500", "Loading detector…" }
                }
            }
        };
    }

    let form = definition.read().clone();
    let field_errors = errors.read().clone();
    let title = match current.as_ref() {
        Some(detector) => format!("Configure {}", detector.name),
        None => "Create detector".to_string(),
    };

    rsx! {
        section { class: "space-y-4 rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
            header { class: "flex flex-wrap items-center justify-between gap-2",
                div {
                    h1 { class: "text-lg font-semibold text-slate-900", "{title}" }
                    if let Some(detector) = current.as_ref() {
                        span { class: format!("rounded px-2 py-0.5 text-[11px] {}", detector.cur_state.badge_class()),
                            "{detector.cur_state.label()}"
                        }
                    }
                }
                if let Some(detector) = current.clone() {
                    div { class: "flex gap-2",
                        for action in [DetectorAction::Start, DetectorAction::Stop] {
                            button {
                                key: "{action}",
                                class: SECONDARY_BUTTON_CLASS,
                                disabled: !action.allows(detector.cur_state),
                                onclick: {
                                    let detector_id = detector.id.clone();
                                    move |_| {
                                        let detector_id = detector_id.clone();
                                        spawn(async move {
                                            run_detector_action(actions, action, detector_id).await;
                                        });
                                    }
                                },
                                "{action.verb()} detector"
                            }
                        }
                        button {
                            class: SECONDARY_BUTTON_CLASS,
                            onclick: {
                                let detector_id = detector.id.clone();
                                move |_| copy_to_clipboard(actions, "Detector ID", detector_id.clone())
                            },
                            "Copy ID"
                        }
                        Link {
                            class: "{SECONDARY_BUTTON_CLASS}",
                            to: Route::DetectorResults { detector_id: detector.id.clone() },
                            "View anomalies"
                        }
                    }
                }
            }

            div { class: "grid gap-4 md:grid-cols-2",
                TextField {
                    label: "Name",
                    value: form.name.clone(),
                    error: name_error.read().clone().or(field_errors.name.clone()),
                    hint: "Letters, digits, hyphens, underscores and periods.",
                    on_input: move |value: String| definition.write().name = value,
                    on_blur: check_name,
                }
                TextField {
                    label: "Timestamp field",
                    value: form.time_field.clone(),
                    error: field_errors.time_field.clone(),
                    on_input: move |value: String| definition.write().time_field = value,
                }
                TextField {
                    label: "Indices",
                    value: indices_text.read().clone(),
                    error: field_errors.indices.clone(),
                    hint: "Comma separated index names or patterns.",
                    on_input: move |value: String| indices_text.set(value),
                }
                TextField {
                    label: "Category fields",
                    value: category_text.read().clone(),
                    error: field_errors.category_fields.clone(),
                    hint: format!("Up to {MAX_CATEGORY_FIELDS} fields that split results by entity."),
                    on_input: move |value: String| category_text.set(value),
                }
                TextField {
                    label: "Detector interval (minutes)",
                    value: form.interval.clone(),
                    error: field_errors.interval.clone(),
                    on_input: move |value: String| definition.write().interval = value,
                }
                TextField {
                    label: "Window delay (minutes)",
                    value: form.window_delay.clone(),
                    error: field_errors.window_delay.clone(),
                    on_input: move |value: String| definition.write().window_delay = value,
                }
            }

            TextAreaField {
                label: "Description",
                value: form.description.clone(),
                error: field_errors.description.clone(),
                hint: format!("{} / {MAX_DESCRIPTION_SIZE} characters", form.description.chars().count()),
                on_input: move |value: String| definition.write().description = value,
            }

            DataFilterEditor { filters, errors: field_errors.filters.clone() }
            FeatureEditor { form: features, errors: feature_errors.read().clone() }

            footer { class: "flex justify-end gap-2",
                Link {
                    class: "{SECONDARY_BUTTON_CLASS}",
                    to: Route::DetectorList { query: Default::default() },
                    "Cancel"
                }
                button {
                    class: BUTTON_CLASS,
                    disabled: saving(),
                    onclick: save,
                    if saving() { "Saving…" } else { "Save" }
                }
            }
        }
    }
}
