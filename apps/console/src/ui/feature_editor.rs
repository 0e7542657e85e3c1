use dioxus::prelude::*;

use crate::features::{AggregationMethod, Feature, FeatureDraft, MAX_FEATURE_NUM};
use crate::forms::{FeatureListErrors, FeatureListForm};
use crate::ui::fields::{input_class, FormRow, SECONDARY_BUTTON_CLASS};

const SIMPLE: &str = "simple_aggregation";
const CUSTOM: &str = "custom_aggregation";

/// Switches a draft between the simple and custom editors, keeping the
/// enabled flag.
fn switch_feature_type(draft: &mut FeatureDraft, kind: &str) {
    let enabled = draft.feature.enabled();
    draft.feature = match kind {
        CUSTOM => Feature::CustomAggregation {
            expression: draft
                .feature
                .aggregation_query(draft.name.trim())
                .ok()
                .and_then(|query| serde_json::to_string_pretty(&query).ok())
                .unwrap_or_default(),
            enabled,
        },
        _ => Feature::SimpleAggregation {
            field: String::new(),
            method: AggregationMethod::Sum,
            enabled,
        },
    };
}

fn edit_draft(mut form: Signal<FeatureListForm>, key: &str, apply: impl FnOnce(&mut FeatureDraft)) {
    form.write().update(key, apply);
}

#[component]
pub fn FeatureEditor(form: Signal<FeatureListForm>, errors: FeatureListErrors) -> Element {
    let mut form = form;
    let features = form.read().features.clone();
    let at_limit = features.len() >= MAX_FEATURE_NUM;

    rsx! {
        div { class: "space-y-3",
            h2 { class: "text-sm font-semibold text-slate-900", "Features" }
            p { class: "text-[11px] text-slate-500",
                "Up to {MAX_FEATURE_NUM} aggregations computed for every detection interval."
            }
            if let Some(error) = errors.count.clone() {
                p { class: "text-[11px] text-red-600", "{error}" }
            }
            for (idx, draft) in features.into_iter().enumerate() {
                FeatureRow {
                    key: "{draft.key}",
                    form,
                    name_error: errors.names.get(idx).cloned().flatten(),
                    definition_error: errors.definitions.get(idx).cloned().flatten(),
                    draft,
                }
            }
            button {
                class: SECONDARY_BUTTON_CLASS,
                disabled: at_limit,
                onclick: move |_| form.write().add(),
                "Add feature"
            }
        }
    }
}

#[component]
fn FeatureRow(
    form: Signal<FeatureListForm>,
    draft: FeatureDraft,
    name_error: Option<String>,
    definition_error: Option<String>,
) -> Element {
    let mut form = form;
    let key = draft.key.clone();
    let kind = match draft.feature {
        Feature::SimpleAggregation { .. } => SIMPLE,
        Feature::CustomAggregation { .. } => CUSTOM,
    };

    let definition = match draft.feature.clone() {
        Feature::SimpleAggregation { field, method, .. } => rsx! {
            div { class: "grid grid-cols-2 gap-2",
                FormRow { label: "Aggregation method",
                    select {
                        class: input_class(&None),
                        onchange: {
                            let key = key.clone();
                            move |evt: FormEvent| {
                                if let Some(next) = AggregationMethod::parse(&evt.value()) {
                                    edit_draft(form, &key, |d| {
                                        if let Feature::SimpleAggregation { method, .. } = &mut d.feature {
                                            *method = next;
                                        }
                                    });
                                }
                            }
                        },
                        for candidate in AggregationMethod::ALL {
                            option {
                                value: candidate.as_str(),
                                selected: candidate == method,
                                "{candidate.label()}"
                            }
                        }
                    }
                }
                FormRow { label: "Field", error: definition_error.clone(),
                    input {
                        class: input_class(&definition_error),
                        value: "{field}",
                        oninput: {
                            let key = key.clone();
                            move |evt: FormEvent| {
                                edit_draft(form, &key, |d| {
                                    if let Feature::SimpleAggregation { field, .. } = &mut d.feature {
                                        *field = evt.value();
                                    }
                                });
                            }
                        },
                    }
                }
            }
        },
        Feature::CustomAggregation { expression, .. } => rsx! {
            FormRow {
                label: "Expression",
                hint: "A JSON object with exactly one named aggregation.",
                error: definition_error.clone(),
                textarea {
                    class: format!("{} font-mono", input_class(&definition_error)),
                    rows: "6",
                    value: "{expression}",
                    oninput: {
                        let key = key.clone();
                        move |evt: FormEvent| {
                            edit_draft(form, &key, |d| {
                                if let Feature::CustomAggregation { expression, .. } = &mut d.feature {
                                    *expression = evt.value();
                                }
                            });
                        }
                    },
                }
            }
        },
    };

    rsx! {
        div { class: "space-y-2 rounded border border-slate-200 p-3",
            div { class: "flex items-end gap-2",
                div { class: "flex-1",
                    FormRow { label: "Feature name", error: name_error.clone(),
                        input {
                            class: input_class(&name_error),
                            value: "{draft.name}",
                            oninput: {
                                let key = key.clone();
                                move |evt: FormEvent| edit_draft(form, &key, |d| d.name = evt.value())
                            },
                        }
                    }
                }
                label { class: "flex items-center gap-1 text-xs text-slate-600",
                    input {
                        r#type: "checkbox",
                        checked: draft.feature.enabled(),
                        onchange: {
                            let key = key.clone();
                            move |evt: FormEvent| {
                                edit_draft(form, &key, |d| d.feature.set_enabled(evt.checked()))
                            }
                        },
                    }
                    "Enabled"
                }
                button {
                    class: SECONDARY_BUTTON_CLASS,
                    onclick: {
                        let key = key.clone();
                        move |_| form.write().remove(&key)
                    },
                    "Remove"
                }
            }
            FormRow { label: "Find anomalies based on",
                select {
                    class: input_class(&None),
                    value: kind,
                    onchange: {
                        let key = key.clone();
                        move |evt: FormEvent| edit_draft(form, &key, |d| switch_feature_type(d, &evt.value()))
                    },
                    option { value: SIMPLE, selected: kind == SIMPLE, "Field value" }
                    option { value: CUSTOM, selected: kind == CUSTOM, "Custom expression" }
                }
            }
            {definition}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_to_custom_carries_the_simple_query() {
        let mut draft = FeatureDraft::new_simple();
        draft.name = "bytes_sum".into();
        draft.feature = Feature::SimpleAggregation {
            field: "bytes".into(),
            method: AggregationMethod::Sum,
            enabled: false,
        };
        switch_feature_type(&mut draft, CUSTOM);
        match &draft.feature {
            Feature::CustomAggregation { expression, enabled } => {
                assert!(!enabled);
                assert!(expression.contains("\"field\": \"bytes\""));
            }
            other => panic!("expected custom aggregation, got {other:?}"),
        }

        switch_feature_type(&mut draft, SIMPLE);
        assert!(matches!(draft.feature, Feature::SimpleAggregation { enabled: false, .. }));
    }
}
