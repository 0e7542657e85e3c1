use dioxus::prelude::*;

use crate::filters::{DataFilter, DataFilterErrors, FieldType, FilterOperator};
use crate::ui::fields::{input_class, SECONDARY_BUTTON_CLASS};

/// Keeps the operator valid after the field type changes.
fn set_field_type(filter: &mut DataFilter, field_type: FieldType) {
    filter.field_type = field_type;
    if !FilterOperator::for_field_type(field_type).contains(&filter.operator) {
        filter.operator = FilterOperator::Is;
    }
}

fn edit_filter(
    mut filters: Signal<Vec<DataFilter>>,
    idx: usize,
    apply: impl FnOnce(&mut DataFilter),
) {
    if let Some(filter) = filters.write().get_mut(idx) {
        apply(filter);
    }
}

#[component]
pub fn DataFilterEditor(
    filters: Signal<Vec<DataFilter>>,
    errors: Vec<DataFilterErrors>,
) -> Element {
    let mut filters = filters;
    let rows = filters.read().clone();

    rsx! {
        div { class: "space-y-3",
            h2 { class: "text-sm font-semibold text-slate-900", "Data filters" }
            p { class: "text-[11px] text-slate-500",
                "Only documents matching every filter are used to compute features."
            }
            for (idx, filter) in rows.into_iter().enumerate() {
                DataFilterRow {
                    key: "{idx}",
                    filters,
                    idx,
                    errors: errors.get(idx).cloned().unwrap_or_default(),
                    filter,
                }
            }
            button {
                class: SECONDARY_BUTTON_CLASS,
                onclick: move |_| filters.write().push(DataFilter::default()),
                "Add data filter"
            }
        }
    }
}

#[component]
fn DataFilterRow(
    filters: Signal<Vec<DataFilter>>,
    idx: usize,
    filter: DataFilter,
    errors: DataFilterErrors,
) -> Element {
    let mut filters = filters;
    let operators = FilterOperator::for_field_type(filter.field_type);
    let operator_index = operators
        .iter()
        .position(|operator| *operator == filter.operator)
        .unwrap_or_default();

    let value_inputs = if filter.operator.is_range() {
        rsx! {
            input {
                class: input_class(&errors.start),
                placeholder: "From",
                value: "{filter.start}",
                oninput: move |evt: FormEvent| edit_filter(filters, idx, |f| f.start = evt.value()),
            }
            input {
                class: input_class(&errors.end),
                placeholder: "To",
                value: "{filter.end}",
                oninput: move |evt: FormEvent| edit_filter(filters, idx, |f| f.end = evt.value()),
            }
        }
    } else if filter.operator.needs_value() {
        rsx! {
            input {
                class: input_class(&errors.value),
                placeholder: "Value",
                value: "{filter.value}",
                oninput: move |evt: FormEvent| edit_filter(filters, idx, |f| f.value = evt.value()),
            }
        }
    } else {
        rsx! {}
    };

    let messages: Vec<String> = [
        errors.field_name.clone(),
        errors.value.clone(),
        errors.start.clone(),
        errors.end.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();

    rsx! {
        div { class: "space-y-1",
            div { class: "grid grid-cols-5 gap-2",
                input {
                    class: input_class(&errors.field_name),
                    placeholder: "Field",
                    value: "{filter.field_name}",
                    oninput: move |evt: FormEvent| edit_filter(filters, idx, |f| f.field_name = evt.value()),
                }
                select {
                    class: input_class(&None),
                    onchange: move |evt: FormEvent| {
                        if let Some(field_type) = evt
                            .value()
                            .parse::<usize>()
                            .ok()
                            .and_then(|pos| FieldType::ALL.get(pos).copied())
                        {
                            edit_filter(filters, idx, |f| set_field_type(f, field_type));
                        }
                    },
                    for (pos, field_type) in FieldType::ALL.into_iter().enumerate() {
                        option {
                            value: "{pos}",
                            selected: field_type == filter.field_type,
                            "{field_type.label()}"
                        }
                    }
                }
                select {
                    class: input_class(&None),
                    onchange: {
                        let operators = operators.clone();
                        move |evt: FormEvent| {
                            if let Some(operator) = evt
                                .value()
                                .parse::<usize>()
                                .ok()
                                .and_then(|pos| operators.get(pos).copied())
                            {
                                edit_filter(filters, idx, |f| f.operator = operator);
                            }
                        }
                    },
                    for (pos, operator) in operators.iter().copied().enumerate() {
                        option {
                            value: "{pos}",
                            selected: pos == operator_index,
                            "{operator.label()}"
                        }
                    }
                }
                {value_inputs}
                button {
                    class: SECONDARY_BUTTON_CLASS,
                    onclick: move |_| {
                        let mut rows = filters.write();
                        if idx < rows.len() {
                            rows.remove(idx);
                        }
                    },
                    "Remove"
                }
            }
            for message in messages {
                p { class: "text-[11px] text-red-600", "{message}" }
            }
        }
    }
}
