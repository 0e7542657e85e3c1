use dioxus::prelude::*;

pub const INPUT_CLASS: &str =
    "w-full rounded border border-slate-300 px-2 py-1 text-sm focus:border-slate-500 focus:outline-none";
pub const INPUT_ERROR_CLASS: &str =
    "w-full rounded border border-red-400 px-2 py-1 text-sm focus:border-red-500 focus:outline-none";
pub const BUTTON_CLASS: &str =
    "rounded bg-slate-900 px-3 py-1 text-xs font-medium text-white transition hover:bg-slate-700 disabled:opacity-40";
pub const SECONDARY_BUTTON_CLASS: &str =
    "rounded border border-slate-300 px-3 py-1 text-xs text-slate-700 transition hover:bg-slate-100 disabled:opacity-40";

pub fn input_class(error: &Option<String>) -> &'static str {
    if error.is_some() {
        INPUT_ERROR_CLASS
    } else {
        INPUT_CLASS
    }
}

/// Label, hint and error text around one form control.
#[component]
pub fn FormRow(
    label: String,
    #[props(default)] hint: Option<String>,
    #[props(default)] error: Option<String>,
    children: Element,
) -> Element {
    rsx! {
        div { class: "space-y-1",
            label { class: "block text-xs font-semibold text-slate-700", "{label}" }
            {children}
            if let Some(error) = error {
                p { class: "text-[11px] text-red-600", "{error}" }
            } else if let Some(hint) = hint {
                p { class: "text-[11px] text-slate-500", "{hint}" }
            }
        }
    }
}

#[component]
pub fn TextField(
    label: String,
    value: String,
    #[props(default)] hint: Option<String>,
    #[props(default)] error: Option<String>,
    #[props(default)] placeholder: String,
    on_input: EventHandler<String>,
    #[props(optional)] on_blur: Option<EventHandler<()>>,
) -> Element {
    let class = input_class(&error);
    rsx! {
        FormRow { label, hint, error,
            input {
                class,
                r#type: "text",
                value,
                placeholder,
                oninput: move |evt| on_input.call(evt.value()),
                onblur: move |_| {
                    if let Some(handler) = on_blur {
                        handler.call(());
                    }
                },
            }
        }
    }
}

#[component]
pub fn TextAreaField(
    label: String,
    value: String,
    #[props(default)] hint: Option<String>,
    #[props(default)] error: Option<String>,
    #[props(default = 3)] rows: u32,
    on_input: EventHandler<String>,
) -> Element {
    let class = format!("{} font-mono", input_class(&error));
    rsx! {
        FormRow { label, hint, error,
            textarea {
                class,
                rows: "{rows}",
                value,
                oninput: move |evt| on_input.call(evt.value()),
            }
        }
    }
}

/// Inline error callout shown inside a panel whose load failed.
#[component]
pub fn ErrorCallout(title: String, message: String) -> Element {
    rsx! {
        div { class: "rounded border border-red-200 bg-red-50 p-3",
            p { class: "text-sm font-semibold text-red-700", "{title}" }
            p { class: "text-xs text-red-600", "{message}" }
        }
    }
}

/// Splits a comma separated input into trimmed, non-empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_lists() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("  ").is_empty());
    }
}
