use crate::state::{use_app_actions, use_app_state};
use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

const SUCCESS_TOAST_MS: u32 = 4_000;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl ToastKind {
    fn accent_classes(self) -> (&'static str, &'static str) {
        match self {
            Self::Success => ("border-emerald-500 bg-emerald-50", "text-emerald-700"),
            Self::Error => ("border-red-500 bg-red-50", "text-red-700"),
        }
    }
}

#[derive(Props, Clone, PartialEq)]
pub struct ToastProps {
    pub kind: ToastKind,
    pub title: String,
    pub message: String,
    #[props(default)]
    pub details: Vec<(String, String)>,
    #[props(optional)]
    pub on_close: Option<EventHandler<MouseEvent>>,
}

#[component]
pub fn Toast(props: ToastProps) -> Element {
    let (container_class, accent_text) = props.kind.accent_classes();

    rsx! {
        div { class: format!("pointer-events-auto rounded-lg border-l-4 p-4 shadow-lg {}", container_class),
            div { class: "flex items-start justify-between gap-4",
                div { class: "space-y-1",
                    h3 { class: format!("text-sm font-semibold {}", accent_text), "{props.title}" }
                    p { class: "text-xs text-slate-700", "{props.message}" }
                    if !props.details.is_empty() {
                        ul { class: "mt-2 space-y-1 text-[11px] text-slate-500",
                            for (label, value) in props.details.iter() {
                                li {
                                    span { class: "font-medium", "{label}: " }
                                    span { class: "font-mono break-all", "{value}" }
                                }
                            }
                        }
                    }
                }
                if let Some(handler) = props.on_close {
                    button {
                        class: "rounded bg-slate-200 px-2 py-1 text-[11px] text-slate-600 transition hover:bg-slate-300",
                        onclick: move |evt| handler.call(evt),
                        "Dismiss"
                    }
                }
            }
        }
    }
}

/// Operation toast for the last backend action. Success toasts dismiss
/// themselves, errors stay until closed.
#[component]
pub fn NotificationCenter() -> Element {
    let actions = use_app_actions();
    let state = use_app_state();
    let operation = state.read().operation.clone();

    let success = operation.last_message.clone();
    use_effect(use_reactive!(|success| {
        if let Some(message) = success {
            spawn(async move {
                TimeoutFuture::new(SUCCESS_TOAST_MS).await;
                let current = state.read().operation.last_message.clone();
                if current.as_deref() == Some(message.as_str()) {
                    actions.clear_operation_status();
                }
            });
        }
    }));

    let toast = if let Some(error) = operation.error.clone() {
        let mut details = Vec::new();
        if let Some(status) = operation.last_status {
            details.push(("HTTP status".to_string(), status.to_string()));
        }
        Some((
            ToastKind::Error,
            operation.context.clone().unwrap_or_else(|| "Operation failed".to_string()),
            error,
            details,
        ))
    } else {
        operation.last_message.clone().map(|message| {
            (
                ToastKind::Success,
                operation.context.clone().unwrap_or_else(|| "Success".to_string()),
                message,
                Vec::new(),
            )
        })
    };

    let Some((kind, title, message, details)) = toast else {
        return rsx! { Fragment {} };
    };

    rsx! {
        div { class: "pointer-events-none fixed right-4 top-4 z-50 flex w-80 flex-col gap-3",
            Toast {
                kind,
                title,
                message,
                details,
                on_close: move |_| actions.clear_operation_status(),
            }
        }
    }
}
