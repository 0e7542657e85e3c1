#![allow(non_snake_case)]

mod api;
mod config;
mod detectors;
mod features;
mod filters;
mod format;
mod forms;
mod heatmap;
mod hooks;
mod models;
mod preferences;
mod query;
mod state;
mod ui;
mod validation;

use api::{AdClient, ClientError};
use config::AppConfig;
use dioxus::prelude::*;
use dioxus_router::prelude::*;
use once_cell::sync::OnceCell;
use query::GetDetectorsQueryParams;
use state::AppState;
use tracing::{error, info};
use ui::anomaly_results::DetectorResults;
use ui::detector_config::{CreateDetector, DetectorConfig};
use ui::detector_list::{initial_list_query, DetectorList};
use ui::notifications::NotificationCenter;

pub(crate) static APP_CONFIG: OnceCell<AppConfig> = OnceCell::new();
pub(crate) static API_CLIENT: OnceCell<AdClient> = OnceCell::new();

fn main() {
    console_error_panic_hook::set_once();
    let config = AppConfig::from_env();
    init_logging(config.profile.log_level());
    bootstrap_infrastructure(config);
    launch(App);
}

fn init_logging(level: tracing::Level) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = dioxus_logger::init(level);
    });
}

fn bootstrap_infrastructure(config: AppConfig) {
    let _ = APP_CONFIG.set(config.clone());

    match AdClient::new(config) {
        Ok(client) => {
            info!(base_url = %client.config().api_base_url, "anomaly detection client initialized");
            let _ = API_CLIENT.set(client);
        }
        Err(err) => {
            report_client_error("Failed to initialize the anomaly detection client", &err);
        }
    }
}

fn report_client_error(context: &str, err: &ClientError) {
    error!(%context, ?err, status = ?err.status(), "api bootstrap error");
}

#[component]
fn App() -> Element {
    let app_state = use_signal(AppState::default);

    use_context_provider(|| app_state);

    rsx! {
        div { class: "relative",
            Router::<Route> {}
            NotificationCenter {}
        }
    }
}

#[derive(Clone, Routable, Debug, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[redirect("/", || Route::DetectorList { query: initial_list_query() })]
    #[layout(ConsoleShell)]
        #[route("/detectors?:..query")]
        DetectorList { query: GetDetectorsQueryParams },
        #[route("/detectors/:detector_id/configurations")]
        DetectorConfig { detector_id: String },
        #[route("/detectors/:detector_id/results")]
        DetectorResults { detector_id: String },
        #[route("/create-detector")]
        CreateDetector {},
    #[end_layout]
    #[route("/:..segments")]
    NotFound { segments: Vec<String> },
}

#[component]
fn ConsoleShell() -> Element {
    let api_endpoint = APP_CONFIG
        .get()
        .map(|c| c.api_base_url.clone())
        .unwrap_or_else(|| "API endpoint not configured".to_string());

    rsx! {
        div { class: "app-shell space-y-4",
            nav { class: "flex flex-wrap items-center justify-between gap-2 rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
                div {
                    Link {
                        class: "text-xl font-semibold text-slate-900",
                        to: Route::DetectorList { query: initial_list_query() },
                        "Anomaly detection"
                    }
                    p { class: "text-xs text-slate-500", "API: {api_endpoint}" }
                }
                div { class: "flex gap-3 text-sm",
                    Link {
                        class: "text-slate-600 hover:text-slate-900",
                        to: Route::DetectorList { query: initial_list_query() },
                        "Detectors"
                    }
                    Link {
                        class: "text-slate-600 hover:text-slate-900",
                        to: Route::CreateDetector {},
                        "Create detector"
                    }
                }
            }
            Outlet::<Route> {}
        }
    }
}

#[component]
fn NotFound(segments: Vec<String>) -> Element {
    let path = segments.join("/");
    rsx! {
        section { class: "rounded-lg border border-slate-200 bg-white p-4 shadow-sm",
            h1 { class: "text-lg font-semibold text-slate-900", "Page not found" }
            p { class: "text-sm text-slate-600", "Nothing lives at /{path}." }
            Link {
                class: "text-sm text-slate-900 underline",
                to: Route::DetectorList { query: initial_list_query() },
                "Back to detectors"
            }
        }
    }
}
