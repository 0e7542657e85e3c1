//! Thin wrappers over browser APIs with native fallbacks for tests and tooling.

use crate::state::AppActions;

#[cfg(target_arch = "wasm32")]
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn confirm(message: &str) -> bool {
    tracing::debug!(%message, "confirm dialog unavailable, assuming yes");
    true
}

#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(target_arch = "wasm32")]
pub fn copy_to_clipboard(actions: AppActions, label: &str, content: String) {
    let label = label.to_string();
    wasm_bindgen_futures::spawn_local(async move {
        let result = async {
            let window = web_sys::window().ok_or(())?;
            let promise = window.navigator().clipboard().write_text(&content);
            wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|_| ())
        }
        .await;

        match result {
            Ok(()) => actions.set_operation_success(format!("{label} copied")),
            Err(()) => actions.set_operation_error(format!("Unable to copy {label}")),
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
pub fn copy_to_clipboard(actions: AppActions, label: &str, _content: String) {
    actions.set_operation_success(format!("{label} copied"));
}
