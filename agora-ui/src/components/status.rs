//! Status Banner Component
//!
//! Shows the session's current status message.

use agora::{Severity, StatusMessage};
use leptos::*;

use crate::state::GlobalState;

#[component]
pub fn StatusBanner() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let status = state.status;

    view! {
        <div class="fixed bottom-4 right-4 z-50">
            {move || status.get().map(|message| view! { <StatusMessageView message=message /> })}
        </div>
    }
}

#[component]
fn StatusMessageView(message: StatusMessage) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    let (icon, bg_class) = match message.severity {
        Severity::Info => ("ℹ", "bg-blue-600"),
        Severity::Warning => ("⚠", "bg-yellow-600"),
        Severity::Alert => ("✕", "bg-red-600"),
    };

    view! {
        <div class=format!(
            "flex items-center space-x-3 {} text-white px-4 py-3 rounded-lg shadow-lg \
             transform transition-all duration-300 ease-out animate-slide-in",
            bg_class
        )>
            <span class="text-lg">{icon}</span>
            <span class="text-sm font-medium">{message.text}</span>
            <button
                type="button"
                class="text-white/70 hover:text-white"
                on:click=move |_| state.clear_status()
            >
                "×"
            </button>
        </div>
    }
}
