//! App Root Component
//!
//! Main application component with global providers.

use leptos::*;

use crate::components::{Header, ProposalFormPanel, ProposalList, StatusBanner};
use crate::state::{provide_global_state, GlobalState};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    // Provide global state to all components
    provide_global_state();

    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let config_notice = state.target.as_ref().err().map(|e| e.to_string());

    view! {
        <div class="min-h-screen bg-gray-900 text-white flex flex-col">
            <Header />

            <main class="flex-1 container mx-auto px-4 py-8 space-y-8">
                // Missing configuration leaves a message-only interface
                {config_notice.map(|message| view! {
                    <div class="bg-yellow-900/50 border border-yellow-700 rounded-lg px-4 py-3 text-yellow-200">
                        {message}
                    </div>
                })}

                <ProposalFormPanel />
                <ProposalList />
            </main>

            <StatusBanner />
        </div>
    }
}
