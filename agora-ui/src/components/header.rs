//! Header with the wallet connect control

use leptos::*;

use crate::state::GlobalState;

#[component]
pub fn Header() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let account = state.account;
    let has_wallet = state.connector.is_available();
    let (connecting, set_connecting) = create_signal(false);

    let on_connect = move |_: web_sys::MouseEvent| {
        set_connecting.set(true);
        let state = state.clone();
        spawn_local(async move {
            state.connect().await;
            set_connecting.set(false);
        });
    };

    view! {
        <header class="bg-gray-800 border-b border-gray-700">
            <div class="container mx-auto px-4 py-4 flex items-center justify-between">
                <h1 class="text-xl font-bold">"Agora"</h1>

                <div class="flex items-center space-x-4">
                    {move || {
                        account.get().map(|a| view! {
                            <span class="font-mono text-sm text-gray-300" title=a.to_string()>
                                {a.short()}
                            </span>
                        })
                    }}

                    <button
                        type="button"
                        on:click=on_connect
                        disabled=move || connecting.get() || account.get().is_some()
                        class="px-4 py-2 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-600
                               disabled:cursor-not-allowed rounded-lg text-sm font-medium
                               transition-colors"
                    >
                        {move || {
                            if account.get().is_some() {
                                "Connected"
                            } else if connecting.get() {
                                "Connecting..."
                            } else if has_wallet {
                                "Connect Wallet"
                            } else {
                                "No Wallet Found"
                            }
                        }}
                    </button>
                </div>
            </div>
        </header>
    }
}
