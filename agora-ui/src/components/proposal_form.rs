//! Proposal Form Component
//!
//! Collects a title and description and submits them through the
//! gateway, waiting for the transaction to be mined.

use agora::{AppError, FormState, ProposalForm, Surface};
use leptos::*;

use crate::state::GlobalState;

#[component]
pub fn ProposalFormPanel() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let account = state.account;
    let configured = state.is_configured();
    let form = create_rw_signal(ProposalForm::new());

    let can_submit = move || configured && form.with(|f| f.can_submit(account.get()));
    let submitting = move || form.with(|f| f.state() == FormState::Submitting);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let mut started = None;
        form.update(|f| started = Some(f.begin(account.get_untracked())));
        let ticket = match started {
            Some(Ok(ticket)) => ticket,
            Some(Err(e)) => {
                state.show_warning(e.to_string());
                return;
            }
            None => return,
        };

        let state = state.clone();
        spawn_local(async move {
            let result = match state.ready_gateway() {
                Ok(gateway) => gateway
                    .create_proposal(ticket.signer, &ticket.title, &ticket.description)
                    .await
                    .map_err(AppError::from_write),
                Err(e) => Err(e),
            };
            let succeeded = result.is_ok();
            form.update(|f| f.settle(ticket, succeeded));

            match result {
                Ok(receipt) => {
                    // Explicit reload on top of the event-driven one
                    state.refresh().await;
                    state.show_info(format!(
                        "Proposal submitted in block {}.",
                        receipt.block_number
                    ));
                }
                Err(err) => state.report(&err, Surface::Alert),
            }
        });
    };

    view! {
        <section class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">"New Proposal"</h2>

            <form on:submit=on_submit class="space-y-4">
                <div>
                    <label class="block text-sm text-gray-400 mb-2">"Title"</label>
                    <input
                        type="text"
                        prop:value=move || form.with(|f| f.draft().title.clone())
                        on:input=move |ev| form.update(|f| f.set_title(event_target_value(&ev)))
                        disabled=submitting
                        class="w-full bg-gray-700 rounded-lg px-4 py-3 text-white
                               border border-gray-600 focus:border-primary-500 focus:outline-none"
                    />
                </div>

                <div>
                    <label class="block text-sm text-gray-400 mb-2">"Description"</label>
                    <textarea
                        rows="5"
                        prop:value=move || form.with(|f| f.draft().description.clone())
                        on:input=move |ev| form.update(|f| f.set_description(event_target_value(&ev)))
                        disabled=submitting
                        class="w-full bg-gray-700 rounded-lg px-4 py-3 text-white
                               border border-gray-600 focus:border-primary-500 focus:outline-none"
                    />
                </div>

                <button
                    type="submit"
                    disabled=move || !can_submit()
                    class="w-full bg-primary-600 hover:bg-primary-700 disabled:bg-gray-600
                           disabled:cursor-not-allowed rounded-lg py-3 font-semibold
                           transition-colors flex items-center justify-center space-x-2"
                >
                    {move || if submitting() {
                        view! {
                            <div class="loading-spinner w-5 h-5" />
                            <span>"Submitting..."</span>
                        }.into_view()
                    } else {
                        view! {
                            <span>"Submit Proposal"</span>
                        }.into_view()
                    }}
                </button>

                {move || {
                    account.get().is_none().then(|| view! {
                        <p class="text-sm text-gray-400">"Connect a wallet to submit a proposal."</p>
                    })
                }}
            </form>
        </section>
    }
}
