//! Proposal List Component
//!
//! Fetches on mount, whenever the signer changes, on every
//! `ProposalCreated` event and on demand. The component owns exactly one
//! event subscription and one poll timer, both released on cleanup.

use agora::list::{ProposalCard, EMPTY_LIST_TEXT};
use agora::Subscription;
use gloo_timers::callback::Interval;
use leptos::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::state::global::Gateway;
use crate::state::GlobalState;

#[component]
pub fn ProposalList() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let proposals = state.proposals;
    let loading = state.loading;

    let subscription: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(
        state.gateway.as_ref().map(|gateway| gateway.subscribe()),
    ));

    // Fetch on mount and whenever the signer changes. The event cursor is
    // placed after the first fetch, once the guard has settled the network.
    {
        let state = state.clone();
        create_effect(move |previous: Option<()>| {
            state.gateway_epoch.track();
            let state = state.clone();
            let first_run = previous.is_none();
            spawn_local(async move {
                state.refresh().await;
                if first_run {
                    watch_from_latest(&state).await;
                }
            });
        });
    }

    let poller = state
        .gateway
        .clone()
        .filter(|_| state.is_configured())
        .map(|gateway| start_event_poll(gateway, state.clone(), subscription.clone()));

    on_cleanup(move || {
        drop(poller);
        if let Some(subscription) = subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
    });

    let on_refresh = {
        let state = state.clone();
        move |_: web_sys::MouseEvent| {
            let state = state.clone();
            spawn_local(async move {
                state.refresh().await;
            });
        }
    };

    view! {
        <section class="space-y-4">
            <div class="flex items-center justify-between">
                <h2 class="text-lg font-semibold">"Proposals"</h2>
                <button
                    type="button"
                    on:click=on_refresh
                    disabled=move || loading.get()
                    class="px-3 py-1 bg-gray-700 hover:bg-gray-600 rounded-lg text-sm transition-colors"
                >
                    {move || if loading.get() { "Loading..." } else { "Refresh" }}
                </button>
            </div>

            {move || {
                let cards: Vec<ProposalCard> =
                    proposals.with(|ps| ps.iter().map(ProposalCard::from_proposal).collect());
                if cards.is_empty() {
                    view! {
                        <p class="text-gray-400 text-center py-8">{EMPTY_LIST_TEXT}</p>
                    }.into_view()
                } else {
                    cards
                        .into_iter()
                        .map(|card| view! { <ProposalCardView card=card /> })
                        .collect_view()
                }
            }}
        </section>
    }
}

async fn watch_from_latest(state: &GlobalState) {
    let Ok(gateway) = state.ready_gateway() else {
        return;
    };
    if let Err(e) = gateway.watch_from_latest().await {
        web_sys::console::warn_1(&format!("Event watch failed: {}", e).into());
    }
}

/// Poll for creation events and re-fetch when one arrives
fn start_event_poll(
    gateway: Rc<Gateway>,
    state: GlobalState,
    subscription: Rc<RefCell<Option<Subscription>>>,
) -> Interval {
    let millis = u32::try_from(gateway.settings().poll_interval.as_millis()).unwrap_or(u32::MAX);
    let in_flight = Rc::new(Cell::new(false));

    Interval::new(millis, move || {
        if in_flight.replace(true) {
            return;
        }
        let gateway = gateway.clone();
        let state = state.clone();
        let subscription = subscription.clone();
        let in_flight = in_flight.clone();

        spawn_local(async move {
            if let Err(e) = gateway.poll_events().await {
                web_sys::console::warn_1(&format!("Event poll failed: {}", e).into());
            }
            let pending = subscription
                .borrow_mut()
                .as_mut()
                .map(|s| s.drain())
                .unwrap_or_default();
            if !pending.is_empty() {
                state.refresh().await;
            }
            in_flight.set(false);
        });
    })
}

#[component]
fn ProposalCardView(card: ProposalCard) -> impl IntoView {
    view! {
        <article class="bg-gray-800 rounded-lg p-4">
            <h3 class="font-semibold mb-1">{card.title}</h3>
            <p class="text-gray-300 whitespace-pre-wrap mb-2">{card.description}</p>
            <p class="text-xs text-gray-500">{card.byline}</p>
        </article>
    }
}
