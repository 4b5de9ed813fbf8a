//! Agora Web
//!
//! Governance proposal client built with Leptos (WASM).
//!
//! # Features
//!
//! - Wallet connection through the injected `window.ethereum` provider
//! - Network and deployment checks before every read and write
//! - Proposal submission with a wait for the mined receipt
//! - Live list updates from `ProposalCreated` events
//!
//! # Architecture
//!
//! This is a client-side rendered (CSR) Leptos application that compiles to
//! WebAssembly. All chain logic lives in the `agora` crate; this crate adds
//! the browser wallet adapter and the views.

use leptos::*;

mod app;
mod components;
mod state;
mod wallet;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    // Mount the app to the document body
    mount_to_body(|| view! { <app::App /> });
}
