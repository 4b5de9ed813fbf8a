//! EIP-1193 Provider
//!
//! Wraps the `window.ethereum` object injected by browser wallet
//! extensions. Params and results cross the JS boundary as JSON.

use agora::wallet::{WalletError, WalletProvider};
use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Function, Object, Promise, Reflect, JSON};
use serde_json::Value;
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Injected browser wallet
pub struct Eip1193Wallet {
    provider: Object,
}

impl Eip1193Wallet {
    /// The injected provider, if the page has one
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let provider = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if provider.is_undefined() || provider.is_null() {
            return None;
        }
        Some(Self {
            provider: provider.unchecked_into(),
        })
    }

    fn request_fn(&self) -> Result<Function, WalletError> {
        Reflect::get(&self.provider, &JsValue::from_str("request"))
            .map_err(js_transport)?
            .dyn_into::<Function>()
            .map_err(|_| WalletError::UnsupportedMethod("request".to_string()))
    }
}

#[async_trait(?Send)]
impl WalletProvider for Eip1193Wallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(js_transport)?;
        let params = JSON::parse(&params.to_string()).map_err(js_transport)?;
        Reflect::set(&args, &JsValue::from_str("params"), &params).map_err(js_transport)?;

        let promise: Promise = self
            .request_fn()?
            .call1(&self.provider, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| WalletError::InvalidResponse("request did not return a promise".into()))?;

        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }

        let text: String = JSON::stringify(&result).map_err(js_transport)?.into();
        serde_json::from_str(&text).map_err(|e| WalletError::InvalidResponse(e.to_string()))
    }

    async fn pause(&self, interval: Duration) {
        let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).await;
    }
}

fn js_transport(err: JsValue) -> WalletError {
    WalletError::Transport(format!("{:?}", err))
}

/// Map a rejected provider promise (`{ code, message, data }`) to a wallet error
fn provider_error(err: JsValue) -> WalletError {
    let field = |name: &str| Reflect::get(&err, &JsValue::from_str(name)).ok();

    let code = field("code").and_then(|c| c.as_f64());
    let message = field("message")
        .and_then(|m| m.as_string())
        .unwrap_or_default();
    let data = field("data")
        .filter(|d| !d.is_undefined() && !d.is_null())
        .and_then(|d| JSON::stringify(&d).ok())
        .and_then(|s| serde_json::from_str::<Value>(&String::from(s)).ok());

    match code {
        Some(code) => WalletError::from_rpc(code as i64, &message, data.as_ref()),
        None if !message.is_empty() => WalletError::Transport(message),
        None => js_transport(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn js_error(code: Option<f64>, message: &str) -> JsValue {
        let err = Object::new();
        if let Some(code) = code {
            Reflect::set(&err, &"code".into(), &JsValue::from_f64(code)).unwrap();
        }
        Reflect::set(&err, &"message".into(), &JsValue::from_str(message)).unwrap();
        err.into()
    }

    #[wasm_bindgen_test]
    fn test_user_rejection() {
        let err = provider_error(js_error(Some(4001.0), "User rejected the request."));
        assert_eq!(err, WalletError::UserRejected);
    }

    #[wasm_bindgen_test]
    fn test_unknown_chain() {
        let err = provider_error(js_error(Some(4902.0), "Unrecognized chain ID \"0xaa36a7\"."));
        assert_eq!(err, WalletError::UnrecognizedChain);
    }

    #[wasm_bindgen_test]
    fn test_error_without_code() {
        let err = provider_error(js_error(None, "Already processing eth_requestAccounts."));
        assert_eq!(
            err,
            WalletError::Transport("Already processing eth_requestAccounts.".to_string())
        );
    }
}
