//! Chromium driver over the DevTools protocol.
//!
//! Compiled with the `browser` feature. The driver launches one chromium
//! with a single page, grants clipboard permissions to the application
//! origin and routes XHR/fetch traffic through the Fetch domain so a
//! [`NetworkInterceptor`] can answer it.

#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::significant_drop_tightening
)]

use crate::config::HarnessConfig;
use crate::driver::{DomEvent, ElementSnapshot, PageDriver};
use crate::keyboard::{Keystroke, SpecialKey};
use crate::network::{origin_of, HttpMethod, InterceptedRequest, MockResponse, NetworkInterceptor};
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FulfillRequestParams, HeaderEntry,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ResourceType;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

fn driver_err(e: impl std::fmt::Display) -> HarnessError {
    HarnessError::driver(e.to_string())
}

/// JS string literal for `value`
fn js_string(value: &str) -> HarnessResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn snapshot_script(selector: &str) -> HarnessResult<String> {
    Ok(format!(
        r"Array.from(document.querySelectorAll({sel})).map(el => ({{
            tag_name: el.tagName.toLowerCase(),
            text: el.textContent ?? '',
            value: ('value' in el) ? String(el.value) : null,
            attributes: Object.fromEntries(Array.from(el.attributes).map(a => [a.name, a.value])),
            focused: document.activeElement === el,
        }}))",
        sel = js_string(selector)?
    ))
}

/// Set a controlled input's value the way React expects; `notify` also fires `input`
fn set_value_script(selector: &str, value: &str, notify: bool) -> HarnessResult<String> {
    let input = if notify {
        "el.dispatchEvent(new Event('input', { bubbles: true }));"
    } else {
        ""
    };
    Ok(format!(
        r"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const proto = el instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {val});
            {input}
            return true;
        }})()",
        sel = js_string(selector)?,
        val = js_string(value)?
    ))
}

fn event_script(selector: &str, event: DomEvent) -> HarnessResult<String> {
    let sel = js_string(selector)?;
    let action = match event {
        DomEvent::Click => "el.click();".to_string(),
        DomEvent::Focus => "el.focus();".to_string(),
        DomEvent::PointerDown => {
            "el.dispatchEvent(new PointerEvent('pointerdown', { bubbles: true, cancelable: true }));"
                .to_string()
        }
        other => format!(
            "el.dispatchEvent(new Event('{}', {{ bubbles: true, cancelable: true }}));",
            other.as_str()
        ),
    };
    Ok(format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; {action} return true; }})()"
    ))
}

/// Fields the Fetch domain reports for a paused request
fn intercepted_from(event: &EventRequestPaused) -> HarnessResult<InterceptedRequest> {
    let raw = serde_json::to_value(&event.request)?;
    let url = raw["url"].as_str().unwrap_or_default();
    let method = HttpMethod::parse(raw["method"].as_str().unwrap_or("GET"));
    let mut request = InterceptedRequest::new(method, url);
    if let Some(headers) = raw["headers"].as_object() {
        for (name, value) in headers {
            request = request.with_header(&name.to_lowercase(), value.as_str().unwrap_or_default());
        }
    }
    if let Some(body) = raw["postData"].as_str() {
        request = request.with_body(body.as_bytes().to_vec());
    } else if let Some(entries) = raw["postDataEntries"].as_array() {
        let mut body = Vec::new();
        for bytes in entries.iter().filter_map(|e| e["bytes"].as_str()) {
            body.extend(BASE64.decode(bytes).map_err(driver_err)?);
        }
        request = request.with_body(body);
    }
    Ok(request)
}

async fn fulfill(page: &Page, event: &EventRequestPaused, response: &MockResponse) -> HarnessResult<()> {
    let mut headers = vec![HeaderEntry::new("content-type", response.content_type.clone())];
    headers.extend(
        response
            .headers
            .iter()
            .map(|(k, v)| HeaderEntry::new(k.clone(), v.clone())),
    );
    let params = FulfillRequestParams::builder()
        .request_id(event.request_id.clone())
        .response_code(i64::from(response.status))
        .response_headers(headers)
        .body(BASE64.encode(&response.body))
        .build()
        .map_err(driver_err)?;
    page.execute(params).await.map_err(driver_err)?;
    Ok(())
}

fn fulfil_delay(response: &MockResponse) -> Option<Duration> {
    (response.delay_ms > 0).then(|| Duration::from_millis(response.delay_ms))
}

async fn answer(
    page: &Page,
    network: &NetworkInterceptor,
    event: &Arc<EventRequestPaused>,
) -> HarnessResult<()> {
    let routed = matches!(event.resource_type, ResourceType::Xhr | ResourceType::Fetch);
    if routed {
        let request = intercepted_from(event)?;
        if let Some(response) = network.handle(request) {
            let Some(delay) = fulfil_delay(&response) else {
                return fulfill(page, event, &response).await;
            };
            // Delayed replies run apart so other paused requests keep flowing
            let page = page.clone();
            let event = Arc::clone(event);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = fulfill(&page, &event, &response).await {
                    tracing::warn!(error = %e, "failed to fulfil delayed request");
                }
            });
            return Ok(());
        }
    }
    page.execute(ContinueRequestParams::new(event.request_id.clone()))
        .await
        .map_err(driver_err)?;
    Ok(())
}

/// One chromium instance driving one page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    fetch_task: StdMutex<Option<JoinHandle<()>>>,
}

impl ChromiumDriver {
    /// Launch chromium with the options in `config`
    pub async fn launch(config: &HarnessConfig) -> HarnessResult<Self> {
        let opts = &config.browser;
        let mut builder =
            BrowserConfig::builder().window_size(opts.viewport_width, opts.viewport_height);
        if !opts.headless {
            builder = builder.with_head();
        }
        if opts.no_sandbox {
            builder = builder.no_sandbox();
        }
        if opts.relaxed_web_security {
            builder = builder
                .arg("--disable-web-security")
                .arg("--disable-site-isolation-trials");
        }
        if let Some(path) = &opts.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| HarnessError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| HarnessError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler stopped");
                    break;
                }
            }
        });

        if let Some(origin) = origin_of(&config.base_url) {
            let grant = GrantPermissionsParams::builder()
                .permissions(vec![
                    PermissionType::ClipboardReadWrite,
                    PermissionType::ClipboardSanitizedWrite,
                ])
                .origin(origin.clone())
                .build()
                .map_err(driver_err)?;
            if let Err(e) = browser.execute(grant).await {
                tracing::warn!(%origin, error = %e, "clipboard permission not granted");
            }
        }

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarnessError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        tracing::info!(
            headless = opts.headless,
            relaxed_web_security = opts.relaxed_web_security,
            "chromium launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            fetch_task: StdMutex::new(None),
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> HarnessResult<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(driver_err)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(driver_err)?;
        result.into_value().map_err(driver_err)
    }

    async fn eval_on(&self, script: String, selector: &str) -> HarnessResult<()> {
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(HarnessError::driver(format!("{selector} is not attached")))
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| HarnessError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> HarnessResult<Vec<ElementSnapshot>> {
        self.eval(snapshot_script(selector)?).await
    }

    async fn clear(&self, selector: &str) -> HarnessResult<()> {
        self.eval_on(set_value_script(selector, "", true)?, selector).await
    }

    async fn type_keys(&self, selector: &str, keys: &[Keystroke]) -> HarnessResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(driver_err)?;
        element.focus().await.map_err(driver_err)?;

        let mut pending = String::new();
        for key in keys {
            match key {
                Keystroke::Char(c) => pending.push(*c),
                Keystroke::Key(special) => {
                    if !pending.is_empty() {
                        element.type_str(&pending).await.map_err(driver_err)?;
                        pending.clear();
                    }
                    if *special == SpecialKey::SelectAll {
                        self.eval_on(
                            format!(
                                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.select(); return true; }})()",
                                js_string(selector)?
                            ),
                            selector,
                        )
                        .await?;
                    } else {
                        element
                            .press_key(special.dom_key())
                            .await
                            .map_err(driver_err)?;
                    }
                }
            }
        }
        if !pending.is_empty() {
            element.type_str(&pending).await.map_err(driver_err)?;
        }
        Ok(())
    }

    async fn set_value(&self, selector: &str, value: &str) -> HarnessResult<()> {
        self.eval_on(set_value_script(selector, value, false)?, selector).await
    }

    async fn dispatch_event(&self, selector: &str, event: DomEvent) -> HarnessResult<()> {
        self.eval_on(event_script(selector, event)?, selector).await
    }

    async fn click(&self, selector: &str) -> HarnessResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(driver_err)?;
        element.click().await.map_err(driver_err)?;
        Ok(())
    }

    async fn submit(&self, selector: &str) -> HarnessResult<()> {
        self.dispatch_event(selector, DomEvent::Submit).await
    }

    async fn focus(&self, selector: &str) -> HarnessResult<()> {
        self.dispatch_event(selector, DomEvent::Focus).await
    }

    async fn read_clipboard(&self) -> HarnessResult<String> {
        self.eval("navigator.clipboard.readText()".to_string())
            .await
            .map_err(|e| HarnessError::ClipboardUnavailable {
                reason: e.to_string(),
            })
    }

    async fn clear_local_storage(&self) -> HarnessResult<()> {
        self.eval::<bool>("(() => { localStorage.clear(); return true; })()".to_string())
            .await?;
        Ok(())
    }

    async fn attach_interceptor(&self, interceptor: NetworkInterceptor) -> HarnessResult<()> {
        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        self.page
            .execute(EnableParams::builder().pattern(pattern).build())
            .await
            .map_err(driver_err)?;
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(driver_err)?;

        let page = self.page.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                if let Err(e) = answer(&page, &interceptor, &event).await {
                    tracing::warn!(error = %e, "failed to answer paused request");
                }
            }
        });

        let mut slot = self
            .fetch_task
            .lock()
            .map_err(|_| HarnessError::driver("fetch task slot poisoned"))?;
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn close(&self) -> HarnessResult<()> {
        if let Ok(mut slot) = self.fetch_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(driver_err)?;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "chromium exit status unavailable");
        }
        self.handler.abort();
        tracing::info!("chromium closed");
        Ok(())
    }
}
