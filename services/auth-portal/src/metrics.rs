//! Prometheus metrics exposition
//!
//! - `portal_logins_started_total` (counter)
//! - `portal_callbacks_total` (counter): label `outcome`
//! - `portal_logouts_total` (counter)
//! - `portal_page_renders_total` (counter): label `view`

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// A login link was issued with a fresh state.
pub fn record_login_started() {
    metrics::counter!("portal_logins_started_total").increment(1);
}

/// A callback finished. `outcome` is `success`, `invalid_params` or `failed`.
pub fn record_callback(outcome: &'static str) {
    metrics::counter!("portal_callbacks_total", "outcome" => outcome).increment(1);
}

pub fn record_logout() {
    metrics::counter!("portal_logouts_total").increment(1);
}

/// A page was rendered. `view` is `login`, `welcome` or `error`.
pub fn record_page(view: &'static str) {
    metrics::counter!("portal_page_renders_total", "view" => view).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_login_started();
        record_callback("success");
        record_logout();
        record_page("login");
    }

    #[test]
    fn callback_outcomes_render_as_labels() {
        // Local recorder so the global singleton stays free for main()
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        {
            let _guard = metrics::set_default_local_recorder(&recorder);
            record_callback("success");
            record_callback("failed");
            record_callback("failed");
            record_logout();
        }

        let rendered = handle.render();
        assert!(
            rendered.contains(r#"outcome="failed""#),
            "got:\n{rendered}"
        );
        assert!(
            rendered.contains(r#"outcome="success""#),
            "got:\n{rendered}"
        );
        assert!(rendered.contains("portal_logouts_total"), "got:\n{rendered}");
    }
}
