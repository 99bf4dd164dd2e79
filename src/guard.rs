use super::*;
use serde::Deserialize;
use std::rc::Rc;

pub const DEFAULT_FORM_SELECTOR: &str = "form";
pub const DEFAULT_SUBMIT_CLASS: &str = "js__form-guard--submit-in-progress";
pub const DEFAULT_SUBMIT_BUTTONS_SELECTOR: &str = "input[type=submit], button[type=submit]";

pub(crate) const SUBMIT_IN_PROGRESS_KEY: &str = "submitInProgress";

/// Caller-supplied options. Every field is optional; missing fields and
/// explicit JSON nulls fall back to the defaults, unknown JSON keys are
/// ignored. An empty string for a class-valued field turns that class
/// feature off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardOptions {
    pub form_selector: Option<String>,
    pub submit_class: Option<String>,
    pub submit_buttons_selector: Option<String>,
    pub disable_buttons: Option<bool>,
    pub disabled_button_class: Option<String>,
    pub stop_immediate_propagation: Option<bool>,
    pub debug_mode: Option<bool>,
}

/// The merged configuration a guard instance runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub form_selector: String,
    pub submit_class: String,
    pub submit_buttons_selector: String,
    pub disable_buttons: bool,
    pub disabled_button_class: String,
    pub stop_immediate_propagation: bool,
    pub debug_mode: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            form_selector: DEFAULT_FORM_SELECTOR.to_string(),
            submit_class: DEFAULT_SUBMIT_CLASS.to_string(),
            submit_buttons_selector: DEFAULT_SUBMIT_BUTTONS_SELECTOR.to_string(),
            disable_buttons: true,
            disabled_button_class: String::new(),
            stop_immediate_propagation: false,
            debug_mode: false,
        }
    }
}

impl GuardOptions {
    pub fn resolve(&self) -> GuardConfig {
        let defaults = GuardConfig::default();
        GuardConfig {
            form_selector: self
                .form_selector
                .clone()
                .unwrap_or(defaults.form_selector),
            submit_class: self.submit_class.clone().unwrap_or(defaults.submit_class),
            submit_buttons_selector: self
                .submit_buttons_selector
                .clone()
                .unwrap_or(defaults.submit_buttons_selector),
            disable_buttons: self.disable_buttons.unwrap_or(defaults.disable_buttons),
            disabled_button_class: self
                .disabled_button_class
                .clone()
                .unwrap_or(defaults.disabled_button_class),
            stop_immediate_propagation: self
                .stop_immediate_propagation
                .unwrap_or(defaults.stop_immediate_propagation),
            debug_mode: self.debug_mode.unwrap_or(defaults.debug_mode),
        }
    }
}

/// A guard instance. Each install is independent: the merged config is
/// shared into the handlers it registered and nowhere else.
pub struct FormGuard {
    config: Rc<GuardConfig>,
    forms: Vec<NodeId>,
}

impl FormGuard {
    /// Merges `options` over the defaults and binds one submit handler
    /// per matched form. Never fails: a selector that does not parse or
    /// matches nothing installs nothing.
    pub fn install(page: &mut Page, options: GuardOptions) -> FormGuard {
        let config = Rc::new(options.resolve());

        let forms = page
            .query_selector_all(&config.form_selector)
            .unwrap_or_default();

        if config.debug_mode {
            page.log_line(format!(
                "[guard] notice install selector={} forms={}",
                config.form_selector,
                forms.len()
            ));
        }

        for form in &forms {
            let config = Rc::clone(&config);
            let handler: EventHandler =
                Rc::new(move |page, event| on_submit(page, event, &config));
            page.add_listener_to_node(*form, "submit", false, handler);
        }

        FormGuard { config, forms }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn form_count(&self) -> usize {
        self.forms.len()
    }
}

fn on_submit(page: &mut Page, event: &mut EventState, config: &GuardConfig) -> Result<()> {
    let form = event.current_target();
    let in_progress = submission_in_progress(page, form);

    if in_progress {
        event.prevent_default();
    }

    if config.stop_immediate_propagation {
        event.stop_immediate_propagation();
    }

    if config.debug_mode {
        let label = page.event_node_label(form);
        if in_progress {
            page.log_line(format!("[guard] warning repeat submit blocked form={label}"));
        } else {
            page.log_line(format!("[guard] notice submit accepted form={label}"));
        }
    }

    if !config.submit_class.is_empty() {
        page.dom.class_add(form, &config.submit_class)?;
    }

    if !in_progress {
        disable_submit_controls(page, form, config)?;
    }

    // The flag records that a submit attempt happened, not that one
    // succeeded, so it is set even when the event was cancelled.
    page.data.set(form, SUBMIT_IN_PROGRESS_KEY, "true");

    Ok(())
}

fn submission_in_progress(page: &Page, form: NodeId) -> bool {
    page.data.get(form, SUBMIT_IN_PROGRESS_KEY).is_some()
}

fn disable_submit_controls(page: &mut Page, form: NodeId, config: &GuardConfig) -> Result<()> {
    if !config.disable_buttons {
        return Ok(());
    }

    let Ok(controls) = page
        .dom
        .query_selector_all_from(form, &config.submit_buttons_selector)
    else {
        // An unparseable selector degrades to a no-op.
        return Ok(());
    };

    for control in controls {
        page.dom.set_disabled(control, true);
        if !config.disabled_button_class.is_empty() {
            page.dom.class_add(control, &config.disabled_button_class)?;
        }
    }

    Ok(())
}
