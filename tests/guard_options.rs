use form_guard::{
    DEFAULT_FORM_SELECTOR, DEFAULT_SUBMIT_BUTTONS_SELECTOR, DEFAULT_SUBMIT_CLASS, GuardConfig,
    GuardOptions,
};
use proptest::option;
use proptest::prelude::*;

#[test]
fn missing_keys_resolve_to_defaults() {
    let config = GuardOptions::default().resolve();
    assert_eq!(config.form_selector, DEFAULT_FORM_SELECTOR);
    assert_eq!(config.submit_class, DEFAULT_SUBMIT_CLASS);
    assert_eq!(
        config.submit_buttons_selector,
        DEFAULT_SUBMIT_BUTTONS_SELECTOR
    );
    assert!(config.disable_buttons);
    assert_eq!(config.disabled_button_class, "");
    assert!(!config.stop_immediate_propagation);
    assert!(!config.debug_mode);
}

#[test]
fn present_keys_win_over_defaults() {
    let options = GuardOptions {
        form_selector: Some("form.checkout".into()),
        submit_class: Some("busy".into()),
        submit_buttons_selector: Some("button".into()),
        disable_buttons: Some(false),
        disabled_button_class: Some("locked".into()),
        stop_immediate_propagation: Some(true),
        debug_mode: Some(true),
    };
    assert_eq!(
        options.resolve(),
        GuardConfig {
            form_selector: "form.checkout".into(),
            submit_class: "busy".into(),
            submit_buttons_selector: "button".into(),
            disable_buttons: false,
            disabled_button_class: "locked".into(),
            stop_immediate_propagation: true,
            debug_mode: true,
        }
    );
}

#[test]
fn json_nulls_fall_back_to_defaults() {
    let options: GuardOptions = serde_json::from_str(
        r#"{
            "formSelector": null,
            "submitClass": null,
            "disableButtons": null,
            "debugMode": true
        }"#,
    )
    .expect("options should deserialize");

    let config = options.resolve();
    assert_eq!(config.form_selector, DEFAULT_FORM_SELECTOR);
    assert_eq!(config.submit_class, DEFAULT_SUBMIT_CLASS);
    assert!(config.disable_buttons);
    assert!(config.debug_mode);
}

#[test]
fn unrecognized_json_keys_are_ignored() {
    let options: GuardOptions = serde_json::from_str(
        r#"{
            "submitClass": "busy",
            "flashyAnimations": true,
            "retryCount": 3
        }"#,
    )
    .expect("unknown keys should not fail deserialization");

    let config = options.resolve();
    assert_eq!(config.submit_class, "busy");
    assert_eq!(config.form_selector, DEFAULT_FORM_SELECTOR);
}

#[test]
fn empty_json_object_is_all_defaults() {
    let options: GuardOptions = serde_json::from_str("{}").expect("empty object");
    assert_eq!(options, GuardOptions::default());
    assert_eq!(options.resolve(), GuardConfig::default());
}

fn class_name_strategy() -> BoxedStrategy<String> {
    prop_oneof![Just(String::new()), "[a-z][a-z0-9_-]{0,12}"].boxed()
}

fn selector_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("form".to_string()),
        Just("form.checkout".to_string()),
        Just("#signup".to_string()),
        Just("input[type=submit], button[type=submit]".to_string()),
    ]
    .boxed()
}

fn options_strategy() -> BoxedStrategy<GuardOptions> {
    (
        option::of(selector_strategy()),
        option::of(class_name_strategy()),
        option::of(selector_strategy()),
        option::of(any::<bool>()),
        option::of(class_name_strategy()),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
    )
        .prop_map(
            |(
                form_selector,
                submit_class,
                submit_buttons_selector,
                disable_buttons,
                disabled_button_class,
                stop_immediate_propagation,
                debug_mode,
            )| GuardOptions {
                form_selector,
                submit_class,
                submit_buttons_selector,
                disable_buttons,
                disabled_button_class,
                stop_immediate_propagation,
                debug_mode,
            },
        )
        .boxed()
}

proptest! {
    // Every key resolves independently: the caller's value when present,
    // the default otherwise.
    #[test]
    fn merge_is_keywise(options in options_strategy()) {
        let defaults = GuardConfig::default();
        let config = options.resolve();

        prop_assert_eq!(
            &config.form_selector,
            options.form_selector.as_ref().unwrap_or(&defaults.form_selector)
        );
        prop_assert_eq!(
            &config.submit_class,
            options.submit_class.as_ref().unwrap_or(&defaults.submit_class)
        );
        prop_assert_eq!(
            &config.submit_buttons_selector,
            options
                .submit_buttons_selector
                .as_ref()
                .unwrap_or(&defaults.submit_buttons_selector)
        );
        prop_assert_eq!(
            config.disable_buttons,
            options.disable_buttons.unwrap_or(defaults.disable_buttons)
        );
        prop_assert_eq!(
            &config.disabled_button_class,
            options
                .disabled_button_class
                .as_ref()
                .unwrap_or(&defaults.disabled_button_class)
        );
        prop_assert_eq!(
            config.stop_immediate_propagation,
            options
                .stop_immediate_propagation
                .unwrap_or(defaults.stop_immediate_propagation)
        );
        prop_assert_eq!(
            config.debug_mode,
            options.debug_mode.unwrap_or(defaults.debug_mode)
        );
    }

    // Resolving twice from the same options is stable.
    #[test]
    fn merge_is_idempotent(options in options_strategy()) {
        prop_assert_eq!(options.resolve(), options.resolve());
    }
}
