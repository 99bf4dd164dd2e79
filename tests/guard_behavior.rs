use form_guard::{
    DEFAULT_SUBMIT_CLASS, EventHandler, FormGuard, GuardOptions, Page, Result,
};
use std::cell::RefCell;
use std::rc::Rc;

const SIGNUP_PAGE: &str = r#"
    <form id='signup' action='/subscribe' method='post'>
      <input type='text' name='email'>
      <input id='go' type='submit' value='Go'>
      <button id='send' type='submit'>Send</button>
    </form>
    "#;

fn quiet_page(html: &str) -> Result<Page> {
    let mut page = Page::from_html(html)?;
    page.set_console_stderr(false);
    Ok(page)
}

#[test]
fn first_submit_latches_the_form_and_disables_controls() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    let guard = FormGuard::install(&mut page, GuardOptions::default());
    assert_eq!(guard.form_count(), 1);

    page.submit("#signup")?;

    assert_eq!(page.submission_count("#signup")?, 1);
    assert_eq!(
        page.data("#signup", "submitInProgress")?.as_deref(),
        Some("true")
    );
    page.assert_class("#signup", DEFAULT_SUBMIT_CLASS, true)?;
    page.assert_disabled("#go", true)?;
    page.assert_disabled("#send", true)?;
    Ok(())
}

#[test]
fn second_submit_is_cancelled() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    page.submit("#signup")?;
    page.submit("#signup")?;

    assert_eq!(page.submission_count("#signup")?, 1);
    page.assert_class("#signup", DEFAULT_SUBMIT_CLASS, true)?;
    assert_eq!(
        page.data("#signup", "submitInProgress")?.as_deref(),
        Some("true")
    );
    Ok(())
}

#[test]
fn later_listener_observes_the_cancelled_event() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    let prevented = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&prevented);
    let observer: EventHandler = Rc::new(move |_page, event| {
        seen.borrow_mut().push(event.default_prevented());
        Ok(())
    });
    page.add_listener("#signup", "submit", observer)?;

    page.submit("#signup")?;
    page.submit("#signup")?;
    assert_eq!(*prevented.borrow(), vec![false, true]);
    Ok(())
}

#[test]
fn clicking_a_disabled_submit_button_cannot_resubmit() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    page.click("#send")?;
    assert_eq!(page.submission_count("#signup")?, 1);
    page.assert_disabled("#send", true)?;

    // The control was disabled on the first submit, so the second click
    // never even dispatches.
    page.click("#send")?;
    assert_eq!(page.submission_count("#signup")?, 1);
    Ok(())
}

#[test]
fn disable_buttons_off_leaves_controls_enabled_but_still_guards() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            disable_buttons: Some(false),
            ..GuardOptions::default()
        },
    );

    page.click("#send")?;
    page.assert_disabled("#send", false)?;
    assert_eq!(page.submission_count("#signup")?, 1);

    // The latch still cancels the repeat even though the button works.
    page.click("#send")?;
    assert_eq!(page.submission_count("#signup")?, 1);
    Ok(())
}

#[test]
fn disabled_button_class_is_applied_when_configured() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            disabled_button_class: Some("is-locked".into()),
            ..GuardOptions::default()
        },
    );

    page.submit("#signup")?;
    page.assert_class("#go", "is-locked", true)?;
    page.assert_class("#send", "is-locked", true)?;

    page.submit("#signup")?;
    // Idempotent: the class list is unchanged on the repeat.
    assert_eq!(page.attr("#send", "class")?.as_deref(), Some("is-locked"));
    Ok(())
}

#[test]
fn empty_submit_class_turns_the_form_class_off() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            submit_class: Some(String::new()),
            ..GuardOptions::default()
        },
    );

    page.submit("#signup")?;
    assert_eq!(page.attr("#signup", "class")?, None);
    assert_eq!(page.submission_count("#signup")?, 1);
    Ok(())
}

#[test]
fn forms_without_submit_controls_guard_without_disabling() -> Result<()> {
    let mut page = quiet_page(
        "<form id='bare'><input type='text' name='q'></form>",
    )?;
    FormGuard::install(&mut page, GuardOptions::default());

    page.submit("#bare")?;
    page.submit("#bare")?;
    assert_eq!(page.submission_count("#bare")?, 1);
    Ok(())
}

#[test]
fn custom_buttons_selector_reaches_untyped_buttons() -> Result<()> {
    let mut page = quiet_page(
        r#"
        <form id='signup'>
          <button id='plain'>Send</button>
          <button id='reset' type='reset'>Reset</button>
        </form>
        "#,
    )?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            submit_buttons_selector: Some("button:not([type=reset])".into()),
            ..GuardOptions::default()
        },
    );

    page.submit("#signup")?;
    page.assert_disabled("#plain", true)?;
    page.assert_disabled("#reset", false)?;
    Ok(())
}

#[test]
fn stop_immediate_propagation_suppresses_later_listeners() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            stop_immediate_propagation: Some(true),
            ..GuardOptions::default()
        },
    );

    let calls = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&calls);
    let observer: EventHandler = Rc::new(move |_page, _event| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    page.add_listener("#signup", "submit", observer)?;

    page.submit("#signup")?;
    assert_eq!(*calls.borrow(), 0);
    // Suppression applies on the repeat as well.
    page.submit("#signup")?;
    assert_eq!(*calls.borrow(), 0);
    // Truncating other listeners does not cancel the first default action.
    assert_eq!(page.submission_count("#signup")?, 1);
    Ok(())
}

#[test]
fn without_stop_immediate_propagation_later_listeners_run() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    let calls = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&calls);
    let observer: EventHandler = Rc::new(move |_page, _event| {
        *counter.borrow_mut() += 1;
        Ok(())
    });
    page.add_listener("#signup", "submit", observer)?;

    page.submit("#signup")?;
    page.submit("#signup")?;
    assert_eq!(*calls.borrow(), 2);
    Ok(())
}

#[test]
fn debug_mode_reports_install_accept_and_block() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(
        &mut page,
        GuardOptions {
            debug_mode: Some(true),
            ..GuardOptions::default()
        },
    );

    page.submit("#signup")?;
    page.submit("#signup")?;

    let logs = page.take_console_logs();
    assert_eq!(
        logs,
        vec![
            "[guard] notice install selector=form forms=1",
            "[guard] notice submit accepted form=form#signup",
            "[guard] warning repeat submit blocked form=form#signup",
        ]
    );
    Ok(())
}

#[test]
fn debug_mode_off_stays_silent() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    page.submit("#signup")?;
    page.submit("#signup")?;
    assert_eq!(page.take_console_logs(), Vec::<String>::new());
    Ok(())
}

#[test]
fn each_matched_form_gets_its_own_latch() -> Result<()> {
    let mut page = quiet_page(
        r#"
        <form id='first'><button type='submit'>a</button></form>
        <form id='second'><button type='submit'>b</button></form>
        "#,
    )?;
    let guard = FormGuard::install(&mut page, GuardOptions::default());
    assert_eq!(guard.form_count(), 2);

    page.submit("#first")?;
    page.submit("#first")?;
    assert_eq!(page.submission_count("#first")?, 1);

    // The sibling form was untouched by the first form's latch.
    assert_eq!(page.data("#second", "submitInProgress")?, None);
    page.submit("#second")?;
    assert_eq!(page.submission_count("#second")?, 1);
    Ok(())
}

#[test]
fn latch_never_resets_without_a_reload() -> Result<()> {
    let mut page = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut page, GuardOptions::default());

    for _ in 0..5 {
        page.submit("#signup")?;
    }
    assert_eq!(page.submission_count("#signup")?, 1);

    // A reload builds a fresh page; the latch is gone.
    let mut reloaded = quiet_page(SIGNUP_PAGE)?;
    FormGuard::install(&mut reloaded, GuardOptions::default());
    assert_eq!(reloaded.data("#signup", "submitInProgress")?, None);
    reloaded.submit("#signup")?;
    assert_eq!(reloaded.submission_count("#signup")?, 1);
    Ok(())
}

#[test]
fn install_on_a_page_without_forms_is_harmless() -> Result<()> {
    let mut page = quiet_page("<div id='content'><p>nothing to guard</p></div>")?;
    let guard = FormGuard::install(
        &mut page,
        GuardOptions {
            debug_mode: Some(true),
            ..GuardOptions::default()
        },
    );
    assert_eq!(guard.form_count(), 0);
    assert_eq!(
        page.take_console_logs(),
        vec!["[guard] notice install selector=form forms=0"]
    );
    Ok(())
}
