use canvasflow::event_bus::{Event, ProgressEvent};
use canvasflow::telemetry::{
    CONTEXT_COLOR, FormatterMode, LINE_COLOR, PlainFormatter, RESET_COLOR, TelemetryFormatter,
};

#[test]
fn render_event_includes_colors_and_context() {
    let fmt = PlainFormatter::with_mode(FormatterMode::Colored);
    let ev = Event::node_message_with_meta("hero", 7, "dispatch", "hello");
    let render = fmt.render_event(&ev);

    assert_eq!(render.context.as_deref(), Some("dispatch"));
    let joined = render.join_lines();
    assert!(joined.contains(LINE_COLOR));
    assert!(joined.contains(RESET_COLOR));
    assert!(joined.contains("hello"));
    assert!(joined.ends_with('\n'));
}

#[test]
fn plain_mode_emits_no_ansi_codes() {
    let fmt = PlainFormatter::with_mode(FormatterMode::Plain);
    let ev = Event::node_message_with_meta("hero", 7, "dispatch", "hello");
    let joined = fmt.render_event(&ev).join_lines();

    assert!(!joined.contains('\x1b'));
    assert_eq!(joined, "[hero@7] hello\n");
}

#[test]
fn progress_events_use_the_context_color() {
    let fmt = PlainFormatter::with_mode(FormatterMode::Colored);
    let ev = Event::progress(ProgressEvent::new(Some("s1".into()), true, 3, 1));
    let joined = fmt.render_event(&ev).join_lines();

    // The executing badge stands out from regular node lines.
    assert!(joined.starts_with(CONTEXT_COLOR));
    assert!(joined.contains("executing 1/3 nodes"));
}

#[test]
fn explicit_modes_override_tty_detection() {
    assert!(FormatterMode::Colored.is_colored());
    assert!(!FormatterMode::Plain.is_colored());
}

#[test]
fn auto_detect_matches_is_colored() {
    // In a test harness stderr is normally not a terminal, but either way
    // the two entry points must agree.
    let detected = FormatterMode::auto_detect();
    assert_eq!(detected.is_colored(), FormatterMode::Auto.is_colored());
}
