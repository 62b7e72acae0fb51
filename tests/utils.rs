use std::collections::HashSet;

use canvasflow::utils::id_generator::IdGenerator;

#[test]
fn test_run_id_format() {
    let run_id = IdGenerator::new().generate_run_id();
    // run-{12 uuid hex chars}-{6 alphanumerics}
    assert!(run_id.starts_with("run-"), "got: {run_id}");
    assert_eq!(run_id.len(), "run-".len() + 12 + 1 + 6, "got: {run_id}");

    let mut parts = run_id.splitn(3, '-');
    assert_eq!(parts.next(), Some("run"));
    let uuid_prefix = parts.next().unwrap();
    assert_eq!(uuid_prefix.len(), 12);
    assert!(uuid_prefix.chars().all(|c| c.is_ascii_hexdigit()));
    let suffix = parts.next().unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(
        suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        "suffix is lowercased: {suffix}"
    );
}

#[test]
fn test_session_id_embeds_a_uuid() {
    let session_id = IdGenerator::new().generate_session_id();
    let raw = session_id
        .strip_prefix("session-")
        .expect("session ids carry the session- prefix");
    assert!(uuid::Uuid::parse_str(raw).is_ok(), "got: {session_id}");
}

#[test]
fn test_generated_ids_are_unique() {
    let ids = IdGenerator::new();
    let mut seen = HashSet::new();
    for _ in 0..100 {
        assert!(seen.insert(ids.generate_run_id()));
        assert!(seen.insert(ids.generate_session_id()));
    }
}
