use super::*;

fn captioned(caption: &str) -> EnvironmentState {
    EnvironmentState {
        caption: Some(caption.to_string()),
        ..EnvironmentState::default()
    }
}

fn filled() -> AutocompleteBuffer {
    let mut buffer = AutocompleteBuffer::new();
    buffer.fill([captioned("a"), captioned("b"), captioned("c")]);
    buffer
}

#[test]
fn fill_flags_every_candidate() {
    let buffer = filled();
    assert_eq!(buffer.len(), 3);
    assert!(buffer.candidates().iter().all(|s| s.is_autocomplete));
}

#[test]
fn take_returns_unflagged_state_and_empties_buffer() {
    let mut buffer = filled();
    let taken = buffer.take(1).unwrap();
    assert_eq!(taken.caption.as_deref(), Some("b"));
    assert!(!taken.is_autocomplete);
    assert!(buffer.is_empty());
}

#[test]
fn reject_keeps_remaining_order() {
    let mut buffer = filled();
    buffer.reject(0).unwrap();
    let captions: Vec<_> = buffer
        .candidates()
        .iter()
        .map(|s| s.caption.as_deref().unwrap())
        .collect();
    assert_eq!(captions, vec!["b", "c"]);
}

#[test]
fn caption_edit_and_bounds() {
    let mut buffer = filled();
    buffer.set_caption(2, "edited").unwrap();
    assert_eq!(buffer.get(2).unwrap().caption.as_deref(), Some("edited"));
    assert!(buffer.set_caption(3, "x").is_err());
    assert!(buffer.take(9).is_err());
    assert!(buffer.reject(9).is_err());
    assert_eq!(buffer.len(), 3);
}
