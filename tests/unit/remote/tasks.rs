use super::*;

#[test]
fn task_paths_follow_study_layout() {
    assert_eq!(task_path("kitchen_1"), "/study_tasks/kitchen_1/kitchen_1.json");
    assert_eq!(
        requirements_path("kitchen_1"),
        "/study_tasks/kitchen_1/kitchen_1_requirements.json"
    );
}

#[test]
fn requirements_list_defaults_to_empty() {
    let parsed: Requirements = serde_json::from_str("{}").unwrap();
    assert!(parsed.requirements.is_empty());
    let parsed: Requirements =
        serde_json::from_str(r#"{ "requirements": ["Put the bowl away"] }"#).unwrap();
    assert_eq!(parsed.requirements, vec!["Put the bowl away"]);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let source = HttpTaskSource::new("http://127.0.0.1:1/", Duration::from_secs(2)).unwrap();
    let err = source.fetch_task("kitchen_1").await.unwrap_err();
    assert!(matches!(err, SceneError::Transport(_)), "{err}");
}
