use super::*;
use crate::foundation::core::{BoundingBox, FixtureId};
use crate::scene::model::{Fixture, PossibleManipulation, SceneObject};

fn object(w: f64, h: f64) -> SceneObject {
    SceneObject {
        class: "dish".to_string(),
        category: "dish".to_string(),
        is_receptacle: false,
        bounding_box: BoundingBox::new(0.0, 0.0, w, h),
        width: w,
        height: h,
        image: String::new(),
    }
}

fn env() -> Environment {
    let mut env = Environment::default();
    env.fixtures.insert(
        FixtureId::new("cabinet_1"),
        Fixture {
            x: 100.0,
            y: 100.0,
            width: 100.0,
            height: 100.0,
            possible_states: vec!["open".to_string(), "closed".to_string()],
            bounding_box: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            class: "cabinet".to_string(),
            category: "cabinet".to_string(),
        },
    );
    env.objects.insert(ObjectId::new("bowl"), object(20.0, 10.0));
    env.objects.insert(ObjectId::new("plate"), object(40.0, 40.0));
    env.possible_manipulations = Some(vec![PossibleManipulation {
        unique_name: ObjectId::new("bowl"),
        places: vec!["plate".to_string(), "cabinet_1".to_string()],
    }]);
    env
}

fn initial() -> EnvironmentState {
    let mut s = EnvironmentState::default();
    s.fixtures
        .insert(FixtureId::new("cabinet_1"), "open".to_string());
    s.objects
        .insert(ObjectId::new("bowl"), ObjectPlacement::at(10.0, 10.0));
    s.objects
        .insert(ObjectId::new("plate"), ObjectPlacement::at(300.0, 300.0));
    s.object_order = vec![ObjectId::new("bowl"), ObjectId::new("plate")];
    s
}

fn timeline(captioning: bool) -> Timeline {
    Timeline::new(
        env(),
        vec![initial()],
        TimelineOptions {
            captioning,
            ..TimelineOptions::default()
        },
    )
    .unwrap()
}

#[test]
fn empty_timeline_is_refused() {
    let err = Timeline::new(env(), Vec::new(), TimelineOptions::default()).unwrap_err();
    assert!(matches!(err, SceneError::Validation(_)));
}

#[test]
fn drag_requires_selection() {
    let mut t = timeline(false);
    assert_eq!(t.selected(), None);
    assert!(t.drag_object("bowl", Point::new(50.0, 50.0)).is_err());
}

#[test]
fn drags_follow_branch_and_amend_rules() {
    let mut t = timeline(false);
    t.select(Some(0)).unwrap();

    let event = t.drag_object("bowl", Point::new(50.0, 50.0)).unwrap().unwrap();
    assert_eq!(event.kind(), "newEnvStateCreated");
    assert_eq!(t.len(), 2);
    assert_eq!(t.selected(), Some(1));
    assert_eq!(t.last_moved(), Some(&ObjectId::new("bowl")));

    let event = t.drag_object("bowl", Point::new(80.0, 50.0)).unwrap().unwrap();
    assert_eq!(event.kind(), "currentEnvStateUpdated");
    assert_eq!(t.len(), 2);

    t.drag_object("plate", Point::new(250.0, 300.0)).unwrap().unwrap();
    assert_eq!(t.len(), 3);
    assert_eq!(t.selected(), Some(2));
}

#[test]
fn small_drag_changes_nothing() {
    let mut t = timeline(true);
    t.select(Some(0)).unwrap();
    let before = t.states().to_vec();
    assert!(t.drag_object("bowl", Point::new(12.0, 12.0)).unwrap().is_none());
    assert_eq!(t.states(), before.as_slice());
    assert!(t.captions().is_empty());
}

#[test]
fn toggle_resets_last_moved_so_next_drag_branches() {
    let mut t = timeline(false);
    t.select(Some(0)).unwrap();
    t.drag_object("bowl", Point::new(50.0, 50.0)).unwrap();
    t.toggle_fixture("cabinet_1").unwrap().unwrap();
    assert_eq!(t.last_moved(), None);
    assert_eq!(t.len(), 3);
    assert_eq!(t.selected(), Some(2));

    let event = t.drag_object("bowl", Point::new(70.0, 50.0)).unwrap().unwrap();
    assert_eq!(event.kind(), "newEnvStateCreated");
    assert_eq!(t.len(), 4);
}

#[test]
fn toggle_event_carries_fixture_details() {
    let mut t = timeline(false);
    let event = t.toggle_fixture("cabinet_1").unwrap().unwrap();
    match event {
        TimelineEvent::NewEnvStateCreated {
            action:
                EditAction::FixtureClick {
                    fixture_name,
                    old_fixture_state,
                    new_fixture_state,
                    ..
                },
            index,
            ..
        } => {
            assert_eq!(fixture_name, FixtureId::new("cabinet_1"));
            assert_eq!(old_fixture_state, "open");
            assert_eq!(new_fixture_state, "closed");
            assert_eq!(index, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn captioning_queues_drag_indices_and_applies_results() {
    let mut t = timeline(true);
    t.select(Some(0)).unwrap();
    t.drag_object("bowl", Point::new(50.0, 50.0)).unwrap();
    t.drag_object("bowl", Point::new(90.0, 50.0)).unwrap();
    assert_eq!(t.captions().len(), 2);

    let job = t.next_caption_job().unwrap();
    assert_eq!(job.index, 1);
    assert_eq!(job.states().len(), 2);
    assert!(t.next_caption_job().is_none());

    t.finish_caption(job.index, Ok("Moved the bowl.".to_string()));
    assert_eq!(t.state(1).unwrap().caption.as_deref(), Some("Moved the bowl."));

    let job = t.next_caption_job().unwrap();
    t.finish_caption(
        job.index,
        Err(SceneError::protocol("caption was not a string")),
    );
    assert_eq!(t.state(1).unwrap().caption.as_deref(), Some("Moved the bowl."));
    assert!(!t.captions().is_captioning());
}

#[test]
fn experiment_mode_never_queues_captions() {
    let mut t = timeline(false);
    t.select(Some(0)).unwrap();
    t.drag_object("bowl", Point::new(50.0, 50.0)).unwrap();
    assert!(t.captions().is_empty());
    assert!(t.next_caption_job().is_none());
}

#[test]
fn caption_job_for_initial_state_has_no_previous() {
    let mut t = timeline(true);
    t.captions.push(0);
    let job = t.next_caption_job().unwrap();
    assert_eq!(job.previous, None);
    assert_eq!(job.states(), vec![initial()]);
}

#[test]
fn delete_removes_step_and_clears_selection() {
    let mut t = timeline(false);
    t.duplicate_step(0).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.selected(), Some(1));

    let event = t.delete_step(1).unwrap();
    assert_eq!(event.kind(), "stepDeleted");
    assert_eq!(t.len(), 1);
    assert_eq!(t.selected(), None);
    assert!(t.delete_step(1).is_err());
}

#[test]
fn delete_accepts_the_initial_state() {
    let mut t = timeline(false);
    t.duplicate_step(0).unwrap();
    t.select(Some(0)).unwrap();

    let event = t.delete_step(0).unwrap();
    assert!(matches!(event, TimelineEvent::StepDeleted { index: 0, .. }));
    assert_eq!(t.len(), 1);
    assert_eq!(t.selected(), None);

    t.delete_step(0).unwrap();
    assert!(t.is_empty());
    assert!(t.toggle_fixture("cabinet_1").is_err());
}

#[test]
fn generated_state_lands_after_captured_index() {
    let mut t = timeline(false);
    t.duplicate_step(0).unwrap();
    t.duplicate_step(1).unwrap();
    t.select(Some(2)).unwrap();

    let mut generated = initial();
    generated.caption = Some("generated".to_string());
    t.apply_generated(0, generated.clone()).unwrap();
    assert_eq!(t.len(), 4);
    assert_eq!(t.state(1), Some(&generated));
    assert_eq!(t.selected(), Some(1));
}

#[test]
fn regenerated_state_replaces_in_place() {
    let mut t = timeline(false);
    t.duplicate_step(0).unwrap();
    let mut regenerated = initial();
    regenerated.caption = Some("again".to_string());
    let event = t.apply_regenerated(1, regenerated.clone()).unwrap();
    assert_eq!(event.kind(), "currentEnvStateUpdated");
    assert_eq!(t.len(), 2);
    assert_eq!(t.state(1), Some(&regenerated));
}

#[test]
fn accepting_autocomplete_appends_and_clears_buffer() {
    let mut t = timeline(false);
    let mut a = initial();
    a.caption = Some("a".to_string());
    let mut b = initial();
    b.caption = Some("b".to_string());
    t.set_autocomplete(vec![a, b.clone()]);
    assert_eq!(t.autocomplete().len(), 2);

    t.accept_autocomplete(1).unwrap();
    assert!(t.autocomplete().is_empty());
    assert_eq!(t.len(), 2);
    assert_eq!(t.state(1), Some(&b));
    assert_eq!(t.selected(), Some(1));
}

#[test]
fn move_to_place_centers_on_target() {
    let mut t = timeline(false);
    t.select(Some(0)).unwrap();
    assert_eq!(t.env().places_for("bowl").len(), 2);

    t.move_to_place("bowl", "plate").unwrap().unwrap();
    let bowl = t.selected_state().unwrap().objects["bowl"];
    assert_eq!((bowl.x, bowl.y), (310.0, 315.0));

    t.move_to_place("bowl", "cabinet_1").unwrap().unwrap();
    let bowl = t.selected_state().unwrap().objects["bowl"];
    assert_eq!((bowl.x, bowl.y), (140.0, 145.0));

    assert!(t.move_to_place("bowl", "nowhere").unwrap().is_none());
}

#[test]
fn preview_pair_orders_hover_and_selection() {
    let mut t = timeline(false);
    t.duplicate_step(0).unwrap();
    t.set_caption(1, "second").unwrap();
    assert!(t.preview_pair().is_none());

    t.select(Some(1)).unwrap();
    t.hover(Some(0));
    let (earlier, later) = t.preview_pair().unwrap();
    assert_eq!(earlier.caption, None);
    assert_eq!(later.caption.as_deref(), Some("second"));

    t.hover(Some(9));
    assert_eq!(t.hovered(), None);
}

#[test]
fn select_reports_only_changes() {
    let mut t = timeline(false);
    assert!(t.select(Some(0)).unwrap().is_some());
    assert!(t.select(Some(0)).unwrap().is_none());
    assert!(t.select(Some(3)).is_err());
    assert!(t.select(None).unwrap().is_some());
}

#[test]
fn bring_to_front_and_bundle_export() {
    let mut t = timeline(false);
    t.bring_to_front("bowl").unwrap();
    let bundle = t.to_bundle();
    assert_eq!(
        bundle.states()[0].object_order,
        vec![ObjectId::new("plate"), ObjectId::new("bowl")]
    );
    assert_eq!(bundle.env(), t.env().as_ref());
}

#[test]
fn object_moved_out_of_closed_cabinet_becomes_visible() {
    let mut t = timeline(false);
    t.select(Some(0)).unwrap();
    t.drag_object("bowl", Point::new(150.0, 150.0)).unwrap();
    t.toggle_fixture("cabinet_1").unwrap();
    assert!(t.selected_state().unwrap().objects["bowl"].is_hidden());

    t.move_to_place("bowl", "plate").unwrap().unwrap();
    let moved = t.selected_state().unwrap();
    assert_eq!(moved.objects["bowl"].point(), Point::new(310.0, 315.0));
    assert!(!moved.objects["bowl"].is_hidden());
    assert!(crate::scene::containment::is_object_visible(t.env(), moved, "bowl"));
}

#[test]
fn bundle_canvas_overrides_survive_export() {
    let mut bundle = TaskBundle::new(env(), vec![initial()]);
    bundle.env_and_env_states.highest_width = Some(1280);
    bundle.env_and_env_states.highest_height = Some(720);

    let t = Timeline::from_bundle(bundle.clone(), TimelineOptions::default()).unwrap();
    assert_eq!(t.to_bundle(), bundle);

    let fresh = timeline(false).to_bundle();
    assert_eq!(fresh.env_and_env_states.highest_width, None);
}
