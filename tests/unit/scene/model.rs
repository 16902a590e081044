use super::*;

fn sample_bundle_json() -> &'static str {
    r#"{
      "envAndEnvStates": {
        "env": {
          "backgrounds": { "cabinet_1_cabinet_closed": "bg/closed.png" },
          "fixtures": {
            "cabinet_1": {
              "x": 0, "y": 0, "width": 100, "height": 100,
              "possibleStates": ["open", "closed"],
              "boundingBox": [0, 0, 100, 100],
              "class": "cabinet", "category": "cabinet"
            }
          },
          "objects": {
            "bowl": {
              "class": "bowl", "category": "bowl", "isReceptacle": true,
              "boundingBox": [0, 0, 20, 20], "width": 20, "height": 20,
              "image": "objects/bowl.png"
            },
            "plate": {
              "class": "plate", "category": "plate", "isReceptacle": true,
              "boundingBox": [0, 0, 40, 40], "width": 40, "height": 40,
              "image": "objects/plate.png"
            }
          },
          "possibleManipulations": [
            { "unique_name": "bowl", "places": ["cabinet_1", "plate"] }
          ]
        },
        "envStates": [
          {
            "fixtures": { "cabinet_1": "closed" },
            "objectOrder": ["plate", "bowl"],
            "objects": { "bowl": { "x": 10, "y": 10, "hidden": true }, "plate": { "x": 200, "y": 200 } },
            "caption": null
          }
        ],
        "HIGHEST_WIDTH": 640
      }
    }"#
}

#[test]
fn parses_bundle_with_camel_case_keys() {
    let bundle = TaskBundle::from_reader(sample_bundle_json().as_bytes()).unwrap();
    let env = bundle.env();
    assert_eq!(env.fixtures["cabinet_1"].possible_states, vec!["open", "closed"]);
    assert!(env.objects["bowl"].is_receptacle);
    assert_eq!(bundle.env_and_env_states.highest_width, Some(640));
    assert_eq!(bundle.env_and_env_states.highest_height, None);

    let state = &bundle.states()[0];
    assert_eq!(state.caption, None);
    assert!(state.objects["bowl"].is_hidden());
    assert!(!state.objects["plate"].is_hidden());
    assert_eq!(state.fixture_state("cabinet_1"), Some("closed"));
}

#[test]
fn export_roundtrip_reproduces_equal_value() {
    let bundle = TaskBundle::from_reader(sample_bundle_json().as_bytes()).unwrap();
    let json = bundle.to_json_pretty().unwrap();
    let back = TaskBundle::from_reader(json.as_bytes()).unwrap();
    assert_eq!(back, bundle);
}

#[test]
fn optional_fields_are_omitted_when_unset() {
    let state = EnvironmentState {
        object_order: vec![ObjectId::new("bowl")],
        objects: [(ObjectId::new("bowl"), ObjectPlacement::at(1.0, 2.0))]
            .into_iter()
            .collect(),
        ..EnvironmentState::default()
    };
    let v = serde_json::to_value(&state).unwrap();
    let obj = v.as_object().unwrap();
    assert!(!obj.contains_key("caption"));
    assert!(!obj.contains_key("image_id"));
    assert!(!obj.contains_key("isAutocomplete"));
    assert!(obj.contains_key("objectOrder"));
    assert!(!v["objects"]["bowl"].as_object().unwrap().contains_key("hidden"));
}

#[test]
fn fixture_insertion_order_survives_roundtrip() {
    let json = r#"{ "fixtures": { "stove_2": "off", "cabinet_1": "open", "stove_1": "on" },
                    "objectOrder": [], "objects": {} }"#;
    let state: EnvironmentState = serde_json::from_str(json).unwrap();
    let keys: Vec<&str> = state.fixtures.keys().map(FixtureId::as_str).collect();
    assert_eq!(keys, vec!["stove_2", "cabinet_1", "stove_1"]);

    let back: EnvironmentState =
        serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
    assert_eq!(back, state);
}

#[test]
fn restamped_changes_only_the_stamp() {
    let bundle = TaskBundle::from_reader(sample_bundle_json().as_bytes()).unwrap();
    let state = bundle.states()[0].clone();
    let a = state.restamped();
    let b = state.restamped();
    assert!(a.stamp.is_some());
    assert_ne!(a.stamp, b.stamp);
    assert_eq!(EnvironmentState { stamp: None, ..a }, state);
}

#[test]
fn unknown_and_unplaced_ids_are_reported() {
    let bundle = TaskBundle::from_reader(sample_bundle_json().as_bytes()).unwrap();
    let mut state = bundle.states()[0].clone();
    state.fixtures.insert(FixtureId::new("oven"), "off".to_string());
    state.object_order.push(ObjectId::new("cup"));

    assert_eq!(bundle.env().unknown_ids(&state), vec!["oven".to_string()]);
    assert_eq!(state.unplaced_ids(), vec![&ObjectId::new("cup")]);
}

#[test]
fn places_and_placement_on_targets() {
    let bundle = TaskBundle::from_reader(sample_bundle_json().as_bytes()).unwrap();
    let env = bundle.env();
    let state = &bundle.states()[0];

    assert_eq!(env.places_for("bowl"), &["cabinet_1".to_string(), "plate".to_string()]);
    assert!(env.places_for("plate").is_empty());

    // Onto the plate: centered on it.
    let on_plate = env.placement_on(state, "bowl", "plate").unwrap();
    assert_eq!((on_plate.x, on_plate.y), (210.0, 210.0));
    assert_eq!(on_plate.hidden, None);

    // Onto the cabinet: centered on the bounding-box center, still inside it and closed.
    let in_cabinet = env.placement_on(state, "bowl", "cabinet_1").unwrap();
    assert_eq!((in_cabinet.x, in_cabinet.y), (40.0, 40.0));
    assert_eq!(in_cabinet.hidden, Some(true));

    assert!(env.placement_on(state, "bowl", "nowhere").is_none());
    assert!(env.placement_on(state, "ghost", "plate").is_none());
}
