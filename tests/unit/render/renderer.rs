use std::sync::Arc;

use super::*;
use crate::foundation::core::{BoundingBox, FixtureId, ObjectId};
use crate::render::images::InMemoryImageSource;
use crate::scene::model::{Fixture, ObjectPlacement, SceneObject};

const CANVAS: Canvas = Canvas {
    width: 256,
    height: 256,
};
const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GRAY: [u8; 4] = [128, 128, 128, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

fn solid(px: [u8; 4]) -> PreparedImage {
    PreparedImage {
        width: 2,
        height: 2,
        rgba8_premul: Arc::new(px.repeat(4)),
    }
}

fn images() -> InMemoryImageSource {
    let mut source = InMemoryImageSource::new();
    source.insert("bg/open.png", solid(GRAY));
    source.insert("obj/cup.png", solid(RED));
    source.insert("obj/pan.png", solid(BLUE));
    source
}

fn object(image: &str) -> SceneObject {
    SceneObject {
        class: "dish".to_string(),
        category: "dish".to_string(),
        is_receptacle: false,
        bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        width: 10.0,
        height: 10.0,
        image: image.to_string(),
    }
}

fn env() -> Environment {
    let mut env = Environment::default();
    env.backgrounds
        .insert("cabinet_1_cabinet_open".to_string(), "bg/open.png".to_string());
    env.fixtures.insert(
        FixtureId::new("cabinet_1"),
        Fixture {
            x: 100.0,
            y: 100.0,
            width: 100.0,
            height: 50.0,
            possible_states: vec!["open".to_string(), "closed".to_string()],
            bounding_box: BoundingBox::new(100.0, 100.0, 200.0, 150.0),
            class: "cabinet".to_string(),
            category: "cabinet".to_string(),
        },
    );
    env.objects.insert(ObjectId::new("cup"), object("obj/cup.png"));
    env.objects.insert(ObjectId::new("pan"), object("obj/pan.png"));
    env.objects.insert(ObjectId::new("ghost"), object(""));
    env
}

fn state(cabinet: &str, objects: &[(&str, f64, f64)]) -> EnvironmentState {
    let mut s = EnvironmentState::default();
    s.fixtures
        .insert(FixtureId::new("cabinet_1"), cabinet.to_string());
    for &(id, x, y) in objects {
        s.objects.insert(ObjectId::new(id), ObjectPlacement::at(x, y));
        s.object_order.push(ObjectId::new(id));
    }
    s
}

fn px(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
    surface.pixel(x, y).unwrap()
}

#[test]
fn background_is_stretched_to_canvas_when_resolved() {
    let out = compose_state(&env(), &state("open", &[]), CANVAS, &images()).unwrap();
    assert_eq!((out.width(), out.height()), (256, 256));
    assert_eq!(px(&out, 0, 0), GRAY);
    assert_eq!(px(&out, 255, 255), GRAY);

    let out = compose_state(&env(), &state("closed", &[]), CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 0, 0), CLEAR);
}

#[test]
fn object_inside_closed_fixture_is_not_drawn() {
    let s = state("closed", &[("cup", 150.0, 120.0)]);
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 150, 120), CLEAR);

    let s = state("open", &[("cup", 150.0, 120.0)]);
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 150, 120), RED);
}

#[test]
fn one_unit_outside_closed_fixture_is_drawn() {
    for (x, y) in [(99.0, 120.0), (201.0, 120.0), (150.0, 99.0), (150.0, 151.0)] {
        let s = state("closed", &[("cup", x, y)]);
        let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
        assert_eq!(px(&out, x as u32, y as u32), RED, "({x}, {y})");
    }
}

#[test]
fn hidden_objects_are_skipped() {
    let mut s = state("open", &[("cup", 10.0, 10.0)]);
    s.objects["cup"].hidden = Some(true);
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 12, 12), GRAY);
}

#[test]
fn later_objects_draw_on_top() {
    let s = state("closed", &[("cup", 10.0, 10.0), ("pan", 15.0, 15.0)]);
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 12, 12), RED);
    assert_eq!(px(&out, 17, 17), BLUE);

    let mut s = s;
    s.object_order.reverse();
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 17, 17), RED);
}

#[test]
fn unrenderable_entries_are_skipped() {
    let mut s = state("closed", &[("ghost", 10.0, 10.0)]);
    s.object_order.push(ObjectId::new("unplaced"));
    s.objects
        .insert(ObjectId::new("stranger"), ObjectPlacement::at(0.0, 0.0));
    s.object_order.push(ObjectId::new("stranger"));
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert!(out.data().iter().all(|&b| b == 0));
}

#[test]
fn unknown_image_reference_fails_the_render() {
    let mut env = env();
    env.objects["cup"].image = "obj/missing.png".to_string();
    let s = state("closed", &[("cup", 10.0, 10.0)]);
    assert!(compose_state(&env, &s, CANVAS, &images()).is_err());
}

#[test]
fn identical_inputs_give_identical_png_bytes() {
    let s = state("open", &[("cup", 10.0, 10.0), ("pan", 40.5, 33.2)]);
    let a = render_png(&env(), &s, CANVAS, &images()).unwrap();
    let b = render_png(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(a, b);

    let decoded = image::load_from_memory(&a).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (256, 256));
    assert_eq!(decoded.get_pixel(12, 12).0, RED);
}

#[test]
fn data_url_wraps_png() {
    let s = state("open", &[]);
    let url = render_data_url(&env(), &s, Canvas { width: 4, height: 4 }, &images()).unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
    let bytes = crate::render::images::decode_data_url(&url).unwrap();
    assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 4);
}

#[test]
fn objects_far_off_canvas_are_clipped_away() {
    let s = state("open", &[("cup", 1e30, 10.0), ("pan", 10.0, -1e30)]);
    let out = compose_state(&env(), &s, CANVAS, &images()).unwrap();
    assert_eq!(px(&out, 12, 12), GRAY);
    assert_eq!(px(&out, 255, 12), GRAY);
}
