use crate::scene::model::{Environment, EnvironmentState};

/// Canonical background key for `state`.
///
/// One `"{fixtureId}_{category}_{value}"` token per entry of `state.fixtures`, in the state's
/// insertion order, joined with `,`. Fixtures unknown to `env` are dropped.
pub fn fixtures_key(env: &Environment, state: &EnvironmentState) -> String {
    state
        .fixtures
        .iter()
        .filter_map(|(id, value)| match env.fixture(id.as_str()) {
            Some(fixture) => Some(format!("{id}_{}_{value}", fixture.category)),
            None => {
                tracing::debug!(fixture = %id, "fixture missing from environment; dropped from background key");
                None
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Exact-match lookup of the pre-rendered background for `state`.
///
/// `None` is a normal outcome: not every fixture combination has been rendered.
pub fn resolve_background<'a>(env: &'a Environment, state: &EnvironmentState) -> Option<&'a str> {
    let key = fixtures_key(env, state);
    let found = env.backgrounds.get(key.as_str()).map(String::as_str);
    if found.is_none() {
        tracing::debug!(%key, "no background rendered for fixture combination");
    }
    found
}

#[cfg(test)]
#[path = "../../tests/unit/scene/background.rs"]
mod tests;
