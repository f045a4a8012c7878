pub mod time;

/// Generates a url-safe unique id for runs and records.
pub fn longid() -> String {
    nanoid::nanoid!(21)
}
