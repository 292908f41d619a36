use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Success envelope shared by every JSON endpoint.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn success(payload: T) -> Self {
        Self { status: "success", payload }
    }
}
