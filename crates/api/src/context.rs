/// Per-request context, inserted by the request middleware.
///
/// Every request carries one, whether or not the client sent a correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: String,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}
