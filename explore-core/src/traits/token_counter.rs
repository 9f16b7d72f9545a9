/// Pluggable token counting function used by the budget allocator.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}
