/// Side effects requested by [`crate::update`]; the driver executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Abort the in-flight stream read, if any.
    AbortStream,
    /// Release every resource held for the job (files and preview handles).
    ReleaseResources,
}
