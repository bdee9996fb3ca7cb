#[derive(Copy, Clone, Debug, Default)]
pub struct StepStats {
    pub pairs_tested: u32,
    pub contacts: u32,
    /// post-solve events delivered (contacts × active subscriptions)
    pub events: u32,
}
