#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SemanticsAction {
    Tap,
    LongPress,
    ScrollLeft,
    ScrollRight,
    ScrollUp,
    ScrollDown,
    IncreaseValue,
    DecreaseValue,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SemanticsNode {
    pub id: i32,
    pub label: String,
    pub rect: [f32; 4],
    pub children: Vec<i32>,
}

/// Semantics tree delta produced by the logic context. Building the tree is
/// the logic context's business; the engine only carries it to the platform.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SemanticsUpdate {
    pub nodes: Vec<SemanticsNode>,
}
