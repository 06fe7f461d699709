#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PointerChange {
    #[default]
    Cancel,
    Add,
    Remove,
    Hover,
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PointerDeviceKind {
    #[default]
    Touch,
    Mouse,
    Stylus,
    InvertedStylus,
}

/// One pointer sample. Positions are in physical pixels, `time_stamp` in
/// microseconds on the engine's monotonic clock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerData {
    pub time_stamp: i64,
    pub pointer: i64,
    pub change: PointerChange,
    pub kind: PointerDeviceKind,
    pub physical_x: f64,
    pub physical_y: f64,
    pub buttons: i64,
    pub pressure: f64,
    pub pressure_max: f64,
}

impl PointerData {
    pub fn mouse(
        time_stamp: i64,
        change: PointerChange,
        x: f64,
        y: f64,
        buttons: i64,
    ) -> Self {
        Self {
            time_stamp,
            change,
            kind: PointerDeviceKind::Mouse,
            physical_x: x,
            physical_y: y,
            buttons,
            pressure: 1.0,
            pressure_max: 1.0,
            ..Self::default()
        }
    }
}

/// Ordered batch of pointer samples. Order is authoritative for gesture
/// recognition, so nothing between the platform and the logic context may
/// merge or reorder samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointerDataPacket {
    data: Vec<PointerData>,
}

impl PointerDataPacket {
    pub fn new(data: Vec<PointerData>) -> Self {
        Self { data }
    }

    pub fn single(datum: PointerData) -> Self {
        Self { data: vec![datum] }
    }

    pub fn data(&self) -> &[PointerData] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<PointerData>> for PointerDataPacket {
    fn from(data: Vec<PointerData>) -> Self {
        Self::new(data)
    }
}
